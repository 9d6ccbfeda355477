pub mod storage;
pub mod types;

pub use storage::{Registry, REGISTRY_KEY};
pub use types::RepositoryId;
