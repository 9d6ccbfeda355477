pub mod browser;
pub mod config;
pub mod delta;
pub mod error;
pub mod fetch;
pub mod github;
pub mod output;
pub mod registry;
pub mod stderr_buffer;
pub mod store;
pub mod tui;

pub use delta::{is_eligible, Fetcher, RepoSnapshot};
pub use error::{FetchError, ValidationError};
pub use registry::{Registry, RepositoryId};
