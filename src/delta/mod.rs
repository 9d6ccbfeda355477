pub mod eligibility;
pub mod fetcher;
pub mod snapshot;

pub use eligibility::{is_bot, is_eligible};
pub use fetcher::{Fetcher, FRESHNESS_WINDOW_MS};
pub use snapshot::{snapshot_key, CacheEntry, RepoSnapshot};
