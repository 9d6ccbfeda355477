pub mod client;
pub mod source;
pub mod types;

pub use client::{create_client, OctocrabSource};
pub use source::{closed_unmerged_query, ReleaseSource, SEARCH_PAGE_SIZE};
pub use types::{AuthorType, PullRequestRecord, ReleaseInfo, SearchPage};
