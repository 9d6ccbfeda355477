use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::types::{ReleaseInfo, SearchPage};
use crate::error::FetchError;
use crate::registry::RepositoryId;

/// Search results are never paginated past the first page
pub const SEARCH_PAGE_SIZE: u8 = 100;

/// Remote source of release and pull request data.
///
/// Implementations must be `Send + Sync` so one source can be shared by
/// concurrent fetches.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Latest published release, or `Ok(None)` when the repository has none.
    async fn latest_release(&self, repo: &RepositoryId) -> Result<Option<ReleaseInfo>, FetchError>;

    /// First page of pull requests closed without merging strictly after `since`.
    async fn closed_unmerged_since(
        &self,
        repo: &RepositoryId,
        since: DateTime<Utc>,
    ) -> Result<SearchPage, FetchError>;
}

/// Search query for closed, unmerged pull requests after `since`
pub fn closed_unmerged_query(repo: &RepositoryId, since: DateTime<Utc>) -> String {
    format!(
        "repo:{} {}",
        repo,
        closed_unmerged_qualifiers(since)
    )
}

/// The qualifiers without the `repo:` part, as used on the repository's own
/// pull request page.
pub fn closed_unmerged_qualifiers(since: DateTime<Utc>) -> String {
    format!(
        "is:pr is:closed is:unmerged closed:>{}",
        since.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
