use crate::delta::{Fetcher, RepoSnapshot};
use crate::error::FetchError;
use crate::registry::RepositoryId;
use futures::stream::{FuturesUnordered, StreamExt};

/// Outcome of one repository's fetch
pub type RepoResult = (RepositoryId, Result<RepoSnapshot, FetchError>);

/// Fetch every repository at once and return the results in the order of
/// `repos`.
///
/// Each repository succeeds or fails on its own; a failure is reported in its
/// slot and never stops the others.
pub async fn fetch_all(fetcher: &Fetcher, repos: &[RepositoryId], force: bool) -> Vec<RepoResult> {
    let mut futures = FuturesUnordered::new();
    for (index, repo) in repos.iter().enumerate() {
        futures.push(async move {
            let result = fetcher.fetch(repo, force).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<RepoSnapshot, FetchError>>> = vec![None; repos.len()];
    while let Some((index, result)) = futures.next().await {
        match &result {
            Ok(snapshot) => log::debug!(
                "  {}: {} eligible PRs",
                repos[index],
                snapshot.count_label()
            ),
            Err(e) => log::warn!("Fetch failed: {} - {}", repos[index], e.raw_message()),
        }
        results[index] = Some(result);
    }

    repos
        .iter()
        .cloned()
        .zip(results)
        .filter_map(|(repo, result)| result.map(|r| (repo, r)))
        .collect()
}

/// Number of results that failed because of rate limiting
pub fn rate_limited_count(results: &[RepoResult]) -> usize {
    results
        .iter()
        .filter(|(_, r)| matches!(r, Err(e) if e.is_rate_limited()))
        .count()
}
