use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::Serialize;

use super::source::{closed_unmerged_query, ReleaseSource, SEARCH_PAGE_SIZE};
use super::types::{ReleaseInfo, SearchPage, WireRelease, WireSearch};
use crate::error::FetchError;
use crate::registry::RepositoryId;

/// Create a GitHub client. Without a token requests are anonymous and share
/// the 60 requests/hour budget.
pub fn create_client(token: Option<&str>, base_uri: Option<&str>) -> Result<Octocrab> {
    let mut builder = Octocrab::builder();
    if let Some(token) = token {
        builder = builder.personal_token(token.to_string());
    }
    if let Some(uri) = base_uri {
        builder = builder
            .base_uri(uri)
            .with_context(|| format!("Invalid GitHub API base URL: {}", uri))?;
    }
    builder.build().context("Failed to create GitHub client")
}

/// `ReleaseSource` backed by octocrab
#[derive(Clone)]
pub struct OctocrabSource {
    client: Octocrab,
}

impl OctocrabSource {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    per_page: u8,
}

/// Status code carried by an octocrab error, if the service answered at all
fn status_of(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

fn message_of(err: &octocrab::Error) -> String {
    match err {
        octocrab::Error::GitHub { source, .. } => source.message.clone(),
        other => other.to_string(),
    }
}

/// Outcome of a failed latest-release request. A 404 means the repository
/// has no release, which is not an error.
fn release_failure(status: Option<u16>, message: &str) -> Result<Option<ReleaseInfo>, FetchError> {
    if status == Some(http::StatusCode::NOT_FOUND.as_u16()) {
        return Ok(None);
    }
    Err(FetchError::from_service(
        format!("Release fetch failed: {}", message),
        status,
    ))
}

fn search_failure(status: Option<u16>, message: &str) -> FetchError {
    FetchError::from_service(format!("Search failed: {}", message), status)
}

#[async_trait]
impl ReleaseSource for OctocrabSource {
    async fn latest_release(&self, repo: &RepositoryId) -> Result<Option<ReleaseInfo>, FetchError> {
        let route = format!("/repos/{}/{}/releases/latest", repo.owner(), repo.name());
        log::debug!("GET {}", route);

        match self.client.get::<WireRelease, _, ()>(&route, None).await {
            Ok(release) => Ok(release.into_release()),
            Err(e) => {
                let outcome = release_failure(status_of(&e), &message_of(&e));
                if matches!(outcome, Ok(None)) {
                    log::debug!("No release for {}", repo);
                }
                outcome
            }
        }
    }

    async fn closed_unmerged_since(
        &self,
        repo: &RepositoryId,
        since: DateTime<Utc>,
    ) -> Result<SearchPage, FetchError> {
        let query = closed_unmerged_query(repo, since);
        let params = SearchParams {
            q: &query,
            per_page: SEARCH_PAGE_SIZE,
        };
        log::debug!("Searching: {}", query);

        let result: WireSearch = self
            .client
            .get("/search/issues", Some(&params))
            .await
            .map_err(|e| search_failure(status_of(&e), &message_of(&e)))?;

        Ok(result.into_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_release_is_not_an_error() {
        assert!(matches!(release_failure(Some(404), "Not Found"), Ok(None)));
    }

    #[test]
    fn test_forbidden_release_is_rate_limited() {
        let err = release_failure(Some(403), "Forbidden").unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.raw_message(), "Release fetch failed: Forbidden");
    }

    #[test]
    fn test_other_release_failure_keeps_status() {
        let err = release_failure(Some(500), "Server Error").unwrap_err();
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "Release fetch failed: Server Error");
        assert!(matches!(err, FetchError::Service { status: Some(500), .. }));
    }

    #[test]
    fn test_search_failure_classification() {
        assert!(search_failure(None, "API rate limit exceeded for 1.2.3.4").is_rate_limited());
        assert!(search_failure(Some(403), "Forbidden").is_rate_limited());

        let err = search_failure(Some(422), "Validation Failed");
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "Search failed: Validation Failed");
    }

    #[test]
    fn test_search_not_found_is_an_error() {
        // Only the release endpoint treats 404 as "nothing there"
        assert!(!search_failure(Some(404), "Not Found").is_rate_limited());
    }
}
