use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::eligibility::is_eligible;
use crate::github::source::{closed_unmerged_qualifiers, SEARCH_PAGE_SIZE};
use crate::github::types::{PullRequestRecord, ReleaseInfo, SearchPage};
use crate::registry::RepositoryId;

/// Store key for a repository's cached snapshot
pub fn snapshot_key(repo: &RepositoryId) -> String {
    format!("snapshot:{}", repo)
}

/// Everything the dashboard shows for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    /// `None` when the repository has never published a release
    pub release: Option<ReleaseInfo>,
    pub eligible_prs: Vec<PullRequestRecord>,
    pub total_eligible_count: usize,
    /// The service reported more matches than fit on one page
    pub truncated: bool,
}

impl RepoSnapshot {
    /// Result for a repository without releases. Cached like any other result.
    pub fn no_release() -> Self {
        Self {
            release: None,
            eligible_prs: Vec::new(),
            total_eligible_count: 0,
            truncated: false,
        }
    }

    /// Filter one search page against `release`, keeping service order.
    ///
    /// The count is ours, after filtering. The service's total only decides
    /// whether more results exist past the first page.
    pub fn from_search(release: ReleaseInfo, page: SearchPage) -> Self {
        let since = release.published_at;
        let eligible_prs: Vec<PullRequestRecord> = page
            .items
            .into_iter()
            .filter(|pr| is_eligible(pr, since))
            .collect();

        Self {
            total_eligible_count: eligible_prs.len(),
            truncated: page.total_count > u64::from(SEARCH_PAGE_SIZE),
            release: Some(release),
            eligible_prs,
        }
    }

    /// Count for display: `7`, `7+` when truncated
    pub fn count_label(&self) -> String {
        match &self.release {
            None => "N/A".to_string(),
            Some(_) if self.truncated => format!("{}+", self.total_eligible_count),
            Some(_) => self.total_eligible_count.to_string(),
        }
    }

    /// Release line for display
    pub fn release_label(&self) -> String {
        match &self.release {
            None => "No releases found".to_string(),
            Some(release) => format!(
                "Since {} ({})",
                release.tag_name,
                release.published_at.format("%Y-%m-%d")
            ),
        }
    }

    /// The repository's pull request page filtered like our search. Bots are
    /// not excluded there, so it may list more than we count.
    pub fn web_search_url(&self, repo: &RepositoryId) -> Option<String> {
        let release = self.release.as_ref()?;
        let base = format!("{}/pulls", repo.html_url());
        reqwest::Url::parse_with_params(&base, &[("q", closed_unmerged_qualifiers(release.published_at))])
            .ok()
            .map(String::from)
    }
}

/// A snapshot plus the time it was fetched. Serialized as
/// `{"timestamp": <epoch-ms>, "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "timestamp")]
    pub fetched_at_ms: i64,
    #[serde(rename = "data")]
    pub snapshot: RepoSnapshot,
}

impl CacheEntry {
    pub fn new(fetched_at: DateTime<Utc>, snapshot: RepoSnapshot) -> Self {
        Self {
            fetched_at_ms: fetched_at.timestamp_millis(),
            snapshot,
        }
    }

    /// Fresh while younger than `window_ms` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, window_ms: i64) -> bool {
        now.timestamp_millis() - self.fetched_at_ms < window_ms
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fetched_at_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::AuthorType;
    use chrono::{Duration, TimeZone};

    fn release() -> ReleaseInfo {
        ReleaseInfo {
            tag_name: "v1.0.0".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            html_url: "https://github.com/owner/repo/releases/tag/v1.0.0".to_string(),
        }
    }

    fn pr(number: u64, login: &str, kind: AuthorType) -> PullRequestRecord {
        PullRequestRecord {
            number,
            title: format!("PR #{}", number),
            url: format!("https://github.com/owner/repo/pull/{}", number),
            author_login: login.to_string(),
            author_type: kind,
            closed_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_from_search_filters_and_keeps_order() {
        let page = SearchPage {
            total_count: 4,
            items: vec![
                pr(9, "zed", AuthorType::User),
                pr(3, "dependabot[bot]", AuthorType::Bot),
                pr(5, "amy", AuthorType::User),
                pr(1, "github-actions[bot]", AuthorType::User),
            ],
        };

        let snapshot = RepoSnapshot::from_search(release(), page);
        let numbers: Vec<u64> = snapshot.eligible_prs.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![9, 5]);
        assert_eq!(snapshot.total_eligible_count, 2);
        assert!(!snapshot.truncated);
        assert_eq!(snapshot.count_label(), "2");
    }

    #[test]
    fn test_truncated_follows_service_total_only() {
        // All bots: nothing survives the filter, yet more results exist
        let page = SearchPage {
            total_count: 101,
            items: vec![pr(1, "dependabot[bot]", AuthorType::Bot)],
        };
        let snapshot = RepoSnapshot::from_search(release(), page);
        assert_eq!(snapshot.total_eligible_count, 0);
        assert!(snapshot.truncated);
        assert_eq!(snapshot.count_label(), "0+");

        let exactly_one_page = SearchPage {
            total_count: 100,
            items: vec![pr(1, "amy", AuthorType::User)],
        };
        assert!(!RepoSnapshot::from_search(release(), exactly_one_page).truncated);
    }

    #[test]
    fn test_no_release_labels() {
        let snapshot = RepoSnapshot::no_release();
        assert_eq!(snapshot.release_label(), "No releases found");
        assert_eq!(snapshot.count_label(), "N/A");
        let repo = RepositoryId::parse("owner/repo").unwrap();
        assert_eq!(snapshot.web_search_url(&repo), None);
    }

    #[test]
    fn test_release_label_and_search_url() {
        let snapshot = RepoSnapshot::from_search(release(), SearchPage::default());
        assert_eq!(snapshot.release_label(), "Since v1.0.0 (2024-01-01)");

        let repo = RepositoryId::parse("owner/repo").unwrap();
        let url = snapshot.web_search_url(&repo).unwrap();
        assert!(url.starts_with("https://github.com/owner/repo/pulls?q="));
        assert!(url.contains("is%3Aunmerged"));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_cache_entry_wire_format() {
        let fetched = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let entry = CacheEntry::new(fetched, RepoSnapshot::no_release());
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["timestamp"], fetched.timestamp_millis());
        assert!(json["data"]["release"].is_null());
        assert_eq!(entry.fetched_at(), Some(fetched));
    }

    #[test]
    fn test_freshness_window() {
        let fetched = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let entry = CacheEntry::new(fetched, RepoSnapshot::no_release());
        let hour = 60 * 60 * 1000;

        assert!(entry.is_fresh(fetched + Duration::minutes(59), hour));
        assert!(!entry.is_fresh(fetched + Duration::hours(1), hour));
        assert!(!entry.is_fresh(fetched + Duration::hours(3), hour));
    }
}
