use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest published release of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub published_at: DateTime<Utc>,
    pub html_url: String,
}

/// Account classification reported by GitHub. Anything other than `Bot` is
/// kept verbatim and treated as a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthorType {
    User,
    Bot,
    Other(String),
}

impl From<String> for AuthorType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "User" => AuthorType::User,
            "Bot" => AuthorType::Bot,
            _ => AuthorType::Other(value),
        }
    }
}

impl From<AuthorType> for String {
    fn from(value: AuthorType) -> Self {
        match value {
            AuthorType::User => "User".to_string(),
            AuthorType::Bot => "Bot".to_string(),
            AuthorType::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author_login: String,
    pub author_type: AuthorType,
    pub closed_at: DateTime<Utc>,
}

/// First page of a closed-unmerged search
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Total matches reported by the service, across all pages
    pub total_count: u64,
    pub items: Vec<PullRequestRecord>,
}

// Wire formats for the two endpoints we call

#[derive(Debug, Deserialize)]
pub(crate) struct WireRelease {
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub html_url: String,
}

impl WireRelease {
    /// Drafts have no publish date; fall back to creation time for those.
    pub fn into_release(self) -> Option<ReleaseInfo> {
        let published_at = self.published_at.or(self.created_at)?;
        Some(ReleaseInfo {
            tag_name: self.tag_name,
            published_at,
            html_url: self.html_url,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSearch {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<WireIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub user: WireUser,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub login: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl WireSearch {
    pub fn into_page(self) -> SearchPage {
        let items = self
            .items
            .into_iter()
            // closed_at is always set for closed items; skip anything odd
            .filter_map(|issue| {
                Some(PullRequestRecord {
                    number: issue.number,
                    title: issue.title,
                    url: issue.html_url,
                    author_login: issue.user.login,
                    author_type: AuthorType::from(issue.user.kind),
                    closed_at: issue.closed_at?,
                })
            })
            .collect();

        SearchPage {
            total_count: self.total_count,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_wire_format() {
        let json = r#"{
            "total_count": 142,
            "incomplete_results": false,
            "items": [
                {
                    "number": 7,
                    "title": "Fix typo",
                    "html_url": "https://github.com/o/r/pull/7",
                    "user": {"login": "alice", "type": "User"},
                    "closed_at": "2024-01-02T00:00:00Z"
                },
                {
                    "number": 8,
                    "title": "Bump serde",
                    "html_url": "https://github.com/o/r/pull/8",
                    "user": {"login": "dependabot[bot]", "type": "Bot"},
                    "closed_at": "2024-01-03T00:00:00Z"
                }
            ]
        }"#;

        let page = serde_json::from_str::<WireSearch>(json).unwrap().into_page();
        assert_eq!(page.total_count, 142);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].author_type, AuthorType::User);
        assert_eq!(page.items[1].author_type, AuthorType::Bot);
        assert_eq!(page.items[1].url, "https://github.com/o/r/pull/8");
    }

    #[test]
    fn test_release_wire_format() {
        let json = r#"{
            "tag_name": "v1.2.0",
            "published_at": "2024-01-01T00:00:00Z",
            "created_at": "2023-12-31T00:00:00Z",
            "html_url": "https://github.com/o/r/releases/tag/v1.2.0"
        }"#;

        let release = serde_json::from_str::<WireRelease>(json)
            .unwrap()
            .into_release()
            .unwrap();
        assert_eq!(release.tag_name, "v1.2.0");
        assert_eq!(release.published_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_unknown_author_type_roundtrips() {
        let kind: AuthorType = serde_json::from_str(r#""Organization""#).unwrap();
        assert_eq!(kind, AuthorType::Other("Organization".to_string()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""Organization""#);
    }
}
