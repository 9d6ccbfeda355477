use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::delta::RepoSnapshot;
use crate::error::FetchError;
use crate::fetch::RepoResult;
use crate::github::types::PullRequestRecord;

/// Release line shown when the service rejects us for rate limiting
pub const RATE_LIMIT_MESSAGE: &str = "Error: Rate limit exceeded (60/hr). Try again later.";

/// Placeholder for a count we do not know
const UNKNOWN_COUNT: &str = "-";

/// Release line for a fetch result
pub fn release_text(result: &Result<RepoSnapshot, FetchError>) -> String {
    match result {
        Ok(snapshot) => snapshot.release_label(),
        Err(e) if e.is_rate_limited() => RATE_LIMIT_MESSAGE.to_string(),
        Err(e) => format!("Error: {}", e),
    }
}

/// Count for a fetch result; unknown after a failure
pub fn count_text(result: &Result<RepoSnapshot, FetchError>) -> String {
    match result {
        Ok(snapshot) => snapshot.count_label(),
        Err(_) => UNKNOWN_COUNT.to_string(),
    }
}

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a duration as a short age string ("3m", "2h", "5d")
pub fn format_age(duration: chrono::Duration) -> String {
    let minutes = duration.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if duration.num_hours() < 24 {
        format!("{}h", duration.num_hours())
    } else {
        format!("{}d", duration.num_days())
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate title to fit available width, accounting for Unicode
fn truncate_title(title: &str, max_width: usize) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= max_width {
        title.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// One line per pull request: "{title} #{number}  by {login}"
pub fn format_pr_lines(prs: &[PullRequestRecord], use_colors: bool) -> Vec<String> {
    let term_width = get_terminal_width();

    prs.iter()
        .map(|pr| {
            let suffix = format!(" #{}  by {}", pr.number, pr.author_login);
            // 6 = indent
            let title = match term_width {
                Some(width) if width > suffix.len() + 16 => {
                    truncate_title(&pr.title, width - suffix.len() - 6)
                }
                Some(_) => truncate_title(&pr.title, 10),
                None => pr.title.clone(),
            };

            if use_colors {
                format!(
                    "      {} {}  by {}",
                    title,
                    format!("#{}", pr.number).dimmed(),
                    pr.author_login.yellow()
                )
            } else {
                format!("      {}{}", title, suffix)
            }
        })
        .collect()
}

/// Format the whole dashboard: one block per repository with its release
/// line, its count, and optionally the eligible pull requests.
///
/// `fetched_at` supplies the cache time for a repository, if known.
pub fn format_dashboard<F>(
    results: &[RepoResult],
    show_prs: bool,
    use_colors: bool,
    now: DateTime<Utc>,
    fetched_at: F,
) -> String
where
    F: Fn(&crate::registry::RepositoryId) -> Option<DateTime<Utc>>,
{
    if results.is_empty() {
        return "No repositories watched. Add one with `relwatch add owner/repo`.".to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(idx, (repo, result))| {
            let index_str = format!("{:>2}.", idx + 1);
            let count = count_text(result);
            let release = release_text(result);
            let age = fetched_at(repo)
                .map(|at| format!("fetched {}", format_age(now - at)))
                .unwrap_or_default();

            let mut lines = Vec::new();
            if use_colors {
                let count_colored = match result {
                    Ok(s) if s.total_eligible_count > 0 => count.yellow().bold().to_string(),
                    Ok(_) => count.green().to_string(),
                    Err(_) => count.dimmed().to_string(),
                };
                let release_colored = match result {
                    Ok(_) => release.clone(),
                    Err(_) => release.red().to_string(),
                };
                lines.push(format!(
                    "{} {}  {}  {}",
                    index_str.dimmed(),
                    repo.as_str().cyan().bold(),
                    count_colored,
                    age.dimmed()
                ));
                lines.push(format!("    {}", release_colored));
            } else {
                lines.push(format!("{} {}  {}  {}", index_str, repo, count, age)
                    .trim_end()
                    .to_string());
                lines.push(format!("    {}", release));
            }

            if show_prs {
                if let Ok(snapshot) = result {
                    lines.extend(format_pr_lines(&snapshot.eligible_prs, use_colors));
                }
            }

            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::{AuthorType, ReleaseInfo, SearchPage};
    use crate::registry::RepositoryId;
    use chrono::{Duration, TimeZone};

    fn snapshot_with(prs: Vec<PullRequestRecord>, total: u64) -> RepoSnapshot {
        let release = ReleaseInfo {
            tag_name: "v3.1.0".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            html_url: "https://github.com/o/r/releases/tag/v3.1.0".to_string(),
        };
        RepoSnapshot::from_search(
            release,
            SearchPage {
                total_count: total,
                items: prs,
            },
        )
    }

    fn pr(number: u64, title: &str) -> PullRequestRecord {
        PullRequestRecord {
            number,
            title: title.to_string(),
            url: format!("https://github.com/o/r/pull/{}", number),
            author_login: "alice".to_string(),
            author_type: AuthorType::User,
            closed_at: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_release_and_count_text() {
        let ok: Result<RepoSnapshot, FetchError> = Ok(snapshot_with(vec![pr(1, "Fix")], 150));
        assert_eq!(release_text(&ok), "Since v3.1.0 (2024-03-01)");
        assert_eq!(count_text(&ok), "1+");

        let none: Result<RepoSnapshot, FetchError> = Ok(RepoSnapshot::no_release());
        assert_eq!(release_text(&none), "No releases found");
        assert_eq!(count_text(&none), "N/A");
    }

    #[test]
    fn test_error_text() {
        let limited: Result<RepoSnapshot, FetchError> =
            Err(FetchError::from_service("API rate limit exceeded", Some(403)));
        assert_eq!(release_text(&limited), RATE_LIMIT_MESSAGE);
        assert_eq!(count_text(&limited), "-");

        let failed: Result<RepoSnapshot, FetchError> =
            Err(FetchError::from_service("Release fetch failed", Some(500)));
        assert_eq!(release_text(&failed), "Error: Release fetch failed");
        assert_eq!(count_text(&failed), "-");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(20)), "just now");
        assert_eq!(format_age(Duration::minutes(12)), "12m");
        assert_eq!(format_age(Duration::hours(5)), "5h");
        assert_eq!(format_age(Duration::days(3)), "3d");
    }

    #[test]
    fn test_dashboard_plain() {
        let repo = RepositoryId::parse("o/r").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let results = vec![(repo, Ok(snapshot_with(vec![pr(7, "Add feature")], 1)))];

        let out = format_dashboard(&results, true, false, now, |_| {
            Some(now - Duration::minutes(5))
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], " 1. o/r  1  fetched 5m");
        assert_eq!(lines[1], "    Since v3.1.0 (2024-03-01)");
        assert!(lines[2].contains("Add feature #7  by alice"));
    }

    #[test]
    fn test_dashboard_empty() {
        let out = format_dashboard(&[], false, false, Utc::now(), |_| None);
        assert!(out.starts_with("No repositories watched"));
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("short", 10), "short");
        assert_eq!(truncate_title("a very long title", 10), "a very ...");
    }
}
