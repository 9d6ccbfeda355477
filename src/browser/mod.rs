use anyhow::{Context, Result};

use crate::delta::RepoSnapshot;
use crate::registry::RepositoryId;

/// Open a URL in the user's default browser
///
/// # Errors
/// Returns error if browser cannot be opened (e.g., no browser available)
pub fn open_url(url: &str) -> Result<()> {
    webbrowser::open(url).with_context(|| format!("Failed to open browser for URL: {}", url))?;
    Ok(())
}

/// Best page to show for a repository: the closed-unmerged search when a
/// release is known, the repository itself otherwise.
pub fn target_url(repo: &RepositoryId, snapshot: Option<&RepoSnapshot>) -> String {
    snapshot
        .and_then(|s| s.web_search_url(repo))
        .unwrap_or_else(|| repo.html_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_without_release_is_repo_page() {
        let repo = RepositoryId::parse("owner/repo").unwrap();
        assert_eq!(target_url(&repo, None), "https://github.com/owner/repo");
        assert_eq!(
            target_url(&repo, Some(&RepoSnapshot::no_release())),
            "https://github.com/owner/repo"
        );
    }
}
