use chrono::{DateTime, Utc};

use crate::github::types::{AuthorType, PullRequestRecord};

/// Login suffix GitHub uses for app accounts
const BOT_LOGIN_SUFFIX: &str = "[bot]";

/// True when the author is an automated account.
///
/// The account type and the login suffix are populated independently by
/// GitHub, and each one alone misses some bots, so both are checked.
pub fn is_bot(pr: &PullRequestRecord) -> bool {
    pr.author_type == AuthorType::Bot || pr.author_login.ends_with(BOT_LOGIN_SUFFIX)
}

/// A pull request counts when it was closed strictly after `since` and was
/// not opened by a bot.
///
/// The search query already filters on the close date; it is checked again
/// here so the count never depends on the service honouring the qualifier.
pub fn is_eligible(pr: &PullRequestRecord, since: DateTime<Utc>) -> bool {
    pr.closed_at > since && !is_bot(pr)
}
