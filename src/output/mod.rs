pub mod formatter;

pub use formatter::{
    count_text, format_age, format_dashboard, format_pr_lines, release_text, should_use_colors,
    RATE_LIMIT_MESSAGE,
};
