//! Host-page capture boundary.
//!
//! # Responsibility
//! - Define the narrow capabilities the collection core consumes from the
//!   host page: conversation scraping, notifications, confirmation.
//! - Normalize captured titles and bodies before they reach the store.
//!
//! # Invariants
//! - Code blocks and math markup are already replaced by
//!   [`CODE_BLOCK_PLACEHOLDER`] / [`MATH_PLACEHOLDER`] in captured bodies.
//! - Normalization is deterministic so re-captures fingerprint identically.

use once_cell::sync::Lazy;
use regex::Regex;

/// Token substituted for code blocks by the scraper.
pub const CODE_BLOCK_PLACEHOLDER: &str = "[Code Block]";
/// Token substituted for rendered math by the scraper.
pub const MATH_PLACEHOLDER: &str = "[LaTeX]";

static TRAILING_WS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\n").expect("valid trailing whitespace regex"));
static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank line regex"));

/// Raw capture of the conversation currently shown by the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedConversation {
    pub page_title: String,
    /// Message texts joined with blank lines.
    pub body: String,
    pub url: String,
}

/// Scrapes the current conversation from the host page.
pub trait ConversationSource {
    /// Returns `None` when no conversation is open or nothing was readable.
    fn current_conversation(&self) -> Option<CapturedConversation>;
}

/// Severity of a transient user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient toast-style user feedback.
pub trait Notifier {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Yes/no prompt for destructive actions.
pub trait Confirmer {
    fn confirm(&self, message: &str) -> bool;
}

/// Strips the host site's title suffix; falls back to `untitled` when
/// nothing is left.
pub fn normalize_page_title(raw: &str, site_suffix: &str, untitled: &str) -> String {
    let stripped = if site_suffix.is_empty() {
        raw
    } else {
        raw.strip_suffix(site_suffix).unwrap_or(raw)
    };
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        untitled.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Trims line-trailing whitespace and collapses runs of blank lines to one.
pub fn normalize_captured_body(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n");
    let without_trailing = TRAILING_WS_RE.replace_all(&unified, "\n");
    BLANK_RUN_RE
        .replace_all(&without_trailing, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{normalize_captured_body, normalize_page_title};

    #[test]
    fn page_title_suffix_is_removed() {
        assert_eq!(
            normalize_page_title("Rust lifetimes - DeepSeek", " - DeepSeek", "Untitled"),
            "Rust lifetimes"
        );
        assert_eq!(
            normalize_page_title("Plain", " - DeepSeek", "Untitled"),
            "Plain"
        );
    }

    #[test]
    fn empty_page_title_uses_fallback() {
        assert_eq!(
            normalize_page_title(" - DeepSeek", " - DeepSeek", "Untitled"),
            "Untitled"
        );
        assert_eq!(normalize_page_title("   ", "", "Untitled"), "Untitled");
    }

    #[test]
    fn captured_body_collapses_blank_runs() {
        let raw = "question  \r\n\r\n\r\n\r\nanswer [Code Block]\n\n\nend\n";
        assert_eq!(
            normalize_captured_body(raw),
            "question\n\nanswer [Code Block]\n\nend"
        );
    }
}
