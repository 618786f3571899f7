//! Content acceptability filter
//!
//! Pure text cleaning and rejection rules applied to every candidate item
//! before it can be selected for publishing. No I/O happens here; the same
//! input always yields the same result.
//!
//! Cleaning order matters: forwarding provenance headers can themselves
//! contain URLs and mentions, so URLs are stripped first, then mention
//! tokens, then whatever is left of the provenance lines.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Item;

// Pre-compiled regex patterns for performance
static SCHEME_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://\S+").unwrap());

static BARE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:www\.\S+|(?:[\w-]+\.)+(?:com|net|org|io|co|me|tv|app|info|biz)(?:/\S*)?)")
        .unwrap()
});

static MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\w+").unwrap());

static FORWARD_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*forwarded from\b[^\n]*$").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Why the filter rejected (or accepted) an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// Item is publishable.
    Accepted,
    /// Cleaned text contains a banned term.
    BannedTerm,
    /// No text survived cleaning and the item carries no media.
    EmptyContent,
}

impl FilterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::BannedTerm => "banned_term",
            Self::EmptyContent => "empty_content",
        }
    }
}

/// Verdict of [`ContentFilter::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub accept: bool,
    pub cleaned_text: String,
    pub reason: FilterReason,
}

impl FilterResult {
    fn accepted(cleaned_text: String) -> Self {
        Self {
            accept: true,
            cleaned_text,
            reason: FilterReason::Accepted,
        }
    }

    fn rejected(cleaned_text: String, reason: FilterReason) -> Self {
        Self {
            accept: false,
            cleaned_text,
            reason,
        }
    }
}

/// Remove scheme-prefixed and bare-domain URLs.
///
/// # Examples
///
/// ```
/// use carousel::filter::strip_urls;
///
/// let out = strip_urls("read https://example.com/post now");
/// assert!(!out.contains("example.com"));
/// ```
pub fn strip_urls(text: &str) -> String {
    let without_scheme = SCHEME_URL_REGEX.replace_all(text, " ");
    BARE_URL_REGEX.replace_all(&without_scheme, " ").to_string()
}

/// Remove `@name` handle tokens.
pub fn strip_mentions(text: &str) -> String {
    MENTION_REGEX.replace_all(text, " ").to_string()
}

/// Remove "Forwarded from ..." provenance header lines.
pub fn strip_forward_headers(text: &str) -> String {
    FORWARD_HEADER_REGEX.replace_all(text, " ").to_string()
}

/// Collapse whitespace runs to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

/// Full cleaning pipeline: URLs, mentions, provenance headers, whitespace.
///
/// # Examples
///
/// ```
/// use carousel::filter::clean_text;
///
/// let cleaned = clean_text("Check https://x.co @joe  multiple   spaces");
/// assert_eq!(cleaned, "Check multiple spaces");
/// ```
pub fn clean_text(text: &str) -> String {
    let mut result = strip_urls(text);
    result = strip_mentions(&result);
    result = strip_forward_headers(&result);
    collapse_whitespace(&result)
}

/// Configured rejection rules.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    banned_terms: Vec<String>,
}

impl ContentFilter {
    /// Build a filter from the configured banned-term list.
    /// Terms are lowercased once; matching is case-insensitive.
    pub fn new(banned_terms: &[String]) -> Self {
        Self {
            banned_terms: banned_terms.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// True if the cleaned text contains any banned term.
    ///
    /// Substring match, not word-boundary: "kazan" also hits
    /// "kazandırmak". Inherited source policy, kept as-is.
    pub fn contains_banned_term(&self, cleaned: &str) -> bool {
        if self.banned_terms.is_empty() {
            return false;
        }
        let lowered = cleaned.to_lowercase();
        self.banned_terms.iter().any(|term| lowered.contains(term))
    }

    /// Evaluate one item: clean its text and decide acceptability.
    pub fn evaluate(&self, item: &Item) -> FilterResult {
        let cleaned = clean_text(item.text());

        if self.contains_banned_term(&cleaned) {
            return FilterResult::rejected(cleaned, FilterReason::BannedTerm);
        }

        if cleaned.is_empty() && !item.has_media() {
            return FilterResult::rejected(cleaned, FilterReason::EmptyContent);
        }

        FilterResult::accepted(cleaned)
    }
}
