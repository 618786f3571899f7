// Core data structures for the carousel relay

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an item within a feed. Monotonically increasing per feed.
pub type ItemId = u64;

/// One unit of content observed on a source feed.
///
/// Items are created by the feed and are read-only to the relay; nothing
/// here is ever mutated after fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub timestamp: DateTime<Utc>,
    pub kind: ItemKind,
    /// Message text, or the caption when the item is media-typed.
    pub raw_text: Option<String>,
    /// Opaque handle to attached media, if any.
    pub media_ref: Option<String>,
}

impl Item {
    /// Text candidate for filtering: the message text or the media caption.
    pub fn text(&self) -> &str {
        self.raw_text.as_deref().unwrap_or("")
    }

    /// True if the item carries an attachment.
    pub fn has_media(&self) -> bool {
        self.media_ref.is_some()
    }
}

/// Content kind of a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Photo,
    Document,
    Video,
}

impl ItemKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Video => "video",
        }
    }

    /// Create from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "photo" => Some(Self::Photo),
            "document" => Some(Self::Document),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Final decision recorded for an item id. Decided exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Item was copied to the destination feed.
    Published,
    /// Item was rejected by the content filter (banned term).
    SkippedFiltered,
    /// Item had neither usable text nor media after cleaning.
    SkippedEmpty,
    /// The transport refused the item; never offered again.
    FailedPermanent,
}

impl Outcome {
    /// Get string representation (stable, used by both ledger backends)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::SkippedFiltered => "skipped_filtered",
            Self::SkippedEmpty => "skipped_empty",
            Self::FailedPermanent => "failed_permanent",
        }
    }

    /// Create from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "published" => Some(Self::Published),
            "skipped_filtered" => Some(Self::SkippedFiltered),
            "skipped_empty" => Some(Self::SkippedEmpty),
            "failed_permanent" => Some(Self::FailedPermanent),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one scheduler activation.
///
/// "Nothing to publish" and "outside the window" are expected outcomes,
/// modeled as values rather than errors.
#[derive(Debug, Clone)]
pub enum TickReport {
    /// The tick ended without publishing anything.
    Skipped(SkipReason),
    /// The tick ran to completion (possibly with per-item failures).
    Completed(TickSummary),
}

impl TickReport {
    /// Item ids published during this tick, empty when skipped.
    pub fn published_ids(&self) -> Vec<ItemId> {
        match self {
            Self::Skipped(_) => Vec::new(),
            Self::Completed(summary) => summary.published.iter().map(|(id, _)| *id).collect(),
        }
    }
}

/// Why a tick published nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Current civil time is outside the publishing window.
    OutsideWindow,
    /// The candidate source could not be reached; retried next tick.
    SourceUnavailable,
    /// Every fetched candidate was already decided or filtered out.
    NothingEligible,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutsideWindow => "outside window",
            Self::SourceUnavailable => "source unavailable",
            Self::NothingEligible => "nothing eligible",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-tick counters reported to the operator.
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    /// Item ids published this tick, with the destination message id.
    pub published: Vec<(ItemId, String)>,
    /// Candidates rejected by the filter this tick.
    pub filtered: usize,
    /// Candidates whose publish failed permanently this tick.
    pub failed: usize,
    /// Fetched candidates that already had a recorded outcome.
    pub already_seen: usize,
    /// Cursor value after the commit stage.
    pub cursor: Option<ItemId>,
}

impl TickSummary {
    /// Human-readable one-line summary for the manual trigger surface.
    pub fn display_line(&self) -> String {
        format!(
            "published={} filtered={} failed={} already_seen={} cursor={}",
            self.published.len(),
            self.filtered,
            self.failed,
            self.already_seen,
            self.cursor
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_string_roundtrip() {
        for outcome in [
            Outcome::Published,
            Outcome::SkippedFiltered,
            Outcome::SkippedEmpty,
            Outcome::FailedPermanent,
        ] {
            assert_eq!(Outcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(Outcome::parse("unknown"), None);
    }

    #[test]
    fn test_item_kind_parse() {
        assert_eq!(ItemKind::parse("photo"), Some(ItemKind::Photo));
        assert_eq!(ItemKind::parse("TEXT"), Some(ItemKind::Text));
        assert_eq!(ItemKind::parse("sticker"), None);
    }

    #[test]
    fn test_item_text_fallback() {
        let item = Item {
            id: 1,
            timestamp: Utc::now(),
            kind: ItemKind::Photo,
            raw_text: None,
            media_ref: Some("file-1".to_string()),
        };
        assert_eq!(item.text(), "");
        assert!(item.has_media());
    }

    #[test]
    fn test_tick_report_published_ids() {
        let report = TickReport::Completed(TickSummary {
            published: vec![(100, "m1".to_string()), (101, "m2".to_string())],
            ..Default::default()
        });
        assert_eq!(report.published_ids(), vec![100, 101]);

        let skipped = TickReport::Skipped(SkipReason::OutsideWindow);
        assert!(skipped.published_ids().is_empty());
    }

    #[test]
    fn test_summary_display_line() {
        let summary = TickSummary {
            published: vec![(100, "m1".to_string())],
            filtered: 2,
            failed: 1,
            already_seen: 3,
            cursor: Some(103),
        };
        let line = summary.display_line();
        assert!(line.contains("published=1"));
        assert!(line.contains("cursor=103"));
    }
}
