//! Candidate selection policies
//!
//! After dedup and filtering, the scheduler holds a set of eligible
//! candidates and must pick at most `quota` of them. Two policies exist:
//!
//! - [`SelectionPolicy::OldestFirst`]: timestamp ascending, id ascending on
//!   ties. The default; guarantees starvation-free draining of the backlog.
//! - [`SelectionPolicy::DiverseBuckets`]: split the candidates at the
//!   midpoint timestamp into an older and a newer half and pick at most one
//!   item per bucket uniformly at random, to diversify recency. Sampling is
//!   seeded from the highest candidate id, so replaying the same tick picks
//!   the same items.

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::models::Item;

/// How the scheduler picks items out of the eligible candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Oldest candidates first, deterministic.
    #[default]
    OldestFirst,

    /// At most one random pick from each recency half of the candidates.
    DiverseBuckets,
}

impl SelectionPolicy {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OldestFirst => "oldest_first",
            Self::DiverseBuckets => "diverse_buckets",
        }
    }

    /// Create from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "oldest_first" => Some(Self::OldestFirst),
            "diverse_buckets" => Some(Self::DiverseBuckets),
            _ => None,
        }
    }

    /// Select up to `quota` items from `candidates`.
    ///
    /// `candidates` must already be ordered by `(timestamp, id)` ascending;
    /// the scheduler sorts once before calling.
    pub fn select(&self, candidates: &[Item], quota: usize) -> Vec<Item> {
        match self {
            Self::OldestFirst => candidates.iter().take(quota).cloned().collect(),
            Self::DiverseBuckets => Self::select_diverse(candidates, quota),
        }
    }

    fn select_diverse(candidates: &[Item], quota: usize) -> Vec<Item> {
        if candidates.is_empty() || quota == 0 {
            return Vec::new();
        }

        // Seed from the newest candidate id: stable across a replayed tick,
        // different across ticks as the feed advances.
        let seed = candidates.iter().map(|i| i.id).max().unwrap_or(0);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mid = candidates.len() / 2;
        let (older, newer) = candidates.split_at(mid);

        let mut picked = Vec::with_capacity(2);
        // An empty bucket is simply skipped.
        for bucket in [older, newer] {
            if picked.len() >= quota {
                break;
            }
            if let Some(item) = bucket.choose(&mut rng) {
                picked.push(item.clone());
            }
        }

        picked
    }
}
