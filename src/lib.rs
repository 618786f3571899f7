//! carousel - Scheduled content rotation relay
//!
//! Repeatedly selects previously-unseen items from a source feed and
//! republishes a bounded number of them to a destination feed, on a
//! schedule, without ever repeating an item and with disallowed content
//! filtered out.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`filter`] - Content cleaning and acceptability rules
//! - [`ledger`] - Durable record of decided item ids and the cursor
//! - [`source`] - Candidate item discovery (window pull / cursor poll)
//! - [`transport`] - Feed platform boundary (fetch and publish)
//! - [`scheduler`] - The tick state machine and run loop
//!
//! # Example
//!
//! ```no_run
//! use carousel::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file(std::path::Path::new("carousel.toml"))?;
//!     config.validate()?;
//!     // build the scheduler from the config and run it
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod models;
pub mod scheduler;
pub mod source;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::filter::{ContentFilter, FilterResult};
    pub use crate::ledger::{FileLedger, PublishLedger, SqliteLedger};
    pub use crate::models::{Item, ItemKind, Outcome, SkipReason, TickReport};
    pub use crate::scheduler::{PublishingWindow, RotationScheduler, SelectionPolicy, TickLoop};
    pub use crate::source::{CandidateSource, HistoricalWindowSource, IncrementalPollSource};
    pub use crate::transport::{FeedRef, HttpTransport, Transport};
}

// Direct re-exports for convenience
pub use models::{Item, ItemKind, Outcome, TickReport};
