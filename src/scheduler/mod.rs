//! Content rotation scheduling
//!
//! The scheduler owns the publishing cycle: each tick it gates on the
//! configured publishing window, pulls candidates from the source, drops
//! everything the ledger has already decided, filters the rest, selects up
//! to the quota, publishes through the transport, and commits the cursor.
//!
//! # Overview
//!
//! ```text
//! Idle -> Gating -> Fetching -> Filtering -> Selecting -> Publishing -> Committing -> Idle
//! ```
//!
//! One cycle per tick, one tick at a time. Forced (manual) ticks bypass
//! only the gate and share the re-entrancy guard with scheduled ticks.
//!
//! # Modules
//!
//! - [`rotation`] - The tick state machine and the scheduler handle
//! - [`window`] - Publishing-hours gate in a configured time zone
//! - [`selection`] - Oldest-first and diverse-bucket selection policies
//! - [`trigger`] - Interval loop driving unforced ticks
//! - [`error`] - Scheduler error types
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use carousel::scheduler::{RotationScheduler, TickLoop};
//!
//! let scheduler = Arc::new(RotationScheduler::new(/* ... */)?);
//! let report = scheduler.run_tick(true).await?;   // one forced tick
//!
//! let tick_loop = TickLoop::new(scheduler, std::time::Duration::from_secs(60));
//! tick_loop.run().await?;                          // scheduled operation
//! ```

pub mod error;
pub mod rotation;
pub mod selection;
pub mod trigger;
pub mod window;

pub use error::{SchedulerError, SchedulerResult};
pub use rotation::{FeedRoute, PacingConfig, RotationScheduler};
pub use selection::SelectionPolicy;
pub use trigger::{ShutdownHandle, TickLoop};
pub use window::PublishingWindow;
