//! Error types for the scheduler module

use std::fmt;

use crate::ledger::LedgerError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Publishing window hours are inconsistent
    InvalidWindow { start_hour: u32, end_hour: u32 },

    /// Quota must be at least 1
    InvalidQuota,

    /// Configured time zone is not a known IANA zone
    InvalidTimezone { tz: String },

    /// Ledger invariant violation or storage failure
    Ledger(LedgerError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWindow {
                start_hour,
                end_hour,
            } => {
                write!(
                    f,
                    "Invalid publishing window: start {start_hour}, end {end_hour} (need 0 <= start < end <= 24)"
                )
            }
            Self::InvalidQuota => {
                write!(f, "Invalid quota: must allow at least 1 item per tick")
            }
            Self::InvalidTimezone { tz } => {
                write!(f, "Invalid timezone: {tz}")
            }
            Self::Ledger(e) => {
                write!(f, "Ledger error: {e}")
            }
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LedgerError> for SchedulerError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl SchedulerError {
    /// Create an invalid window error
    pub fn invalid_window(start_hour: u32, end_hour: u32) -> Self {
        Self::InvalidWindow {
            start_hour,
            end_hour,
        }
    }

    /// Create an invalid quota error
    pub fn invalid_quota() -> Self {
        Self::InvalidQuota
    }

    /// Create an invalid timezone error
    pub fn invalid_timezone(tz: impl Into<String>) -> Self {
        Self::InvalidTimezone { tz: tz.into() }
    }

    /// True if the run loop must stop rather than keep ticking.
    ///
    /// Ledger invariant violations mean the relay's memory can no longer
    /// be trusted. The window/quota/timezone variants are configuration
    /// errors caught before the loop ever starts.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_fatal(),
            _ => true,
        }
    }
}
