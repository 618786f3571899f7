//! SQLite-backed ledger
//!
//! Uses one table for per-item outcomes and a key/value state table for the
//! cursor. WAL with synchronous=FULL keeps commits durable without locking
//! readers out. The connection sits behind a `Mutex`; the scheduler is
//! single-threaded per tick, so contention is not a concern.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{LedgerError, LedgerResult, LedgerStats, PublishLedger};
use crate::models::{ItemId, Outcome};

const CURSOR_KEY: &str = "cursor";

/// SQLite implementation of [`PublishLedger`].
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open (or create) a ledger database at `path`.
    ///
    /// A corrupt database is moved aside to `<path>.corrupt` and replaced
    /// with an empty ledger; the relay degrades to resending rather than
    /// refusing to start.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match Self::try_open(path) {
            Ok(ledger) => Ok(ledger),
            Err(e) if path.exists() => {
                let quarantine = path.with_extension("db.corrupt");
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %quarantine.display(),
                    error = %e,
                    "Ledger database unreadable, starting with an empty ledger"
                );
                std::fs::rename(path, &quarantine)?;
                Self::try_open(path)
            }
            Err(e) => Err(e),
        }
    }

    fn try_open(path: &Path) -> LedgerResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;

        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite ledger opened");
        Ok(ledger)
    }

    /// Create an in-memory ledger (for testing).
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self {
            conn: Mutex::new(conn),
        };
        ledger.create_schema()?;
        Ok(ledger)
    }

    fn create_schema(&self) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS publish_records (
                item_id INTEGER PRIMARY KEY,
                outcome TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_publish_records_outcome
                ON publish_records(outcome);

            CREATE TABLE IF NOT EXISTS ledger_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn existing_outcome(conn: &Connection, id: ItemId) -> LedgerResult<Option<Outcome>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT outcome FROM publish_records WHERE item_id = ?1",
                params![id as i64],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|s| Outcome::parse(&s)))
    }
}

impl PublishLedger for SqliteLedger {
    fn has(&self, id: ItemId) -> LedgerResult<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM publish_records WHERE item_id = ?1)",
            params![id as i64],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn record(&self, id: ItemId, outcome: Outcome) -> LedgerResult<()> {
        let conn = self.conn.lock().unwrap();

        if let Some(existing) = Self::existing_outcome(&conn, id)? {
            if existing == outcome {
                return Ok(());
            }
            return Err(LedgerError::ConflictingOutcome {
                id,
                existing,
                attempted: outcome,
            });
        }

        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO publish_records (item_id, outcome, recorded_at) VALUES (?1, ?2, ?3)",
            params![id as i64, outcome.as_str(), now],
        )?;

        Ok(())
    }

    fn cursor(&self) -> LedgerResult<Option<ItemId>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM ledger_state WHERE key = ?1",
                params![CURSOR_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|s| s.parse().ok()))
    }

    fn advance_cursor(&self, to: ItemId) -> LedgerResult<()> {
        let current = self.cursor()?;

        if let Some(current) = current {
            if to < current {
                return Err(LedgerError::Regression {
                    current,
                    attempted: to,
                });
            }
            if to == current {
                return Ok(());
            }
        }

        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO ledger_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![CURSOR_KEY, to.to_string(), now],
        )?;

        Ok(())
    }

    fn stats(&self) -> LedgerResult<LedgerStats> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT outcome, COUNT(*) FROM publish_records GROUP BY outcome")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut stats = LedgerStats::default();
        for row in rows {
            let (raw, count) = row?;
            if let Some(outcome) = Outcome::parse(&raw) {
                for _ in 0..count {
                    stats.count(outcome);
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger() {
        let ledger = SqliteLedger::in_memory().unwrap();

        assert!(!ledger.has(100).unwrap());
        assert_eq!(ledger.cursor().unwrap(), None);
        assert_eq!(ledger.stats().unwrap().total, 0);
    }

    #[test]
    fn test_record_and_has() {
        let ledger = SqliteLedger::in_memory().unwrap();

        ledger.record(100, Outcome::Published).unwrap();
        ledger.record(101, Outcome::SkippedFiltered).unwrap();

        assert!(ledger.has(100).unwrap());
        assert!(ledger.has(101).unwrap());
        assert!(!ledger.has(102).unwrap());
    }

    #[test]
    fn test_record_idempotent_same_outcome() {
        let ledger = SqliteLedger::in_memory().unwrap();

        ledger.record(100, Outcome::Published).unwrap();
        ledger.record(100, Outcome::Published).unwrap();

        assert_eq!(ledger.stats().unwrap().published, 1);
    }

    #[test]
    fn test_record_conflicting_outcome() {
        let ledger = SqliteLedger::in_memory().unwrap();

        ledger.record(100, Outcome::SkippedFiltered).unwrap();
        let err = ledger.record(100, Outcome::Published).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::ConflictingOutcome { id: 100, .. }
        ));
    }

    #[test]
    fn test_cursor_advance_and_regression() {
        let ledger = SqliteLedger::in_memory().unwrap();

        ledger.advance_cursor(10).unwrap();
        assert_eq!(ledger.cursor().unwrap(), Some(10));

        ledger.advance_cursor(25).unwrap();
        assert_eq!(ledger.cursor().unwrap(), Some(25));

        // Same value is a no-op
        ledger.advance_cursor(25).unwrap();

        let err = ledger.advance_cursor(24).unwrap_err();
        assert!(matches!(err, LedgerError::Regression { .. }));
        assert_eq!(ledger.cursor().unwrap(), Some(25));
    }

    #[test]
    fn test_file_backed_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let ledger = SqliteLedger::open(&path).unwrap();
            ledger.record(100, Outcome::Published).unwrap();
            ledger.advance_cursor(100).unwrap();
        }

        let ledger = SqliteLedger::open(&path).unwrap();
        assert!(ledger.has(100).unwrap());
        assert_eq!(ledger.cursor().unwrap(), Some(100));
    }

    #[test]
    fn test_corrupt_database_starts_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        std::fs::write(&path, "this is not a sqlite database, not even close").unwrap();

        let ledger = SqliteLedger::open(&path).unwrap();
        assert_eq!(ledger.stats().unwrap().total, 0);
        assert_eq!(ledger.cursor().unwrap(), None);

        // The corrupt file was kept for inspection
        assert!(path.with_extension("db.corrupt").exists());
    }

    #[test]
    fn test_stats_grouping() {
        let ledger = SqliteLedger::in_memory().unwrap();

        ledger.record(1, Outcome::Published).unwrap();
        ledger.record(2, Outcome::Published).unwrap();
        ledger.record(3, Outcome::SkippedEmpty).unwrap();
        ledger.record(4, Outcome::FailedPermanent).unwrap();

        let stats = ledger.stats().unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.skipped_empty, 1);
        assert_eq!(stats.failed_permanent, 1);
    }
}
