//! File-backed ledger
//!
//! Persists the whole ledger as one JSON document, rewritten on every
//! mutation via temp-file + fsync + atomic rename. The store is small (one
//! entry per decided item id), so whole-document rewrites keep durability
//! simple: when `record` returns, the outcome is on disk.
//!
//! Loading is fail-open: a missing or unparsable file yields an empty
//! ledger with a logged warning. The relay would rather resend old content
//! after losing its state file than refuse to start.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{LedgerError, LedgerResult, LedgerStats, PublishLedger};
use crate::models::{ItemId, Outcome};

/// On-disk document shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerDocument {
    /// Decided item ids and their outcomes.
    records: BTreeMap<ItemId, Outcome>,

    /// Highest fully-processed item id.
    cursor: Option<ItemId>,
}

/// JSON-file implementation of [`PublishLedger`].
pub struct FileLedger {
    path: PathBuf,
    state: Mutex<LedgerDocument>,
}

impl FileLedger {
    /// Open a ledger at `path`, creating parent directories as needed.
    ///
    /// Missing file: starts empty. Corrupt file: logs a warning and starts
    /// empty (the corrupt content is left in place for inspection).
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let state = Self::load(&path);

        tracing::info!(
            path = %path.display(),
            records = state.records.len(),
            cursor = ?state.cursor,
            "File ledger opened"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn load(path: &Path) -> LedgerDocument {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LedgerDocument::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ledger file unreadable, starting with an empty ledger"
                );
                return LedgerDocument::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ledger file corrupt, starting with an empty ledger"
                );
                LedgerDocument::default()
            }
        }
    }

    /// Write the document to a temp file, fsync, then rename into place.
    fn persist(&self, doc: &LedgerDocument) -> LedgerResult<()> {
        let temp_path = self.path.with_extension("json.tmp");

        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, doc)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&temp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Ledger persisted");
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PublishLedger for FileLedger {
    fn has(&self, id: ItemId) -> LedgerResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.records.contains_key(&id))
    }

    fn record(&self, id: ItemId, outcome: Outcome) -> LedgerResult<()> {
        let mut state = self.state.lock().unwrap();

        if let Some(&existing) = state.records.get(&id) {
            if existing == outcome {
                return Ok(());
            }
            return Err(LedgerError::ConflictingOutcome {
                id,
                existing,
                attempted: outcome,
            });
        }

        state.records.insert(id, outcome);
        self.persist(&state)
    }

    fn cursor(&self) -> LedgerResult<Option<ItemId>> {
        let state = self.state.lock().unwrap();
        Ok(state.cursor)
    }

    fn advance_cursor(&self, to: ItemId) -> LedgerResult<()> {
        let mut state = self.state.lock().unwrap();

        if let Some(current) = state.cursor {
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

        state.cursor = Some(to);
        self.persist(&state)
    }

    fn stats(&self) -> LedgerResult<LedgerStats> {
        let state = self.state.lock().unwrap();
        let mut stats = LedgerStats::default();
        for outcome in state.records.values() {
            stats.count(*outcome);
        }
        Ok(stats)
    }
}
