use std::path::PathBuf;

use thiserror::Error;

use crate::core::Ledger;

/// Errors from the snapshot layer. Both are recoverable: a failed save
/// leaves the in-memory ledger intact for a retry, and a corrupt
/// snapshot degrades to an empty ledger (see
/// [`LedgerStore::load_or_empty`]).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist snapshot to {path}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read snapshot from {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn path(&self) -> &std::path::Path {
        match self {
            StoreError::Persistence { path, .. }
            | StoreError::Load { path, .. }
            | StoreError::Corrupt { path, .. } => path,
        }
    }
}

pub trait LedgerStore {
    /// Restores the ledger from the snapshot. A snapshot that has never
    /// been written is not an error: it yields an empty ledger.
    fn load(&self) -> Result<Ledger, StoreError>;

    /// Replaces the snapshot wholesale with the current ledger state.
    fn save(&self, ledger: &Ledger) -> Result<(), StoreError>;

    /// The "start fresh on corruption" policy: an unreadable or
    /// malformed snapshot yields an empty ledger with the error
    /// reported alongside, never a crash.
    fn load_or_empty(&self) -> (Ledger, Option<StoreError>) {
        match self.load() {
            Ok(ledger) => (ledger, None),
            Err(err) => {
                log::warn!(
                    "discarding unusable snapshot at {}: {}",
                    err.path().display(),
                    err
                );
                (Ledger::new(), Some(err))
            }
        }
    }
}
