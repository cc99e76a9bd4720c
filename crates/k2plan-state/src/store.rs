//! SnapshotStore — redb-backed persistence for the assignment table.
//!
//! The whole table is one JSON value under [`CURRENT`]; a save overwrites
//! it. The store supports both on-disk and in-memory backends (the latter
//! for testing).

use std::path::Path;
use std::sync::Arc;

use k2plan_core::InventoryConfig;
use k2plan_placement::AssignmentTable;
use redb::{Database, ReadableDatabase};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::tables::{ASSIGNMENTS, CURRENT};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

#[derive(Clone)]
pub struct SnapshotStore {
    db: Arc<Database>,
}

impl SnapshotStore {
    /// Open (or create) a persistent snapshot store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "snapshot store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory snapshot store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory snapshot store opened");
        Ok(store)
    }

    /// Discard whatever is at `path` and create an empty store there.
    ///
    /// Used when the existing file could not be read as a snapshot, so a
    /// plain [`open`](Self::open) would keep failing on it.
    pub fn recreate(path: &Path) -> StateResult<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => warn!(?path, "discarded unreadable snapshot"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StateError::Open(e.to_string())),
        }
        Self::open(path)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(ASSIGNMENTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Load the saved table, if a session has saved one.
    pub fn load(&self) -> StateResult<Option<AssignmentTable>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Table))?;
        match table.get(CURRENT).map_err(map_err!(Read))? {
            Some(guard) => {
                let assignment: AssignmentTable =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                debug!(slots = assignment.len(), "snapshot loaded");
                Ok(Some(assignment))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the saved table.
    pub fn save(&self, assignment: &AssignmentTable) -> StateResult<()> {
        let value = serde_json::to_vec(assignment).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ASSIGNMENTS).map_err(map_err!(Table))?;
            table
                .insert(CURRENT, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            slots = assignment.len(),
            bound = assignment.bound().count(),
            "snapshot saved"
        );
        Ok(())
    }
}

/// Where a session's starting table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// No snapshot file, or an empty store.
    Fresh,
    Restored,
    /// A file existed but could not be read; the table is fresh and the
    /// file must be replaced on save.
    Unreadable,
}

/// Restore the session's table from `path`, or start fresh from the inventory.
///
/// A missing file, an unreadable store and an empty store all yield a
/// fresh table with one empty slot per inventory host.
pub fn load_or_fresh(path: &Path, inventory: &InventoryConfig) -> (AssignmentTable, SnapshotOrigin) {
    if !path.exists() {
        debug!(?path, "no snapshot, starting fresh");
        return (AssignmentTable::fresh(&inventory.hosts), SnapshotOrigin::Fresh);
    }

    let loaded = SnapshotStore::open(path).and_then(|store| store.load());
    match loaded {
        Ok(Some(assignment)) => {
            if !assignment.hosts().eq(inventory.hosts.iter()) {
                warn!(
                    ?path,
                    snapshot_hosts = assignment.len(),
                    inventory_hosts = inventory.hosts.len(),
                    "snapshot hosts differ from inventory, keeping snapshot"
                );
            }
            (assignment, SnapshotOrigin::Restored)
        }
        Ok(None) => {
            debug!(?path, "snapshot store empty, starting fresh");
            (AssignmentTable::fresh(&inventory.hosts), SnapshotOrigin::Fresh)
        }
        Err(e) => {
            warn!(?path, error = %e, "snapshot unreadable, starting fresh");
            (AssignmentTable::fresh(&inventory.hosts), SnapshotOrigin::Unreadable)
        }
    }
}

/// Overwrite the snapshot at `path` with `assignment`.
///
/// An unreadable file is replaced rather than opened.
pub fn save_snapshot(path: &Path, origin: SnapshotOrigin, assignment: &AssignmentTable) -> StateResult<()> {
    let store = match origin {
        SnapshotOrigin::Unreadable => SnapshotStore::recreate(path)?,
        SnapshotOrigin::Fresh | SnapshotOrigin::Restored => SnapshotStore::open(path)?,
    };
    store.save(assignment)
}
