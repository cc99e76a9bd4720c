//! k2plan-state — persisted assignment table snapshots.
//!
//! Backed by [redb](https://docs.rs/redb). A planning session loads the
//! table at start, falling back to a fresh one built from the inventory,
//! and overwrites the snapshot when it ends.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::{SnapshotOrigin, SnapshotStore, load_or_fresh, save_snapshot};
