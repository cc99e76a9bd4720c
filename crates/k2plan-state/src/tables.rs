//! redb table definitions for the snapshot store.
//!
//! Values are JSON-serialized [`k2plan_placement::AssignmentTable`]s.

use redb::TableDefinition;

/// Assignment snapshots keyed by name; a session reads and writes [`CURRENT`].
pub const ASSIGNMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("assignments");

/// Key of the snapshot a planning session loads and overwrites.
pub const CURRENT: &str = "current";
