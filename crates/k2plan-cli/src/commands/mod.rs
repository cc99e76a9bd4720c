use std::path::PathBuf;

use anyhow::Context;
use k2plan_core::InventoryConfig;
use k2plan_placement::{AssignmentTable, Placer};
use k2plan_state::{SnapshotOrigin, load_or_fresh, save_snapshot};

use crate::SessionArgs;

pub mod init;
pub mod plan;
pub mod show;

/// One planning session: the placer, the table it mutates, and where to save it.
pub struct Session {
    pub placer: Placer,
    pub table: AssignmentTable,
    state: PathBuf,
    origin: SnapshotOrigin,
}

impl Session {
    pub fn open(args: &SessionArgs) -> anyhow::Result<Self> {
        let inventory = InventoryConfig::from_file(&args.inventory)
            .with_context(|| format!("loading inventory {}", args.inventory.display()))?;
        let (table, origin) = load_or_fresh(&args.state, &inventory);
        Ok(Self {
            placer: Placer::from_inventory(&inventory),
            table,
            state: args.state.clone(),
            origin,
        })
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        save_snapshot(&self.state, self.origin, &self.table)
            .with_context(|| format!("saving state {}", self.state.display()))?;
        self.origin = SnapshotOrigin::Restored;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k2plan_core::{ComponentKind, Runnable};

    fn session_args(dir: &std::path::Path) -> SessionArgs {
        let inventory = dir.join("inventory.toml");
        std::fs::write(&inventory, InventoryConfig::scaffold().to_toml_string().unwrap()).unwrap();
        SessionArgs {
            inventory,
            state: dir.join("k2plan.redb"),
        }
    }

    #[test]
    fn session_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let args = session_args(dir.path());

        let mut session = Session::open(&args).unwrap();
        let cpo = Runnable::new(ComponentKind::Cpo, "cpo0", 1, "A", Vec::new()).unwrap();
        session.placer.bind(&mut session.table, cpo).unwrap();
        session.save().unwrap();

        let reopened = Session::open(&args).unwrap();
        assert_eq!(reopened.table.find_by_name("cpo0"), Some(0));
    }

    #[test]
    fn session_recovers_from_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        let args = session_args(dir.path());
        std::fs::write(&args.state, b"not a database").unwrap();

        let mut session = Session::open(&args).unwrap();
        assert_eq!(session.table.bound().count(), 0);
        let cpo = Runnable::new(ComponentKind::Cpo, "cpo0", 1, "A", Vec::new()).unwrap();
        session.placer.bind(&mut session.table, cpo).unwrap();
        session.save().unwrap();

        let reopened = Session::open(&args).unwrap();
        assert_eq!(reopened.table.find_by_name("cpo0"), Some(0));
    }

    #[test]
    fn missing_inventory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = SessionArgs {
            inventory: dir.path().join("nope.toml"),
            state: dir.path().join("k2plan.redb"),
        };
        assert!(Session::open(&args).is_err());
    }
}
