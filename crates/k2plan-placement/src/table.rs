//! Cluster assignment table — one slot per host, each empty or bound.
//!
//! The table is the only mutable state of a planning session. Slot order
//! follows the host inventory and never changes, so first-fit placement
//! and peer discovery both walk hosts in inventory order.

use std::fmt::Write as _;

use k2plan_core::{ComponentKind, Host, Runnable};
use serde::{Deserialize, Serialize};

/// A host's placement capacity, bound to at most one runnable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub host: Host,
    pub runnable: Option<Runnable>,
}

impl Slot {
    pub fn is_free(&self) -> bool {
        self.runnable.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTable {
    slots: Vec<Slot>,
}

impl AssignmentTable {
    /// A table with one empty slot per host, in inventory order.
    pub fn fresh(hosts: &[Host]) -> Self {
        Self {
            slots: hosts
                .iter()
                .map(|host| Slot {
                    host: host.clone(),
                    runnable: None,
                })
                .collect(),
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Hosts in slot order.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.slots.iter().map(|s| &s.host)
    }

    /// Bound runnables in slot order.
    pub fn bound(&self) -> impl Iterator<Item = &Runnable> {
        self.slots.iter().filter_map(|s| s.runnable.as_ref())
    }

    pub fn is_bound(&self, kind: &ComponentKind) -> bool {
        self.bound().any(|r| r.component() == kind)
    }

    /// Slot index of the runnable bound under `name`.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.runnable.as_ref().is_some_and(|r| r.name() == name))
    }

    /// Number of empty slots whose host carries the given config tag.
    pub fn free_slots(&self, config: &str) -> usize {
        self.slots
            .iter()
            .filter(|s| s.is_free() && s.host.config == config)
            .count()
    }

    /// One line per slot: host, config, and the bound runnable if any.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (i, slot) in self.slots.iter().enumerate() {
            let _ = match &slot.runnable {
                Some(r) => writeln!(
                    out,
                    "{i:>3}  {:<28} {:<4} {} ({}, {} cpus)",
                    slot.host.dns,
                    slot.host.config,
                    r.name(),
                    r.component(),
                    r.num_cpus()
                ),
                None => writeln!(out, "{i:>3}  {:<28} {:<4} -", slot.host.dns, slot.host.config),
            };
        }
        out
    }

    pub(crate) fn occupy(&mut self, index: usize, runnable: Runnable) {
        debug_assert!(self.slots[index].is_free());
        self.slots[index].runnable = Some(runnable);
    }

    pub(crate) fn clear(&mut self, index: usize) -> Option<Runnable> {
        self.slots.get_mut(index).and_then(|s| s.runnable.take())
    }
}
