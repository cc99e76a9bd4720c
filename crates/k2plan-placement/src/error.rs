//! Placement error types.

use k2plan_core::ComponentKind;
use thiserror::Error;

/// Errors that reject a bind. The assignment table is left untouched.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("no free host with config {config} and {num_cpus} cores for {runnable}")]
    NoCapacity {
        runnable: String,
        config: String,
        num_cpus: u32,
    },

    #[error("cluster prerequisites are not met for {runnable}: missing {}", display_kinds(.missing))]
    PrerequisiteUnmet {
        runnable: String,
        missing: Vec<ComponentKind>,
    },

    #[error("no port base configured for component {component} of {runnable}")]
    PortBaseMissing { runnable: String, component: String },

    #[error("listen ports of {runnable} run past 65535: base {base}, {num_cpus} cpus")]
    PortRange {
        runnable: String,
        base: u16,
        num_cpus: u32,
    },

    #[error("runnable already bound: {0}")]
    DuplicateName(String),
}

impl PlacementError {
    /// Whether the same request may succeed once other runnables are bound.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlacementError::PrerequisiteUnmet { .. })
    }
}

fn display_kinds(kinds: &[ComponentKind]) -> String {
    kinds
        .iter()
        .map(ComponentKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type PlacementResult<T> = Result<T, PlacementError>;
