//! Runnable request files.
//!
//! A request file lists runnables in the order they should be placed:
//!
//! ```toml
//! [[runnables]]
//! component = "cpo"
//! name = "cpo0"
//! num_cpus = 2
//! target_config = "A"
//! args = [
//!     { key = "tcp_endpoints", value = "$my_endpoints" },
//!     { key = "rdma", value = "$rdma" },
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RequestResult;
use crate::types::{Argument, ComponentKind, Runnable};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFile {
    #[serde(default)]
    pub runnables: Vec<RunnableRequest>,
}

/// Unvalidated request to place one runnable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnableRequest {
    pub component: ComponentKind,
    pub name: String,
    pub num_cpus: u32,
    pub target_config: String,
    #[serde(default)]
    pub args: Vec<Argument>,
}

impl RequestFile {
    pub fn from_file(path: &Path) -> RequestResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> RequestResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl RunnableRequest {
    pub fn into_runnable(self) -> RequestResult<Runnable> {
        Runnable::new(
            self.component,
            self.name,
            self.num_cpus,
            self.target_config,
            self.args,
        )
    }
}
