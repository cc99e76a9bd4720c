//! k2plan-core — data model and operator inputs for cluster planning.
//!
//! Hosts, component kinds, runnables and their placeholder arguments,
//! plus the TOML inventory and request files an operator supplies.

pub mod config;
pub mod error;
pub mod request;
pub mod types;

pub use config::{InventoryConfig, PortBases};
pub use error::{ConfigError, ConfigResult, RequestError, RequestResult};
pub use request::{RequestFile, RunnableRequest};
pub use types::*;
