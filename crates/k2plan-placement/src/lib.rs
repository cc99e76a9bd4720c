//! k2plan placement — first-fit host matching and topology resolution.
//!
//! Binds runnables into an [`AssignmentTable`] one at a time, enforcing
//! capacity, hardware config and startup-order prerequisites, then fills
//! each runnable's endpoint placeholders from the peers already bound.
//!
//! # Components
//!
//! - **`table`** — Assignment table (one slot per host)
//! - **`placer`** — Placement engine (first-fit, prerequisites, bind/unbind)
//! - **`resolver`** — Endpoint resolver (listen endpoints, peers, rotation)
//! - **`materialize`** — Argument materializer (final command line)

pub mod error;
pub mod materialize;
pub mod placer;
pub mod resolver;
pub mod table;

pub use error::{PlacementError, PlacementResult};
pub use materialize::materialize;
pub use placer::{Binding, Placer, Unbound, find_slot, missing_prerequisites};
pub use resolver::{EndpointResolver, Resolution, ResolutionReport, last_port, spread_endpoints};
pub use table::{AssignmentTable, Slot};
