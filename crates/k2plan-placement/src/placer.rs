//! Placement engine — binds runnables into the assignment table.
//!
//! A bind:
//! 1. Picks the first empty slot (inventory order) whose host matches the
//!    runnable's config tag and has at least `num_cpus` cores.
//! 2. Checks startup-order prerequisites against the current table.
//! 3. Assigns the host's leading cores, runs the endpoint resolver and
//!    materializes the invocation, then commits the slot.
//!
//! Every check happens before the table is touched, so a rejected bind
//! leaves it unchanged. One host holds at most one runnable.

use k2plan_core::{ComponentKind, InventoryConfig, Placeholder, PortBases, Runnable};
use tracing::{debug, info, warn};

use crate::error::{PlacementError, PlacementResult};
use crate::materialize::materialize;
use crate::resolver::{EndpointResolver, ResolutionReport, last_port};
use crate::table::AssignmentTable;

/// The result of a successful bind.
#[derive(Debug, Clone)]
pub struct Binding {
    pub slot: usize,
    /// DNS name of the chosen host.
    pub host: String,
    pub report: ResolutionReport,
    /// The materialized command line, also stored on the bound runnable.
    pub invocation: String,
}

/// The result of an unbind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unbound {
    Removed { slot: usize, runnable: Runnable },
    NotFound,
}

/// Placement engine configured for one planning session.
#[derive(Debug, Clone)]
pub struct Placer {
    ports: PortBases,
}

impl Placer {
    pub fn new(ports: PortBases) -> Self {
        Self { ports }
    }

    pub fn from_inventory(inventory: &InventoryConfig) -> Self {
        Self::new(inventory.ports.clone())
    }

    pub fn ports(&self) -> &PortBases {
        &self.ports
    }

    /// Bind `runnable` into the table and resolve its arguments.
    pub fn bind(&self, table: &mut AssignmentTable, mut runnable: Runnable) -> PlacementResult<Binding> {
        if table.find_by_name(runnable.name()).is_some() {
            warn!(runnable = %runnable.name(), "runnable already bound");
            return Err(PlacementError::DuplicateName(runnable.name().to_string()));
        }

        let Some(slot) = find_slot(table, &runnable) else {
            warn!(
                runnable = %runnable.name(),
                config = %runnable.target_config(),
                num_cpus = runnable.num_cpus(),
                "no free hosts"
            );
            return Err(PlacementError::NoCapacity {
                runnable: runnable.name().to_string(),
                config: runnable.target_config().to_string(),
                num_cpus: runnable.num_cpus(),
            });
        };

        let missing = missing_prerequisites(table, runnable.component());
        if !missing.is_empty() {
            warn!(runnable = %runnable.name(), ?missing, "cluster prerequisites not met");
            return Err(PlacementError::PrerequisiteUnmet {
                runnable: runnable.name().to_string(),
                missing,
            });
        }

        if runnable.declares(Placeholder::MyEndpoints) {
            let Some(base) = self.ports.base_for(runnable.component()) else {
                return Err(PlacementError::PortBaseMissing {
                    runnable: runnable.name().to_string(),
                    component: runnable.component().to_string(),
                });
            };
            if last_port(base, runnable.num_cpus()).is_none() {
                warn!(runnable = %runnable.name(), base, num_cpus = runnable.num_cpus(), "listen ports out of range");
                return Err(PlacementError::PortRange {
                    runnable: runnable.name().to_string(),
                    base,
                    num_cpus: runnable.num_cpus(),
                });
            }
        }

        let host = table.slots()[slot].host.dns.clone();
        runnable.assign(&table.slots()[slot].host);

        let (mut runnable, report) = EndpointResolver::new(table, &self.ports).resolve(slot, runnable);
        let invocation = materialize(&runnable);
        runnable.set_invocation(invocation.clone());

        info!(
            runnable = %runnable.name(),
            component = %runnable.component(),
            host = %host,
            slot,
            cores = ?runnable.assigned_cores(),
            deferred = ?report.deferred(),
            "runnable bound"
        );
        table.occupy(slot, runnable);

        Ok(Binding {
            slot,
            host,
            report,
            invocation,
        })
    }

    /// Clear the slot holding the runnable named `name`.
    pub fn unbind(&self, table: &mut AssignmentTable, name: &str) -> Unbound {
        let Some(slot) = table.find_by_name(name) else {
            debug!(runnable = name, "unbind of unknown runnable ignored");
            return Unbound::NotFound;
        };
        match table.clear(slot) {
            Some(runnable) => {
                info!(runnable = name, slot, "runnable unbound");
                Unbound::Removed { slot, runnable }
            }
            None => Unbound::NotFound,
        }
    }
}

/// First-fit slot search. Ties go to the earliest host in inventory order.
pub fn find_slot(table: &AssignmentTable, runnable: &Runnable) -> Option<usize> {
    table.slots().iter().position(|slot| {
        slot.is_free()
            && slot.host.config == runnable.target_config()
            && runnable.num_cpus() as usize <= slot.host.cores.len()
    })
}

/// Prerequisite kinds of `kind` that have no bound runnable yet.
pub fn missing_prerequisites(table: &AssignmentTable, kind: &ComponentKind) -> Vec<ComponentKind> {
    kind.prerequisites()
        .into_iter()
        .filter(|k| !table.is_bound(k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k2plan_core::{Argument, Host, ENDPOINTS_ARG};

    fn make_host(i: usize, cores: u32, config: &str) -> Host {
        Host {
            dns: format!("server-{i}"),
            fast_ip: format!("192.168.1.{}", i * 2),
            cores: (10..10 + cores).collect(),
            rdma: "mlx5_0".to_string(),
            config: config.to_string(),
        }
    }

    fn placer() -> Placer {
        Placer::from_inventory(&InventoryConfig::scaffold())
    }

    fn make(kind: ComponentKind, name: &str, cpus: u32) -> Runnable {
        let args = vec![Argument::new(ENDPOINTS_ARG, "$my_endpoints")];
        Runnable::new(kind, name, cpus, "A", args).unwrap()
    }

    fn bind_core_services(placer: &Placer, table: &mut AssignmentTable) {
        placer.bind(table, make(ComponentKind::Cpo, "cpo0", 1)).unwrap();
        placer.bind(table, make(ComponentKind::Tso, "tso0", 1)).unwrap();
        placer.bind(table, make(ComponentKind::Persist, "persist0", 1)).unwrap();
    }

    #[test]
    fn first_fit_skips_small_and_mismatched_hosts() {
        let hosts = vec![
            make_host(1, 10, "B"),
            make_host(2, 2, "A"),
            make_host(3, 8, "A"),
            make_host(4, 10, "A"),
        ];
        let mut table = AssignmentTable::fresh(&hosts);
        let binding = placer().bind(&mut table, make(ComponentKind::Cpo, "cpo0", 4)).unwrap();

        assert_eq!(binding.slot, 2);
        assert_eq!(binding.host, "server-3");
    }

    #[test]
    fn one_runnable_per_host() {
        let mut table = AssignmentTable::fresh(&[make_host(1, 10, "A")]);
        let placer = placer();
        placer.bind(&mut table, make(ComponentKind::Cpo, "cpo0", 1)).unwrap();

        let err = placer.bind(&mut table, make(ComponentKind::Tso, "tso0", 1)).unwrap_err();
        assert!(matches!(err, PlacementError::NoCapacity { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn nodepool_requires_cpo_tso_persist() {
        let mut table = AssignmentTable::fresh(&InventoryConfig::scaffold().hosts);
        let placer = placer();

        let err = placer
            .bind(&mut table, make(ComponentKind::Nodepool, "nodepool0", 1))
            .unwrap_err();
        match &err {
            PlacementError::PrerequisiteUnmet { missing, .. } => assert_eq!(missing.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_retryable());
        assert_eq!(table.bound().count(), 0);

        bind_core_services(&placer, &mut table);
        assert!(placer.bind(&mut table, make(ComponentKind::Nodepool, "nodepool0", 1)).is_ok());
    }

    #[test]
    fn dependents_require_nodepool() {
        let mut table = AssignmentTable::fresh(&InventoryConfig::scaffold().hosts);
        let placer = placer();
        bind_core_services(&placer, &mut table);

        let client = Runnable::new(ComponentKind::Other("client".into()), "client0", 1, "A", vec![]).unwrap();
        let err = placer.bind(&mut table, client.clone()).unwrap_err();
        assert!(matches!(err, PlacementError::PrerequisiteUnmet { .. }));

        placer.bind(&mut table, make(ComponentKind::Nodepool, "nodepool0", 1)).unwrap();
        assert!(placer.bind(&mut table, client).is_ok());
    }

    #[test]
    fn capacity_is_checked_before_prerequisites() {
        let mut table = AssignmentTable::fresh(&[make_host(1, 2, "A")]);
        let err = placer()
            .bind(&mut table, make(ComponentKind::Nodepool, "nodepool0", 4))
            .unwrap_err();
        assert!(matches!(err, PlacementError::NoCapacity { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut table = AssignmentTable::fresh(&InventoryConfig::scaffold().hosts);
        let placer = placer();
        placer.bind(&mut table, make(ComponentKind::Cpo, "cpo0", 1)).unwrap();

        let err = placer.bind(&mut table, make(ComponentKind::Cpo, "cpo0", 1)).unwrap_err();
        assert!(matches!(err, PlacementError::DuplicateName(_)));
        assert_eq!(table.bound().count(), 1);
    }

    #[test]
    fn missing_port_base_rejects_before_binding() {
        let mut table = AssignmentTable::fresh(&[make_host(1, 4, "A")]);
        let placer = Placer::new(PortBases::default());

        let err = placer.bind(&mut table, make(ComponentKind::Cpo, "cpo0", 1)).unwrap_err();
        assert!(matches!(err, PlacementError::PortBaseMissing { .. }));
        assert!(table.slots()[0].is_free());
    }

    #[test]
    fn listen_ports_past_u16_reject_before_binding() {
        let mut table = AssignmentTable::fresh(&[make_host(1, 4, "A")]);
        let mut ports = PortBases::default();
        ports.insert(ComponentKind::Cpo, 65534);
        let placer = Placer::new(ports);

        let err = placer.bind(&mut table, make(ComponentKind::Cpo, "cpo0", 4)).unwrap_err();
        assert!(matches!(err, PlacementError::PortRange { base: 65534, num_cpus: 4, .. }));
        assert!(table.slots()[0].is_free());

        let binding = placer.bind(&mut table, make(ComponentKind::Cpo, "cpo1", 2)).unwrap();
        assert!(binding.invocation.ends_with(":65535"));
    }

    #[test]
    fn bind_records_cores_host_and_invocation() {
        let mut table = AssignmentTable::fresh(&InventoryConfig::scaffold().hosts);
        let binding = placer().bind(&mut table, make(ComponentKind::Cpo, "cpo0", 2)).unwrap();

        let bound = table.slots()[0].runnable.as_ref().unwrap();
        assert_eq!(bound.assigned_cores(), &[10, 11]);
        assert_eq!(bound.assigned_host(), Some("server-1.mydomain.com"));
        assert_eq!(bound.invocation(), Some(binding.invocation.as_str()));
        assert_eq!(
            binding.invocation,
            "--tcp_endpoints tcp+k2rpc://192.168.1.2:7000 tcp+k2rpc://192.168.1.2:7001"
        );
    }

    #[test]
    fn unbind_frees_slot_by_name() {
        let mut table = AssignmentTable::fresh(&InventoryConfig::scaffold().hosts);
        let placer = placer();
        placer.bind(&mut table, make(ComponentKind::Cpo, "cpo0", 1)).unwrap();
        placer.bind(&mut table, make(ComponentKind::Tso, "tso0", 1)).unwrap();

        match placer.unbind(&mut table, "tso0") {
            Unbound::Removed { slot, runnable } => {
                assert_eq!(slot, 1);
                assert_eq!(runnable.name(), "tso0");
            }
            Unbound::NotFound => panic!("tso0 should have been bound"),
        }
        assert!(table.slots()[1].is_free());
        assert!(table.is_bound(&ComponentKind::Cpo));

        // The freed host is first-fit again.
        let binding = placer.bind(&mut table, make(ComponentKind::Tso, "tso1", 1)).unwrap();
        assert_eq!(binding.slot, 1);
    }

    #[test]
    fn unbind_unknown_is_not_found() {
        let mut table = AssignmentTable::fresh(&InventoryConfig::scaffold().hosts);
        assert_eq!(placer().unbind(&mut table, "ghost"), Unbound::NotFound);
    }
}
