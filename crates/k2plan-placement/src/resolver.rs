//! Endpoint resolver — fills a freshly bound runnable's placeholders.
//!
//! Runs once per bind, after the runnable has its host and cores. Each
//! fill is a pure function of the assignment table:
//!
//! 1. `$my_endpoints`: one listen endpoint per owned cpu, from the
//!    component's port base upward, over `tcp+k2rpc`.
//! 2. `$rdma`: the host's RDMA device.
//! 3. `$cpus_expand`: the assigned cores, comma separated.
//! 4. `$cpo_endpoints` / `$tso_endpoints`: endpoints published by bound
//!    peers, rewritten to `auto-rrdma+k2rpc`. The oracle only advertises
//!    its first endpoint.
//! 5. `$persist_endpoints`: every bound persist endpoint, rotated per
//!    worker ordinal (see [`spread_endpoints`]).
//!
//! A peer that is not bound yet leaves its placeholder in place and is
//! reported as [`Resolution::DeferredMissingPeer`]; it never fails a bind.

use std::collections::BTreeMap;

use k2plan_core::{ComponentKind, Host, Placeholder, PortBases, RDMA_TRANSPORT, Runnable, TCP_TRANSPORT};
use tracing::{debug, warn};

use crate::table::AssignmentTable;

/// Outcome of a single placeholder fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    /// Declared, but the peers it points at are not bound yet.
    DeferredMissingPeer,
    /// The runnable never declared this placeholder.
    NotApplicable,
}

/// Per-placeholder outcomes of one resolver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    outcomes: BTreeMap<Placeholder, Resolution>,
}

impl ResolutionReport {
    pub fn get(&self, placeholder: Placeholder) -> Resolution {
        self.outcomes
            .get(&placeholder)
            .copied()
            .unwrap_or(Resolution::NotApplicable)
    }

    /// Placeholders left unresolved because a peer is missing.
    pub fn deferred(&self) -> Vec<Placeholder> {
        self.outcomes
            .iter()
            .filter(|(_, r)| **r == Resolution::DeferredMissingPeer)
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn has_deferred(&self) -> bool {
        self.outcomes
            .values()
            .any(|r| *r == Resolution::DeferredMissingPeer)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, Resolution)> + '_ {
        self.outcomes.iter().map(|(p, r)| (*p, *r))
    }

    fn record(&mut self, placeholder: Placeholder, resolution: Resolution) {
        self.outcomes.insert(placeholder, resolution);
    }
}

/// Resolves placeholders against a read-only view of the table.
pub struct EndpointResolver<'a> {
    table: &'a AssignmentTable,
    ports: &'a PortBases,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(table: &'a AssignmentTable, ports: &'a PortBases) -> Self {
        Self { table, ports }
    }

    /// Fill every placeholder of `runnable`, which is about to occupy `slot`.
    ///
    /// The runnable is taken by value for the duration of the fills and
    /// handed back with the report. During peer discovery it is visible
    /// at `slot`, as if already bound there.
    pub fn resolve(&self, slot: usize, mut runnable: Runnable) -> (Runnable, ResolutionReport) {
        let host = &self.table.slots()[slot].host;
        let mut report = ResolutionReport::default();

        let mine = match self.ports.base_for(runnable.component()) {
            Some(base) => {
                let endpoints = self_endpoints(host, base, runnable.num_cpus());
                if endpoints.is_none() && runnable.declares(Placeholder::MyEndpoints) {
                    warn!(
                        runnable = %runnable.name(),
                        base,
                        num_cpus = runnable.num_cpus(),
                        "listen ports run past 65535, listen endpoints left unresolved"
                    );
                }
                endpoints
            }
            None => {
                if runnable.declares(Placeholder::MyEndpoints) {
                    warn!(
                        runnable = %runnable.name(),
                        component = %runnable.component(),
                        "no port base configured, listen endpoints left unresolved"
                    );
                }
                None
            }
        };
        fill(&mut runnable, &mut report, Placeholder::MyEndpoints, mine);

        fill(&mut runnable, &mut report, Placeholder::Rdma, Some(host.rdma.clone()));

        let cpus = runnable
            .assigned_cores()
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        fill(&mut runnable, &mut report, Placeholder::CpusExpand, Some(cpus));

        let cpo = self.peer_endpoints(slot, &runnable, &ComponentKind::Cpo);
        fill(&mut runnable, &mut report, Placeholder::CpoEndpoints, non_empty(cpo).map(|e| e.join(" ")));

        // The oracle fans out to its own workers; peers only need the master.
        let tso = self
            .peer_endpoints(slot, &runnable, &ComponentKind::Tso)
            .into_iter()
            .next();
        fill(&mut runnable, &mut report, Placeholder::TsoEndpoints, tso);

        let persist = self.peer_endpoints(slot, &runnable, &ComponentKind::Persist);
        let persist = non_empty(persist).map(|endpoints| {
            spread_endpoints(endpoints, runnable.num_cpus(), runnable.ordinal())
        });
        fill(&mut runnable, &mut report, Placeholder::PersistEndpoints, persist.map(|e| e.join(" ")));

        (runnable, report)
    }

    /// Endpoints published by every bound runnable of `kind`, in slot
    /// order, rewritten to the RDMA transport.
    fn peer_endpoints(&self, slot: usize, runnable: &Runnable, kind: &ComponentKind) -> Vec<String> {
        self.table
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(i, s)| if i == slot { Some(runnable) } else { s.runnable.as_ref() })
            .filter(|r| r.component() == kind)
            .flat_map(|r| r.published_endpoints())
            .map(|endpoint| endpoint.replace(TCP_TRANSPORT, RDMA_TRANSPORT))
            .collect()
    }
}

/// Rotate the storage endpoint list so each worker starts on its own window.
///
/// Lists no longer than `num_cpus` are returned whole: every worker core
/// already talks to every storage endpoint. Otherwise the list is rotated
/// left by `num_cpus` positions once per ordinal, i.e. by
/// `num_cpus * ordinal mod len`.
pub fn spread_endpoints<T>(mut endpoints: Vec<T>, num_cpus: u32, ordinal: u32) -> Vec<T> {
    let len = endpoints.len();
    if len <= num_cpus as usize {
        return endpoints;
    }
    let shift = (u64::from(num_cpus) * u64::from(ordinal)) % len as u64;
    endpoints.rotate_left(shift as usize);
    endpoints
}

/// Last listen port of a runnable with `num_cpus` cpus, if it fits in a `u16`.
pub fn last_port(base: u16, num_cpus: u32) -> Option<u16> {
    let span = u16::try_from(num_cpus.checked_sub(1)?).ok()?;
    base.checked_add(span)
}

fn self_endpoints(host: &Host, base: u16, num_cpus: u32) -> Option<String> {
    let last = last_port(base, num_cpus)?;
    Some(
        (base..=last)
            .map(|port| format!("{TCP_TRANSPORT}://{}:{port}", host.fast_ip))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn non_empty(endpoints: Vec<String>) -> Option<Vec<String>> {
    (!endpoints.is_empty()).then_some(endpoints)
}

fn fill(
    runnable: &mut Runnable,
    report: &mut ResolutionReport,
    placeholder: Placeholder,
    value: Option<String>,
) {
    if !runnable.declares(placeholder) {
        report.record(placeholder, Resolution::NotApplicable);
        return;
    }
    match value {
        Some(value) => {
            runnable.fill(placeholder, value);
            report.record(placeholder, Resolution::Resolved);
        }
        None => {
            debug!(runnable = %runnable.name(), %placeholder, "placeholder deferred, peer not bound");
            report.record(placeholder, Resolution::DeferredMissingPeer);
        }
    }
}
