//! Shared types used across k2plan crates.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RequestError, RequestResult};

/// Transport tag a component advertises on its own listen endpoints.
pub const TCP_TRANSPORT: &str = "tcp+k2rpc";

/// Transport tag peers use once both ends are placed.
pub const RDMA_TRANSPORT: &str = "auto-rrdma+k2rpc";

/// Argument key under which a component publishes its listen endpoints.
pub const ENDPOINTS_ARG: &str = "tcp_endpoints";

// ── Component kinds ────────────────────────────────────────────────

/// The kind of cluster component a runnable launches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentKind {
    /// Storage coordinator.
    Cpo,
    /// Timestamp oracle.
    Tso,
    /// Durability log.
    Persist,
    /// Worker pool.
    Nodepool,
    /// Any component that runs against an existing nodepool (clients, benches).
    Other(String),
}

impl ComponentKind {
    pub fn as_str(&self) -> &str {
        match self {
            ComponentKind::Cpo => "cpo",
            ComponentKind::Tso => "tso",
            ComponentKind::Persist => "persist",
            ComponentKind::Nodepool => "nodepool",
            ComponentKind::Other(name) => name,
        }
    }

    /// Kinds that must already be bound before this kind may be bound.
    ///
    /// One bound instance of each listed kind is enough.
    pub fn prerequisites(&self) -> Vec<ComponentKind> {
        match self {
            ComponentKind::Cpo | ComponentKind::Tso | ComponentKind::Persist => Vec::new(),
            ComponentKind::Nodepool => vec![
                ComponentKind::Cpo,
                ComponentKind::Tso,
                ComponentKind::Persist,
            ],
            ComponentKind::Other(_) => vec![ComponentKind::Nodepool],
        }
    }
}

impl From<String> for ComponentKind {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "cpo" => ComponentKind::Cpo,
            "tso" => ComponentKind::Tso,
            "persist" => ComponentKind::Persist,
            "nodepool" => ComponentKind::Nodepool,
            _ => ComponentKind::Other(s),
        }
    }
}

impl From<ComponentKind> for String {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ComponentKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ComponentKind::from(s.to_string()))
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Hosts ──────────────────────────────────────────────────────────

/// One deployment target: a single fast-path network port and its cores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// DNS name of the server.
    pub dns: String,
    /// IP address of the network port components listen on.
    pub fast_ip: String,
    /// Core IDs in affinity priority order.
    pub cores: Vec<u32>,
    /// RDMA device name, e.g. `mlx5_0`.
    pub rdma: String,
    /// Hardware config tag of the server.
    pub config: String,
}

// ── Placeholders ───────────────────────────────────────────────────

/// A named argument value filled in once the runnable is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    MyEndpoints,
    Rdma,
    CpusExpand,
    CpoEndpoints,
    TsoEndpoints,
    PersistEndpoints,
}

impl Placeholder {
    pub const ALL: [Placeholder; 6] = [
        Placeholder::MyEndpoints,
        Placeholder::Rdma,
        Placeholder::CpusExpand,
        Placeholder::CpoEndpoints,
        Placeholder::TsoEndpoints,
        Placeholder::PersistEndpoints,
    ];

    /// The literal text a request uses to declare this placeholder.
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::MyEndpoints => "$my_endpoints",
            Placeholder::Rdma => "$rdma",
            Placeholder::CpusExpand => "$cpus_expand",
            Placeholder::CpoEndpoints => "$cpo_endpoints",
            Placeholder::TsoEndpoints => "$tso_endpoints",
            Placeholder::PersistEndpoints => "$persist_endpoints",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ── Runnables ──────────────────────────────────────────────────────

/// One `--key value` pair of a runnable's command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub key: String,
    pub value: String,
}

impl Argument {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A unit of workload requesting placement: one component process.
///
/// Identity and requirements are fixed by [`Runnable::new`]. Placement
/// only sets the assigned cores and host, fills placeholders and records
/// the final invocation.
///
/// Deserializing skips the checks in [`Runnable::new`]; only snapshots
/// this crate wrote are read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runnable {
    component: ComponentKind,
    name: String,
    /// Numeric suffix of `name` after the component prefix.
    ordinal: u32,
    num_cpus: u32,
    target_config: String,
    args: Vec<Argument>,
    assigned_cores: Vec<u32>,
    assigned_host: Option<String>,
    invocation: Option<String>,
}

impl Runnable {
    /// Validate a request and build an unplaced runnable.
    pub fn new(
        component: ComponentKind,
        name: impl Into<String>,
        num_cpus: u32,
        target_config: impl Into<String>,
        args: Vec<Argument>,
    ) -> RequestResult<Self> {
        let name = name.into();

        if num_cpus == 0 {
            return Err(RequestError::NoCpus(name));
        }

        let ordinal = parse_ordinal(&component, &name)?;

        for (i, arg) in args.iter().enumerate() {
            if args[..i].iter().any(|a| a.key == arg.key) {
                return Err(RequestError::DuplicateArgument {
                    runnable: name,
                    key: arg.key.clone(),
                });
            }
            if arg.value.starts_with('$') && Placeholder::from_token(&arg.value).is_none() {
                return Err(RequestError::UnknownPlaceholder {
                    runnable: name,
                    token: arg.value.clone(),
                });
            }
            if arg.value.starts_with('$') && args[..i].iter().any(|a| a.value == arg.value) {
                return Err(RequestError::RepeatedPlaceholder {
                    runnable: name,
                    token: arg.value.clone(),
                });
            }
        }

        Ok(Self {
            component,
            name,
            ordinal,
            num_cpus,
            target_config: target_config.into(),
            args,
            assigned_cores: Vec::new(),
            assigned_host: None,
            invocation: None,
        })
    }

    pub fn component(&self) -> &ComponentKind {
        &self.component
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn num_cpus(&self) -> u32 {
        self.num_cpus
    }

    pub fn target_config(&self) -> &str {
        &self.target_config
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn assigned_cores(&self) -> &[u32] {
        &self.assigned_cores
    }

    pub fn assigned_host(&self) -> Option<&str> {
        self.assigned_host.as_deref()
    }

    pub fn invocation(&self) -> Option<&str> {
        self.invocation.as_deref()
    }

    /// Value of the argument with the given key.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Whether an argument still carries this placeholder's token.
    pub fn declares(&self, placeholder: Placeholder) -> bool {
        self.args.iter().any(|a| a.value == placeholder.token())
    }

    /// Placeholders that have not been filled yet.
    pub fn unresolved(&self) -> Vec<Placeholder> {
        self.args
            .iter()
            .filter_map(|a| Placeholder::from_token(&a.value))
            .collect()
    }

    /// Replace the first argument still holding the placeholder's token.
    ///
    /// Returns `false` when no argument declares it. A filled value no
    /// longer matches the token, so each placeholder is written once.
    pub fn fill(&mut self, placeholder: Placeholder, value: String) -> bool {
        match self.args.iter_mut().find(|a| a.value == placeholder.token()) {
            Some(arg) => {
                arg.value = value;
                true
            }
            None => false,
        }
    }

    /// Bind to a host: take the first `num_cpus` cores in host order.
    pub fn assign(&mut self, host: &Host) {
        self.assigned_cores = host.cores.iter().take(self.num_cpus as usize).copied().collect();
        self.assigned_host = Some(host.dns.clone());
    }

    pub fn set_invocation(&mut self, invocation: String) {
        self.invocation = Some(invocation);
    }

    /// Endpoints this runnable publishes under [`ENDPOINTS_ARG`].
    ///
    /// Empty until the publishing argument has been resolved.
    pub fn published_endpoints(&self) -> Vec<&str> {
        match self.arg(ENDPOINTS_ARG) {
            Some(value) if Placeholder::from_token(value).is_none() => {
                value.split_whitespace().collect()
            }
            _ => Vec::new(),
        }
    }
}

fn parse_ordinal(component: &ComponentKind, name: &str) -> RequestResult<u32> {
    let invalid = || RequestError::InvalidName {
        name: name.to_string(),
        component: component.to_string(),
    };
    let prefix = component.as_str();
    let suffix = match name.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &name[prefix.len()..],
        _ => return Err(invalid()),
    };
    if suffix.is_empty() {
        return Ok(0);
    }
    suffix.parse::<u32>().map_err(|_| invalid())
}
