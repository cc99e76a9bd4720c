//! Host inventory configuration parser.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ComponentKind, Host};

/// Hosts available to a planning session, plus per-component port bases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default)]
    pub ports: PortBases,
    pub hosts: Vec<Host>,
}

/// First listen port per component kind, keyed by the kind's name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortBases(BTreeMap<String, u16>);

impl PortBases {
    pub fn base_for(&self, kind: &ComponentKind) -> Option<u16> {
        self.0.get(kind.as_str()).copied()
    }

    pub fn insert(&mut self, kind: ComponentKind, base: u16) {
        self.0.insert(kind.as_str().to_string(), base);
    }
}

impl InventoryConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InventoryConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject inventories a planning session cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.hosts.is_empty() {
            return Err(ConfigError::NoHosts);
        }
        for (i, host) in self.hosts.iter().enumerate() {
            if host.cores.is_empty() {
                return Err(ConfigError::NoCores(host.dns.clone()));
            }
            if self.hosts[..i].iter().any(|h| h.dns == host.dns) {
                return Err(ConfigError::DuplicateHost(host.dns.clone()));
            }
        }
        Ok(())
    }

    /// Scaffold the reference ten-host inventory.
    pub fn scaffold() -> Self {
        let mut ports = PortBases::default();
        ports.insert(ComponentKind::Cpo, 7000);
        ports.insert(ComponentKind::Tso, 8000);
        ports.insert(ComponentKind::Persist, 4000);
        ports.insert(ComponentKind::Nodepool, 10000);

        let hosts = (1..=10)
            .map(|i| Host {
                dns: format!("server-{i}.mydomain.com"),
                fast_ip: format!("192.168.1.{}", i * 2),
                cores: (10..20).collect(),
                rdma: "mlx5_0".to_string(),
                config: "A".to_string(),
            })
            .collect();

        InventoryConfig { ports, hosts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = InventoryConfig::scaffold();
        assert_eq!(config.hosts.len(), 10);
        assert_eq!(config.hosts[9].fast_ip, "192.168.1.20");
        assert_eq!(config.ports.base_for(&ComponentKind::Persist), Some(4000));
        assert!(config.validate().is_ok());

        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("server-10.mydomain.com"));
        let back: InventoryConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
[ports]
cpo = 7000

[[hosts]]
dns = "h1"
fast_ip = "10.0.0.1"
cores = [0, 1]
rdma = "mlx5_0"
config = "A"
"#;
        let config: InventoryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hosts[0].cores, vec![0, 1]);
        assert_eq!(config.ports.base_for(&ComponentKind::Cpo), Some(7000));
        assert_eq!(config.ports.base_for(&ComponentKind::Tso), None);
    }

    #[test]
    fn test_validate_rejects_bad_inventories() {
        let mut config = InventoryConfig::scaffold();
        config.hosts.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoHosts)));

        let mut config = InventoryConfig::scaffold();
        config.hosts[3].cores.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoCores(_))));

        let mut config = InventoryConfig::scaffold();
        config.hosts[1].dns = config.hosts[0].dns.clone();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateHost(_))));
    }
}
