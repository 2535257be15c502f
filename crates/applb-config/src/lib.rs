//! Configuration for the applb rule manager.
//!
//! A TOML file describes the networks and accounts the manager can see and
//! tunes the manager itself. Environment variables prefixed `APPLB_`
//! override the file (`APPLB_MANAGER__USAGE_EVENTS=false`). The loaded
//! [`Config`] is turned into an in-memory cluster by [`build_cluster`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use applb_core::store::{MemoryCluster, NetworkSpec};
use applb_core::{
    AccountId, Capabilities, Capability, CoreError, ManagerConfig, Network, NetworkId, Service,
    TrafficType,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub manager: ManagerConfig,

    #[serde(default)]
    pub networks: Vec<NetworkConfig>,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// One `[[networks]]` entry. Fields stay as written so that validation can
/// point at the offending entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
    pub id: u64,

    pub name: String,

    /// `Guest`, `Public`, `Management`, `Storage` or `Control`.
    #[serde(default = "default_traffic_type")]
    pub traffic_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    /// Services offered, e.g. `["Lb", "Firewall"]`.
    #[serde(default)]
    pub services: Vec<String>,

    /// Capabilities of the load-balancing service, e.g.
    /// `SupportedLbAlgorithms = "roundrobin,leastconn"`.
    #[serde(default)]
    pub capabilities: BTreeMap<String, String>,
}

fn default_traffic_type() -> String {
    TrafficType::Guest.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountConfig {
    pub id: u64,
    pub name: String,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "applb", "applb").map_or_else(
        || PathBuf::from(".applb").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the rule state file, next to the config.
pub fn state_path() -> PathBuf {
    ProjectDirs::from("com", "applb", "applb").map_or_else(
        || PathBuf::from(".applb").join("rules.json"),
        |dirs| dirs.data_dir().join("rules.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from `path` (or the platform default) plus environment.
///
/// An explicit path must exist. The platform default may be missing, in
/// which case only defaults and environment apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };
    debug!(path = %file.display(), "loading config");

    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&file))
        .merge(Env::prefixed("APPLB_").split("__"))
        .extract()?;
    Ok(config)
}

/// Render a config back to TOML.
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

// ── Cluster wiring ──────────────────────────────────────────────────

impl NetworkConfig {
    /// Validate this entry and turn it into a network spec.
    pub fn to_spec(&self) -> Result<NetworkSpec, ConfigError> {
        let field = |name: &str| format!("networks[id={}].{name}", self.id);

        let traffic_type = TrafficType::from_str(&self.traffic_type).map_err(|_| {
            invalid(
                field("traffic_type"),
                format!("unknown traffic type '{}'", self.traffic_type),
            )
        })?;

        let cidr = self
            .cidr
            .as_deref()
            .map(|raw| {
                Ipv4Network::from_str(raw).map_err(|e| {
                    invalid(field("cidr"), format!("'{raw}' is not an IPv4 CIDR: {e}"))
                })
            })
            .transpose()?;

        let gateway = self
            .gateway
            .as_deref()
            .map(|raw| {
                Ipv4Addr::from_str(raw).map_err(|e| {
                    invalid(field("gateway"), format!("'{raw}' is not an IPv4 address: {e}"))
                })
            })
            .transpose()?;

        if let (Some(gw), Some(net)) = (gateway, cidr) {
            if !net.contains(gw) {
                return Err(invalid(field("gateway"), format!("{gw} is outside {net}")));
            }
        }

        let services = self
            .services
            .iter()
            .map(|raw| {
                Service::from_str(raw)
                    .map_err(|_| invalid(field("services"), format!("unknown service '{raw}'")))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let capabilities = self
            .capabilities
            .iter()
            .map(|(name, value)| {
                Capability::from_str(name)
                    .map(|cap| (cap, value.clone()))
                    .map_err(|_| {
                        invalid(field("capabilities"), format!("unknown capability '{name}'"))
                    })
            })
            .collect::<Result<Capabilities, _>>()?;

        Ok(NetworkSpec {
            network: Network {
                id: NetworkId::new(self.id),
                name: self.name.clone(),
                traffic_type,
                cidr,
                gateway,
            },
            services,
            capabilities,
        })
    }
}

/// Build an in-memory cluster holding every configured network and account.
pub fn build_cluster(config: &Config) -> Result<MemoryCluster, ConfigError> {
    let cluster = MemoryCluster::new();

    let mut seen = HashSet::new();
    for entry in &config.networks {
        if !seen.insert(entry.id) {
            return Err(invalid("networks", format!("duplicate network id {}", entry.id)));
        }
        cluster.add_network(entry.to_spec()?);
    }

    let mut seen = HashSet::new();
    for account in &config.accounts {
        if !seen.insert(account.id) {
            return Err(invalid("accounts", format!("duplicate account id {}", account.id)));
        }
        cluster.add_account(AccountId::new(account.id), account.name.clone());
    }

    debug!(
        networks = config.networks.len(),
        accounts = config.accounts.len(),
        "built cluster from config"
    );
    Ok(cluster)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn guest() -> NetworkConfig {
        NetworkConfig {
            id: 1,
            name: "guest".into(),
            traffic_type: "Guest".into(),
            cidr: Some("10.1.1.0/24".into()),
            gateway: Some("10.1.1.1".into()),
            services: vec!["Lb".into(), "firewall".into()],
            capabilities: BTreeMap::from([(
                "SupportedLbAlgorithms".into(),
                "roundrobin,leastconn".into(),
            )]),
        }
    }

    #[test]
    fn network_entry_becomes_spec() {
        let spec = guest().to_spec().unwrap();
        assert_eq!(spec.network.traffic_type, TrafficType::Guest);
        assert_eq!(spec.network.gateway, Some(Ipv4Addr::new(10, 1, 1, 1)));
        assert!(spec.services.contains(&Service::Firewall));
        assert!(spec.capabilities.lists(Capability::SupportedLbAlgorithms, "leastconn"));
    }

    #[test]
    fn bad_cidr_names_the_field() {
        let mut net = guest();
        net.cidr = Some("10.1.1.0/33".into());
        let err = net.to_spec().unwrap_err();
        assert!(err.to_string().starts_with("invalid networks[id=1].cidr"));
    }

    #[test]
    fn gateway_must_sit_inside_cidr() {
        let mut net = guest();
        net.gateway = Some("10.9.9.9".into());
        assert!(matches!(net.to_spec(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn unknown_traffic_type_is_rejected() {
        let mut net = guest();
        net.traffic_type = "Tunnel".into();
        assert!(net.to_spec().is_err());
    }

    #[test]
    fn duplicate_network_ids_are_rejected() {
        let config = Config {
            networks: vec![guest(), guest()],
            ..Config::default()
        };
        let Err(err) = build_cluster(&config) else {
            panic!("duplicate network ids must not build a cluster");
        };
        assert_eq!(err.to_string(), "invalid networks: duplicate network id 1");
    }

    #[test]
    fn render_round_trips_through_toml() {
        let config = Config {
            networks: vec![guest()],
            accounts: vec![AccountConfig {
                id: 1,
                name: "admin".into(),
            }],
            ..Config::default()
        };
        let rendered = render_config(&config).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
