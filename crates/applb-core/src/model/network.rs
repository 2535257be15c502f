// ── Network domain types ──

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::NetworkId;

/// Traffic carried by a network. Only `Guest` networks may host the
/// source IP of an internal load balancer rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum TrafficType {
    Guest,
    Public,
    Management,
    Storage,
    Control,
}

/// Network services a guest network may offer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Service {
    Lb,
    Firewall,
    Dhcp,
    Dns,
    SourceNat,
}

/// Named capability a service advertises for a network.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Capability {
    SupportedProtocols,
    SupportedLbAlgorithms,
    SupportedStickinessMethods,
    LbSchemes,
}

/// Capability name to advertised value (comma-separated when it lists
/// several tokens, e.g. `"tcp,udp"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeMap<Capability, String>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability, value: impl Into<String>) -> Self {
        self.0.insert(capability, value.into());
        self
    }

    pub fn get(&self, capability: Capability) -> Option<&str> {
        self.0.get(&capability).map(String::as_str)
    }

    /// Whether `token` appears in the comma-separated value of `capability`.
    /// Comparison ignores case and surrounding whitespace.
    pub fn lists(&self, capability: Capability, token: &str) -> bool {
        self.get(capability).is_some_and(|value| {
            value
                .split(',')
                .any(|item| item.trim().eq_ignore_ascii_case(token))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Capability, String)> for Capabilities {
    fn from_iter<I: IntoIterator<Item = (Capability, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The attributes of a network the rule manager needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    pub name: String,
    pub traffic_type: TrafficType,
    pub cidr: Option<Ipv4Network>,
    pub gateway: Option<Ipv4Addr>,
}

impl Network {
    /// Whether `ip` falls within this network's CIDR. A network without a
    /// CIDR contains nothing.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.cidr.is_some_and(|cidr| cidr.contains(ip))
    }
}
