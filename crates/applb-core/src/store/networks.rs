// ── In-memory network directory ──
//
// Networks, the services they offer, and one address pool per network.
// Pool mutations run under the pool's `DashMap` entry guard, which makes
// each allocate/reserve/release indivisible.

use std::collections::{BTreeSet, HashSet};
use std::net::Ipv4Addr;

use dashmap::DashMap;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{Capabilities, Capability, Network, NetworkId, Service, TrafficType};
use crate::ports::{AddressPool, CapabilityOracle, NetworkDirectory};

/// A network plus what it offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub network: Network,
    pub services: BTreeSet<Service>,
    pub capabilities: Capabilities,
}

impl NetworkSpec {
    /// A guest network offering load balancing over TCP.
    pub fn guest(id: u64, name: &str, cidr: &str) -> Result<Self, CoreError> {
        let cidr: Ipv4Network = cidr.parse().map_err(|e| CoreError::Config {
            message: format!("invalid CIDR '{cidr}': {e}"),
        })?;
        Ok(Self {
            network: Network {
                id: NetworkId::new(id),
                name: name.into(),
                traffic_type: TrafficType::Guest,
                cidr: Some(cidr),
                gateway: None,
            },
            services: [Service::Lb, Service::Firewall].into_iter().collect(),
            capabilities: Capabilities::new().with(Capability::SupportedProtocols, "tcp"),
        })
    }

    /// A public network. Never valid as a rule's source network.
    pub fn public(id: u64, name: &str) -> Self {
        Self {
            network: Network {
                id: NetworkId::new(id),
                name: name.into(),
                traffic_type: TrafficType::Public,
                cidr: None,
                gateway: None,
            },
            services: BTreeSet::new(),
            capabilities: Capabilities::new(),
        }
    }
}

pub struct MemoryNetworkDirectory {
    networks: DashMap<NetworkId, NetworkSpec>,
    /// Addresses currently taken, per network.
    in_use: DashMap<NetworkId, HashSet<Ipv4Addr>>,
}

impl MemoryNetworkDirectory {
    pub fn new() -> Self {
        Self {
            networks: DashMap::new(),
            in_use: DashMap::new(),
        }
    }

    /// Add or replace a network. Its pool keeps any addresses already taken.
    pub fn insert(&self, spec: NetworkSpec) {
        self.in_use.entry(spec.network.id).or_default();
        self.networks.insert(spec.network.id, spec);
    }

    pub fn is_in_use(&self, network: NetworkId, ip: Ipv4Addr) -> bool {
        self.in_use
            .get(&network)
            .is_some_and(|taken| taken.contains(&ip))
    }

    pub fn networks(&self) -> Vec<NetworkSpec> {
        let mut specs: Vec<NetworkSpec> = self.networks.iter().map(|r| r.value().clone()).collect();
        specs.sort_by_key(|s| s.network.id);
        specs
    }

    fn range(&self, network: NetworkId) -> Result<(Ipv4Network, Option<Ipv4Addr>), CoreError> {
        let spec = self.networks.get(&network).ok_or_else(|| {
            CoreError::invalid_parameter(format!("Unable to find network by id {network}"))
        })?;
        let cidr = spec.network.cidr.ok_or_else(|| CoreError::InsufficientNetworkCapacity {
            message: format!("network {network} has no address range"),
        })?;
        Ok((cidr, spec.network.gateway))
    }
}

impl Default for MemoryNetworkDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// Addresses in `cidr` that can be handed to a rule: not the network or
/// broadcast address, and not the gateway.
fn assignable(cidr: Ipv4Network, gateway: Option<Ipv4Addr>, ip: Ipv4Addr) -> bool {
    if !cidr.contains(ip) || Some(ip) == gateway {
        return false;
    }
    // /31 and /32 have no network/broadcast addresses to skip.
    cidr.prefix() >= 31 || (ip != cidr.network() && ip != cidr.broadcast())
}

impl NetworkDirectory for MemoryNetworkDirectory {
    fn resolve(&self, id: NetworkId) -> Option<Network> {
        self.networks.get(&id).map(|s| s.network.clone())
    }
}

impl CapabilityOracle for MemoryNetworkDirectory {
    fn supports_service(&self, id: NetworkId, service: Service) -> bool {
        self.networks
            .get(&id)
            .is_some_and(|s| s.services.contains(&service))
    }

    fn capabilities(&self, id: NetworkId, service: Service) -> Capabilities {
        if !self.supports_service(id, service) {
            return Capabilities::new();
        }
        self.networks
            .get(&id)
            .map(|s| s.capabilities.clone())
            .unwrap_or_default()
    }
}

impl AddressPool for MemoryNetworkDirectory {
    fn allocate(&self, network: NetworkId) -> Result<Ipv4Addr, CoreError> {
        let (cidr, gateway) = self.range(network)?;
        let mut taken = self.in_use.entry(network).or_default();
        let ip = cidr
            .iter()
            .find(|ip| assignable(cidr, gateway, *ip) && !taken.contains(ip))
            .ok_or_else(|| CoreError::InsufficientAddressCapacity {
                network_id: network,
                message: format!("no free addresses left in {cidr}"),
            })?;
        taken.insert(ip);
        Ok(ip)
    }

    fn reserve(&self, network: NetworkId, ip: Ipv4Addr) -> Result<(), CoreError> {
        let (cidr, gateway) = self.range(network)?;
        if !assignable(cidr, gateway, ip) {
            return Err(CoreError::InsufficientAddressCapacity {
                network_id: network,
                message: format!("{ip} is not an assignable address in {cidr}"),
            });
        }
        let mut taken = self.in_use.entry(network).or_default();
        if !taken.insert(ip) {
            return Err(CoreError::InsufficientAddressCapacity {
                network_id: network,
                message: format!("requested IP address {ip} is already in use"),
            });
        }
        Ok(())
    }

    fn release(&self, network: NetworkId, ip: Ipv4Addr) -> Result<(), CoreError> {
        if let Some(mut taken) = self.in_use.get_mut(&network) {
            taken.remove(&ip);
        }
        Ok(())
    }
}
