// ── In-memory collaborators ──
//
// Reference implementations of every port, used by tests and by the CLI.
// `MemoryCluster` wires them together the way a deployment would.

mod accounts;
mod engine;
mod firewall;
mod networks;
mod rules;
mod usage;

use std::collections::BTreeSet;
use std::sync::Arc;

pub use accounts::MemoryAccountDirectory;
pub use engine::MemoryRuleEngine;
pub use firewall::MemoryFirewall;
pub use networks::{MemoryNetworkDirectory, NetworkSpec};
pub use rules::MemoryRuleRepository;
pub use usage::{UsageEvent, UsageKind, UsageLedger};

use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::manager::{Collaborators, RuleManager};
use crate::model::{AccountId, ApplicationLoadBalancerRule};
use crate::ports::AddressPool;

/// One in-memory cluster: networks, accounts, rules, firewall, usage
/// ledger and rule engine sharing state.
#[derive(Clone)]
pub struct MemoryCluster {
    pub networks: Arc<MemoryNetworkDirectory>,
    pub accounts: Arc<MemoryAccountDirectory>,
    pub rules: Arc<MemoryRuleRepository>,
    pub firewall: Arc<MemoryFirewall>,
    pub usage: Arc<UsageLedger>,
    pub engine: Arc<MemoryRuleEngine>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        let rules = Arc::new(MemoryRuleRepository::new());
        let firewall = Arc::new(MemoryFirewall::new());
        let engine = Arc::new(MemoryRuleEngine::new(
            Arc::clone(&rules),
            Arc::clone(&firewall),
        ));

        Self {
            networks: Arc::new(MemoryNetworkDirectory::new()),
            accounts: Arc::new(MemoryAccountDirectory::new()),
            rules,
            firewall,
            usage: Arc::new(UsageLedger::new()),
            engine,
        }
    }

    pub fn add_network(&self, spec: NetworkSpec) {
        self.networks.insert(spec);
    }

    pub fn add_account(&self, id: AccountId, name: impl Into<String>) {
        self.accounts.insert(id, name);
    }

    /// Reload rules persisted by an earlier run: records, firewall state,
    /// and the source IPs they hold. Networks must already be present.
    pub fn restore(&self, rules: Vec<ApplicationLoadBalancerRule>) -> Result<(), CoreError> {
        let mut held = BTreeSet::new();
        for rule in rules.iter().filter(|r| r.state.is_live()) {
            if held.insert((rule.source_ip_network_id, rule.source_ip)) {
                self.networks.reserve(rule.source_ip_network_id, rule.source_ip)?;
            }
            self.firewall.track(rule.id, rule.state);
        }
        self.rules.restore(rules)
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            networks: self.networks.clone(),
            capabilities: self.networks.clone(),
            addresses: self.networks.clone(),
            accounts: self.accounts.clone(),
            rules: self.rules.clone(),
            firewall: self.firewall.clone(),
            usage: self.usage.clone(),
            engine: self.engine.clone(),
        }
    }

    pub fn manager(&self, config: ManagerConfig) -> RuleManager {
        RuleManager::new(config, self.collaborators())
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}
