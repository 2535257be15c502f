// ── Rule lifecycle manager ──
//
// Public surface of the crate: get, create, delete and list. Composes the
// validator and provisioner for create and hands removal to the rule
// engine for delete. Holds no mutable state of its own beyond the
// per-source-IP lock table.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::command::{CreateRuleRequest, RuleFilter};
use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::locks::SourceIpLocks;
use crate::model::{
    ApplicationLoadBalancerRule, CallContext, Capabilities, NetworkId, RuleId, Service,
};
use crate::ports::{
    AccountDirectory, AddressPool, CapabilityOracle, FirewallRules, LbRuleEngine,
    NetworkDirectory, RuleRepository, UsageEvents,
};
use crate::provision::Provisioner;
use crate::validate::{GuestCapabilities, validate};

/// Every collaborator the manager needs, wired by hand.
#[derive(Clone)]
pub struct Collaborators {
    pub networks: Arc<dyn NetworkDirectory>,
    pub capabilities: Arc<dyn CapabilityOracle>,
    pub addresses: Arc<dyn AddressPool>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub rules: Arc<dyn RuleRepository>,
    pub firewall: Arc<dyn FirewallRules>,
    pub usage: Arc<dyn UsageEvents>,
    pub engine: Arc<dyn LbRuleEngine>,
}

pub struct RuleManager {
    config: ManagerConfig,
    networks: Arc<dyn NetworkDirectory>,
    capabilities: Arc<dyn CapabilityOracle>,
    addresses: Arc<dyn AddressPool>,
    accounts: Arc<dyn AccountDirectory>,
    rules: Arc<dyn RuleRepository>,
    usage: Option<Arc<dyn UsageEvents>>,
    engine: Arc<dyn LbRuleEngine>,
    provisioner: Provisioner,
    locks: Arc<SourceIpLocks>,
}

impl RuleManager {
    pub fn new(config: ManagerConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            networks,
            capabilities,
            addresses,
            accounts,
            rules,
            firewall,
            usage,
            engine,
        } = collaborators;

        let usage = config.usage_events.then_some(usage);
        let locks = Arc::new(SourceIpLocks::new());
        let provisioner = Provisioner::new(
            Arc::clone(&rules),
            Arc::clone(&addresses),
            firewall,
            usage.clone(),
            Arc::clone(&locks),
        );

        Self {
            config,
            networks,
            capabilities,
            addresses,
            accounts,
            rules,
            usage,
            engine,
            provisioner,
            locks,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Look up a rule. A missing rule is the caller's mistake, reported as
    /// an invalid parameter.
    pub fn get(&self, id: RuleId) -> Result<ApplicationLoadBalancerRule, CoreError> {
        self.rules.find_by_id(id).ok_or_else(|| rule_not_found(id))
    }

    pub fn list(&self, filter: &RuleFilter) -> Vec<ApplicationLoadBalancerRule> {
        self.rules.list(filter)
    }

    // ── Create ───────────────────────────────────────────────────

    /// Validate and provision a new rule. Any rejection or provisioning
    /// failure is returned as-is.
    pub fn create(
        &self,
        request: &CreateRuleRequest,
        context: &CallContext,
    ) -> Result<ApplicationLoadBalancerRule, CoreError> {
        debug!(
            name = %request.name,
            network_id = %request.source_ip_network_id,
            source_port = request.source_port,
            "creating load balancer rule"
        );

        let source_network = self
            .networks
            .resolve(request.source_ip_network_id)
            .ok_or_else(|| network_not_found(request.source_ip_network_id))?;
        let guest = self.guest_capabilities(request.guest_network_id)?;

        let validated = validate(request, &source_network, &guest)?;

        if !self.accounts.exists(request.account_id) {
            return Err(CoreError::invalid_parameter(format!(
                "Unable to find account by id {}",
                request.account_id
            )));
        }

        self.provisioner.provision(&validated, context)
    }

    fn guest_capabilities(&self, id: NetworkId) -> Result<GuestCapabilities, CoreError> {
        if self.networks.resolve(id).is_none() {
            return Err(network_not_found(id));
        }
        let lb_supported = self.capabilities.supports_service(id, Service::Lb);
        let capabilities = if lb_supported {
            self.capabilities.capabilities(id, Service::Lb)
        } else {
            Capabilities::new()
        };
        Ok(GuestCapabilities {
            network_id: id,
            lb_supported,
            capabilities,
        })
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Remove a rule through the rule engine.
    ///
    /// Unknown ids fail like [`get`](Self::get). `Ok(false)` means the rule
    /// exists but the engine could not remove it.
    pub fn delete(&self, id: RuleId, context: &CallContext) -> Result<bool, CoreError> {
        let rule = self.get(id)?;
        let network = rule.source_ip_network_id;
        let ip = rule.source_ip;

        let _guard = self.locks.lock(network, ip);

        if !self
            .engine
            .remove_rule(id, self.config.force_detach_on_delete)
        {
            if self.rules.find_by_id(id).is_none() {
                return Err(rule_not_found(id));
            }
            warn!(rule_id = %id, "rule engine could not remove rule");
            return Ok(false);
        }

        if self.rules.count_by_source_ip(ip, network) == 0 {
            match self.addresses.release(network, ip) {
                Ok(()) => debug!(network_id = %network, source_ip = %ip, "released source ip"),
                Err(e) => {
                    error!(
                        network_id = %network,
                        source_ip = %ip,
                        error = %e,
                        "failed to release source ip"
                    );
                }
            }
        }

        if let Some(usage) = &self.usage {
            if let Err(e) = usage.record_delete(&rule, context) {
                warn!(rule_id = %id, error = %e, "failed to record usage event (non-fatal)");
            }
        }

        info!(rule_id = %id, "deleted load balancer rule");
        Ok(true)
    }
}

fn rule_not_found(id: RuleId) -> CoreError {
    CoreError::invalid_parameter(format!("Unable to find load balancer rule by id {id}"))
}

fn network_not_found(id: NetworkId) -> CoreError {
    CoreError::invalid_parameter(format!("Unable to find network by id {id}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{AccountId, RuleState, Scheme};
    use crate::store::{MemoryCluster, NetworkSpec, UsageKind};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn cluster() -> MemoryCluster {
        let cluster = MemoryCluster::new();
        cluster.add_network(NetworkSpec::guest(1, "guest", "10.1.1.1/24").unwrap());
        cluster.add_network(NetworkSpec::public(3, "public"));
        cluster.add_account(AccountId::new(1), "admin");
        cluster
    }

    fn request() -> CreateRuleRequest {
        CreateRuleRequest {
            name: "alena".into(),
            description: "alena".into(),
            scheme: Scheme::Internal,
            source_ip_network_id: NetworkId::new(1),
            source_ip: Some(Ipv4Addr::new(10, 1, 1, 1)),
            source_port: 22,
            instance_port: 22,
            algorithm: "roundrobin".into(),
            guest_network_id: NetworkId::new(1),
            account_id: AccountId::new(1),
        }
    }

    #[test]
    fn unknown_source_network_is_invalid() {
        let manager = cluster().manager(ManagerConfig::default());
        let mut req = request();
        req.source_ip_network_id = NetworkId::new(2);
        assert_eq!(
            manager.create(&req, &CallContext::system()).unwrap_err(),
            CoreError::invalid_parameter("Unable to find network by id 2")
        );
    }

    #[test]
    fn unknown_account_is_invalid() {
        let manager = cluster().manager(ManagerConfig::default());
        let mut req = request();
        req.account_id = AccountId::new(2);
        assert_eq!(
            manager.create(&req, &CallContext::system()).unwrap_err(),
            CoreError::invalid_parameter("Unable to find account by id 2")
        );
    }

    #[test]
    fn guest_network_without_lb_is_unsupported() {
        let cluster = cluster();
        let mut spec = NetworkSpec::guest(4, "no-lb", "10.4.0.0/24").unwrap();
        spec.services.remove(&Service::Lb);
        cluster.add_network(spec);
        let manager = cluster.manager(ManagerConfig::default());

        let mut req = request();
        req.guest_network_id = NetworkId::new(4);
        assert_eq!(
            manager.create(&req, &CallContext::system()).unwrap_err(),
            CoreError::unsupported_service(
                "Load balancing service is not supported in network id=4"
            )
        );
    }

    #[test]
    fn usage_events_can_be_disabled() {
        let cluster = cluster();
        let manager = cluster.manager(ManagerConfig {
            usage_events: false,
            ..ManagerConfig::default()
        });

        let rule = manager.create(&request(), &CallContext::system()).unwrap();
        manager.delete(rule.id, &CallContext::system()).unwrap();

        assert!(cluster.usage.events().is_empty());
    }

    #[test]
    fn delete_records_usage_for_caller() {
        let cluster = cluster();
        let manager = cluster.manager(ManagerConfig::default());
        let caller = CallContext::new(7, AccountId::new(1));

        let rule = manager.create(&request(), &caller).unwrap();
        assert!(manager.delete(rule.id, &caller).unwrap());

        let kinds: Vec<UsageKind> = cluster.usage.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![UsageKind::LoadBalancerCreate, UsageKind::LoadBalancerDelete]);
        assert!(cluster.usage.events().iter().all(|e| e.caller_user_id == 7));
    }

    #[test]
    fn delete_releases_ip_only_when_last_rule_goes() {
        let cluster = cluster();
        let manager = cluster.manager(ManagerConfig::default());
        let ip = Ipv4Addr::new(10, 1, 1, 1);

        let first = manager.create(&request(), &CallContext::system()).unwrap();
        let mut req = request();
        req.source_port = 80;
        let second = manager.create(&req, &CallContext::system()).unwrap();

        manager.delete(first.id, &CallContext::system()).unwrap();
        assert!(cluster.networks.is_in_use(NetworkId::new(1), ip));

        manager.delete(second.id, &CallContext::system()).unwrap();
        assert!(!cluster.networks.is_in_use(NetworkId::new(1), ip));
    }

    #[test]
    fn refused_revocation_without_force_keeps_rule() {
        let cluster = cluster();
        let manager = cluster.manager(ManagerConfig {
            force_detach_on_delete: false,
            ..ManagerConfig::default()
        });
        let rule = manager.create(&request(), &CallContext::system()).unwrap();

        cluster.firewall.set_accepting(false);
        assert!(!manager.delete(rule.id, &CallContext::system()).unwrap());
        assert_eq!(manager.get(rule.id).unwrap().state, RuleState::Revoke);

        cluster.firewall.set_accepting(true);
        assert!(manager.delete(rule.id, &CallContext::system()).unwrap());
        assert!(manager.get(rule.id).is_err());
    }

    #[test]
    fn forced_detach_removes_despite_refusal() {
        let cluster = cluster();
        let manager = cluster.manager(ManagerConfig::default());
        let rule = manager.create(&request(), &CallContext::system()).unwrap();

        cluster.firewall.set_accepting(false);
        assert!(manager.delete(rule.id, &CallContext::system()).unwrap());
        assert!(cluster.firewall.state(rule.id).is_none());
    }
}
