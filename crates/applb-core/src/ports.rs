//! Collaborator interfaces consumed by the rule manager.
//!
//! Each trait is an outbound port: the manager calls it without knowing
//! what backs it. In-memory implementations live in [`crate::store`].
//! All calls are synchronous and may block on I/O.

use std::net::Ipv4Addr;

use crate::command::RuleFilter;
use crate::error::CoreError;
use crate::model::{
    AccountId, ApplicationLoadBalancerRule, CallContext, Capabilities, Network, NetworkId,
    NewRule, RuleId, RuleState, Service,
};

/// Resolves network identifiers.
pub trait NetworkDirectory: Send + Sync {
    /// `None` when the network does not exist.
    fn resolve(&self, id: NetworkId) -> Option<Network>;
}

/// Answers which services and capabilities a network offers.
pub trait CapabilityOracle: Send + Sync {
    fn supports_service(&self, id: NetworkId, service: Service) -> bool;

    fn capabilities(&self, id: NetworkId, service: Service) -> Capabilities;
}

/// A network's free-address pool. Every call is atomic with respect to
/// other callers on the same pool.
pub trait AddressPool: Send + Sync {
    /// Take any free address.
    fn allocate(&self, network: NetworkId) -> Result<Ipv4Addr, CoreError>;

    /// Take a specific address. Fails when it is already in use.
    fn reserve(&self, network: NetworkId, ip: Ipv4Addr) -> Result<(), CoreError>;

    /// Return an address to the pool. Releasing a free address is a no-op.
    fn release(&self, network: NetworkId, ip: Ipv4Addr) -> Result<(), CoreError>;
}

/// Tenant lookup.
pub trait AccountDirectory: Send + Sync {
    fn exists(&self, id: AccountId) -> bool;
}

/// Durable rule storage. Authority for the per-(network, IP, port)
/// uniqueness constraint.
pub trait RuleRepository: Send + Sync {
    fn find_by_id(&self, id: RuleId) -> Option<ApplicationLoadBalancerRule>;

    /// Insert a rule, assigning its identifier. Fails with
    /// [`CoreError::RuleConflict`] when a live rule already occupies the
    /// same source IP and port in the same network.
    fn persist(&self, rule: NewRule) -> Result<ApplicationLoadBalancerRule, CoreError>;

    /// Live rules using `ip` as their source IP in `network`.
    fn count_by_source_ip(&self, ip: Ipv4Addr, network: NetworkId) -> u64;

    /// Compare-and-set the state. Returns the updated rule, or `None` when
    /// the rule is gone or not currently in `expected`.
    fn transition(
        &self,
        id: RuleId,
        expected: RuleState,
        next: RuleState,
    ) -> Option<ApplicationLoadBalancerRule>;

    /// Delete the record. Returns the removed rule, if it existed.
    fn remove(&self, id: RuleId) -> Option<ApplicationLoadBalancerRule>;

    /// Matching rules ordered by id.
    fn list(&self, filter: &RuleFilter) -> Vec<ApplicationLoadBalancerRule>;
}

/// The firewall rule behind every load balancer rule.
pub trait FirewallRules: Send + Sync {
    /// Stage the firewall rule for addition. `false` when it was refused.
    fn stage_add(&self, rule: &ApplicationLoadBalancerRule) -> bool;

    /// Withdraw a staged rule that never went live. Unknown ids are ignored.
    fn unstage(&self, id: RuleId);
}

/// Usage/billing event sink. Best-effort: the caller logs failures and
/// moves on.
pub trait UsageEvents: Send + Sync {
    fn record_create(
        &self,
        rule: &ApplicationLoadBalancerRule,
        context: &CallContext,
    ) -> Result<(), CoreError>;

    fn record_delete(
        &self,
        rule: &ApplicationLoadBalancerRule,
        context: &CallContext,
    ) -> Result<(), CoreError>;
}

/// The general load-balancing rule engine that owns removal.
pub trait LbRuleEngine: Send + Sync {
    /// Revoke the rule and detach its firewall rule. `true` when removal
    /// was carried out.
    fn remove_rule(&self, id: RuleId, force_detach: bool) -> bool;
}
