//! Create-side effects for a validated rule.
//!
//! The provisioner settles the source IP, persists the record, stages the
//! firewall rule and records a usage event. Every step before the usage
//! event is rolled back if a later one fails; the usage event itself is
//! best-effort.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::locks::SourceIpLocks;
use crate::model::{ApplicationLoadBalancerRule, CallContext, NetworkId, RuleId, RuleState};
use crate::ports::{AddressPool, FirewallRules, RuleRepository, UsageEvents};
use crate::validate::ValidatedRequest;

pub struct Provisioner {
    rules: Arc<dyn RuleRepository>,
    addresses: Arc<dyn AddressPool>,
    firewall: Arc<dyn FirewallRules>,
    usage: Option<Arc<dyn UsageEvents>>,
    locks: Arc<SourceIpLocks>,
}

/// How the source IP was obtained, which decides whether a rollback
/// hands it back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lease {
    /// Taken from the pool by this call.
    Reserved,
    /// Already held on behalf of another rule on the same IP.
    Shared,
}

impl Provisioner {
    pub(crate) fn new(
        rules: Arc<dyn RuleRepository>,
        addresses: Arc<dyn AddressPool>,
        firewall: Arc<dyn FirewallRules>,
        usage: Option<Arc<dyn UsageEvents>>,
        locks: Arc<SourceIpLocks>,
    ) -> Self {
        Self {
            rules,
            addresses,
            firewall,
            usage,
            locks,
        }
    }

    /// Turn a validated request into a persisted rule in state `Add`.
    pub fn provision(
        &self,
        request: &ValidatedRequest,
        context: &CallContext,
    ) -> Result<ApplicationLoadBalancerRule, CoreError> {
        let network = request.source_ip_network_id;

        let (source_ip, allocated) = match request.source_ip {
            Some(ip) => (ip, false),
            None => {
                let ip = self.addresses.allocate(network)?;
                debug!(network_id = %network, source_ip = %ip, "allocated source ip");
                (ip, true)
            }
        };

        let _guard = self.locks.lock(network, source_ip);

        let lease = if allocated {
            Lease::Reserved
        } else if self.rules.count_by_source_ip(source_ip, network) == 0 {
            self.addresses.reserve(network, source_ip)?;
            debug!(
                network_id = %network,
                source_ip = %source_ip,
                "reserved requested source ip"
            );
            Lease::Reserved
        } else {
            debug!(
                network_id = %network,
                source_ip = %source_ip,
                "source ip already serves other rules"
            );
            Lease::Shared
        };

        let rule = match self.rules.persist(request.bind(source_ip)) {
            Ok(rule) => rule,
            Err(err) => {
                self.release_if_unused(lease, network, source_ip);
                return Err(err);
            }
        };
        debug!(rule_id = %rule.id, "persisted rule");

        if !self.firewall.stage_add(&rule) {
            self.rollback(rule.id, lease, network, source_ip);
            return Err(CoreError::operation_failed(format!(
                "Unable to add lb rule for ip address {source_ip}"
            )));
        }

        let Some(rule) = self
            .rules
            .transition(rule.id, RuleState::Staged, RuleState::Add)
        else {
            self.firewall.unstage(rule.id);
            self.rollback(rule.id, lease, network, source_ip);
            return Err(CoreError::Internal(format!(
                "rule {} changed state while being provisioned",
                rule.id
            )));
        };

        if let Some(usage) = &self.usage {
            if let Err(e) = usage.record_create(&rule, context) {
                warn!(
                    rule_id = %rule.id,
                    error = %e,
                    "failed to record usage event (non-fatal)"
                );
            }
        }

        info!(
            rule_id = %rule.id,
            network_id = %network,
            source_ip = %source_ip,
            source_port = rule.source_port,
            "created load balancer rule"
        );
        Ok(rule)
    }

    // ── Rollback ─────────────────────────────────────────────────

    fn rollback(&self, id: RuleId, lease: Lease, network: NetworkId, ip: Ipv4Addr) {
        if self.rules.remove(id).is_none() {
            error!(rule_id = %id, "rollback could not find rule to remove");
        }
        self.release_if_unused(lease, network, ip);
    }

    fn release_if_unused(&self, lease: Lease, network: NetworkId, ip: Ipv4Addr) {
        if lease == Lease::Shared || self.rules.count_by_source_ip(ip, network) > 0 {
            return;
        }
        if let Err(e) = self.addresses.release(network, ip) {
            error!(
                network_id = %network,
                source_ip = %ip,
                error = %e,
                "rollback failed to release source ip"
            );
        }
    }
}
