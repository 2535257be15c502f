// ── Typed request structs for Command payloads ──

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::model::{AccountId, ApplicationLoadBalancerRule, NetworkId, Scheme};

// ── Create ─────────────────────────────────────────────────────────

/// A request to create an internal load balancer rule.
///
/// Ports and the algorithm are kept in their raw request form; the
/// validator turns them into typed values or rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    pub name: String,
    pub description: String,
    pub scheme: Scheme,
    pub source_ip_network_id: NetworkId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<Ipv4Addr>,
    pub source_port: i32,
    pub instance_port: i32,
    pub algorithm: String,
    pub guest_network_id: NetworkId,
    pub account_id: AccountId,
}

// ── List ───────────────────────────────────────────────────────────

/// Narrows a rule listing. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip_network_id: Option<NetworkId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<Ipv4Addr>,
}

impl RuleFilter {
    pub fn matches(&self, rule: &ApplicationLoadBalancerRule) -> bool {
        self.account_id.is_none_or(|id| rule.account_id == id)
            && self
                .source_ip_network_id
                .is_none_or(|id| rule.source_ip_network_id == id)
            && self.source_ip.is_none_or(|ip| rule.source_ip == ip)
    }
}
