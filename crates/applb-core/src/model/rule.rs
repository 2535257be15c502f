// ── Load balancer rule domain types ──

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::ids::{AccountId, NetworkId, RuleId};

/// Balancing algorithm. The string form is the token used on requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Algorithm {
    #[strum(serialize = "roundrobin")]
    #[serde(rename = "roundrobin")]
    RoundRobin,
    #[strum(serialize = "leastconn")]
    #[serde(rename = "leastconn")]
    LeastConn,
    #[strum(serialize = "source")]
    #[serde(rename = "source")]
    Source,
}

/// Where the balanced traffic originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Scheme {
    /// Entirely within the cluster's private network.
    Internal,
    /// Internet-facing. Never provisionable by this manager.
    Public,
}

/// Lifecycle state, mirroring the firewall rule the load balancer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum RuleState {
    Staged,
    Add,
    Active,
    Revoke,
    Removed,
}

impl RuleState {
    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// `Staged -> Add -> Active -> Revoke -> Removed`; revocation may also
    /// start before the dataplane acknowledged the rule.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Staged, Self::Add)
                | (Self::Add, Self::Active)
                | (Self::Staged | Self::Add | Self::Active, Self::Revoke)
                | (Self::Revoke, Self::Removed)
        )
    }

    /// Still counts towards the per-(IP, port) uniqueness constraint.
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Removed)
    }
}

/// An internal application load balancer rule as persisted.
///
/// Every field except `state` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationLoadBalancerRule {
    pub id: RuleId,
    pub uuid: Uuid,
    pub name: String,
    pub description: String,

    // Network binding
    pub source_ip_network_id: NetworkId,
    pub guest_network_id: NetworkId,

    // Endpoint
    pub source_ip: Ipv4Addr,
    pub source_port: u16,
    pub instance_port: u16,

    pub algorithm: Algorithm,
    pub account_id: AccountId,
    pub scheme: Scheme,
    pub state: RuleState,
    pub created: DateTime<Utc>,
}

/// A fully validated rule that has not been persisted yet.
///
/// The repository turns this into an [`ApplicationLoadBalancerRule`] by
/// assigning the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRule {
    pub name: String,
    pub description: String,
    pub source_ip_network_id: NetworkId,
    pub guest_network_id: NetworkId,
    pub source_ip: Ipv4Addr,
    pub source_port: u16,
    pub instance_port: u16,
    pub algorithm: Algorithm,
    pub account_id: AccountId,
    pub scheme: Scheme,
}

impl NewRule {
    pub fn into_rule(self, id: RuleId) -> ApplicationLoadBalancerRule {
        ApplicationLoadBalancerRule {
            id,
            uuid: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            source_ip_network_id: self.source_ip_network_id,
            guest_network_id: self.guest_network_id,
            source_ip: self.source_ip,
            source_port: self.source_port,
            instance_port: self.instance_port,
            algorithm: self.algorithm,
            account_id: self.account_id,
            scheme: self.scheme,
            state: RuleState::Staged,
            created: Utc::now(),
        }
    }
}
