// ── Domain model ──
//
// Canonical types shared by the validator, provisioner, repository and
// every collaborator interface.

pub mod context;
pub mod ids;
pub mod network;
pub mod rule;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use applb_core::model::*` gives you everything.

pub use context::CallContext;
pub use ids::{AccountId, NetworkId, RuleId};
pub use network::{Capabilities, Capability, Network, Service, TrafficType};
pub use rule::{Algorithm, ApplicationLoadBalancerRule, NewRule, RuleState, Scheme};
