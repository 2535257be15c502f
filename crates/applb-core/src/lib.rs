//! Control-plane core for internal application load balancer rules.
//!
//! A rule maps a source IP and port on a guest network to an instance port
//! on the network's VMs. This crate owns the whole rule lifecycle:
//!
//! - **[`validate`]**: Pure checks on a create request: scheme, port
//!   ranges, algorithm, network traffic type, load-balancing capability,
//!   CIDR membership. The first failing check wins.
//!
//! - **[`Provisioner`](provision::Provisioner)**: Settles the source IP
//!   (allocate, reserve or share), persists the record, stages the firewall
//!   rule and records usage, rolling back on failure.
//!
//! - **[`RuleManager`]**: `get` / `create` / `delete` / `list`. The only
//!   surface callers need. Collaborators are injected as trait objects
//!   ([`ports`]) so deployments and tests can supply their own.
//!
//! - **[`LbService`]**: Async facade that routes [`Command`]s onto the
//!   blocking pool.
//!
//! - **[`store`]**: In-memory implementations of every port, wired
//!   together by [`MemoryCluster`](store::MemoryCluster).

pub mod command;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod ports;
pub mod provision;
pub mod service;
pub mod store;
pub mod validate;

mod locks;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::requests::*;
pub use command::{Command, CommandResult};
pub use config::ManagerConfig;
pub use error::CoreError;
pub use manager::{Collaborators, RuleManager};
pub use service::LbService;

pub use model::{
    AccountId, Algorithm, ApplicationLoadBalancerRule, CallContext, Capabilities, Capability,
    Network, NetworkId, NewRule, RuleId, RuleState, Scheme, Service, TrafficType,
};
