// ── Core error types ──
//
// Every failure the rule manager can surface. Reason strings for
// invalid-parameter and unsupported-service conditions are displayed
// verbatim: callers match on them, so they never get a prefix.

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::model::NetworkId;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Caller errors ────────────────────────────────────────────────
    /// Caller-supplied data violates a static constraint, or names an
    /// entity that does not exist.
    #[error("{message}")]
    InvalidParameter { message: String },

    /// The target network lacks the load-balancing service, or the
    /// request asks for a scheme that cannot be provisioned.
    #[error("{message}")]
    UnsupportedService { message: String },

    // ── Capacity ─────────────────────────────────────────────────────
    #[error("Insufficient address capacity in network {network_id}: {message}")]
    InsufficientAddressCapacity {
        network_id: NetworkId,
        message: String,
    },

    #[error("Insufficient virtual network capacity: {message}")]
    InsufficientNetworkCapacity { message: String },

    // ── Conflicts ────────────────────────────────────────────────────
    #[error("Load balancer rule conflict on {source_ip}:{source_port} in network {network_id}")]
    RuleConflict {
        network_id: NetworkId,
        source_ip: Ipv4Addr,
        source_port: u16,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("{message}")]
    OperationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn unsupported_service(message: impl Into<String>) -> Self {
        Self::UnsupportedService {
            message: message.into(),
        }
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    /// Whether retrying the same call can succeed once cluster state changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientAddressCapacity { .. } | Self::InsufficientNetworkCapacity { .. }
        )
    }
}
