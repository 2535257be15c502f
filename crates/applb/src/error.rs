//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use std::net::Ipv4Addr;

use miette::Diagnostic;
use thiserror::Error;

use applb_config::ConfigError;
use applb_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CAPACITY: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Request ──────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(applb::invalid_parameter))]
    InvalidParameter { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(applb::not_found),
        help("Run: applb list to see existing rules")
    )]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(applb::unsupported_service),
        help("Only Internal rules on networks offering the Lb service can be created.")
    )]
    Unsupported { message: String },

    // ── Provisioning ─────────────────────────────────────────────────

    #[error("Rule conflict on {source_ip}:{source_port} in network {network_id}")]
    #[diagnostic(
        code(applb::conflict),
        help("Another rule already listens there. Choose a different source port or IP.")
    )]
    Conflict {
        network_id: u64,
        source_ip: Ipv4Addr,
        source_port: u16,
    },

    #[error("{message}")]
    #[diagnostic(
        code(applb::capacity),
        help("Free an address (delete a rule) or widen the network's CIDR, then retry.")
    )]
    Capacity { message: String },

    #[error("{message}")]
    #[diagnostic(code(applb::operation_failed))]
    OperationFailed { message: String },

    #[error("Rule {id} could not be removed")]
    #[diagnostic(
        code(applb::delete_refused),
        help("The firewall refused the revocation. The rule stays in Revoke; retry the delete.")
    )]
    DeleteRefused { id: u64 },

    // ── Configuration / state ────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(applb::config),
        help("Check the config file, or pass one with --config.")
    )]
    Config(#[from] ConfigError),

    #[error("Invalid state file {path}: {reason}")]
    #[diagnostic(
        code(applb::state),
        help("Fix or remove the state file; it is rewritten after every change.")
    )]
    State { path: String, reason: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(applb::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(applb::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidParameter { .. } | Self::Unsupported { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Capacity { .. } => exit_code::CAPACITY,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidParameter { message } if message.starts_with("Unable to find") => {
                CliError::NotFound { message }
            }
            CoreError::InvalidParameter { message } => CliError::InvalidParameter { message },
            CoreError::UnsupportedService { message } => CliError::Unsupported { message },
            CoreError::RuleConflict {
                network_id,
                source_ip,
                source_port,
            } => CliError::Conflict {
                network_id: network_id.get(),
                source_ip,
                source_port,
            },
            err @ (CoreError::InsufficientAddressCapacity { .. }
            | CoreError::InsufficientNetworkCapacity { .. }) => CliError::Capacity {
                message: err.to_string(),
            },
            CoreError::OperationFailed { message } => CliError::OperationFailed { message },
            CoreError::Config { message } => CliError::Config(ConfigError::Validation {
                field: "config".into(),
                reason: message,
            }),
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use applb_core::NetworkId;

    #[test]
    fn unknown_ids_exit_as_not_found() {
        let err = CliError::from(CoreError::invalid_parameter(
            "Unable to find load balancer rule by id 9",
        ));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "Unable to find load balancer rule by id 9");
    }

    #[test]
    fn request_errors_exit_as_usage() {
        let err = CliError::from(CoreError::invalid_parameter("Invalid algorithm: x"));
        assert_eq!(err.exit_code(), exit_code::USAGE);
        let err = CliError::from(CoreError::unsupported_service(
            "Only scheme of type Internal is supported",
        ));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn provisioning_errors_have_distinct_codes() {
        let conflict = CliError::from(CoreError::RuleConflict {
            network_id: NetworkId::new(1),
            source_ip: Ipv4Addr::new(10, 1, 1, 1),
            source_port: 22,
        });
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);

        let capacity = CliError::from(CoreError::InsufficientNetworkCapacity {
            message: "no range".into(),
        });
        assert_eq!(capacity.exit_code(), exit_code::CAPACITY);

        let failed = CliError::from(CoreError::operation_failed("boom"));
        assert_eq!(failed.exit_code(), exit_code::GENERAL);
    }
}
