//! Pure admission checks for rule creation.
//!
//! [`validate`] runs every static check against data the manager has
//! already fetched. It never touches a collaborator, so it can be tested
//! exhaustively without fakes. The first failing check wins.

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::command::CreateRuleRequest;
use crate::error::CoreError;
use crate::model::{
    AccountId, Algorithm, Capabilities, Capability, Network, NetworkId, NewRule, Scheme,
    TrafficType,
};

/// Why a request was refused. Converts into [`CoreError`] with the
/// message untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{0}")]
    InvalidParameter(String),
    #[error("{0}")]
    UnsupportedService(String),
}

impl From<Rejection> for CoreError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidParameter(message) => CoreError::InvalidParameter { message },
            Rejection::UnsupportedService(message) => CoreError::UnsupportedService { message },
        }
    }
}

/// What the capability oracle said about the guest network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestCapabilities {
    pub network_id: NetworkId,
    pub lb_supported: bool,
    pub capabilities: Capabilities,
}

/// A request that passed every check, with its fields in typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub name: String,
    pub description: String,
    pub source_ip_network_id: NetworkId,
    pub guest_network_id: NetworkId,
    pub source_ip: Option<Ipv4Addr>,
    pub source_port: u16,
    pub instance_port: u16,
    pub algorithm: Algorithm,
    pub account_id: AccountId,
}

impl ValidatedRequest {
    /// Bind the request to the source IP the provisioner settled on.
    pub fn bind(&self, source_ip: Ipv4Addr) -> NewRule {
        NewRule {
            name: self.name.clone(),
            description: self.description.clone(),
            source_ip_network_id: self.source_ip_network_id,
            guest_network_id: self.guest_network_id,
            source_ip,
            source_port: self.source_port,
            instance_port: self.instance_port,
            algorithm: self.algorithm,
            account_id: self.account_id,
            scheme: Scheme::Internal,
        }
    }
}

/// Check a create request against its resolved source network and the
/// guest network's capabilities.
pub fn validate(
    request: &CreateRuleRequest,
    source_network: &Network,
    guest: &GuestCapabilities,
) -> Result<ValidatedRequest, Rejection> {
    if request.scheme != Scheme::Internal {
        return Err(Rejection::UnsupportedService(format!(
            "Only scheme of type {} is supported",
            Scheme::Internal
        )));
    }

    let source_port = port(request.source_port, "source port")?;
    let instance_port = port(request.instance_port, "instance port")?;

    let algorithm: Algorithm = request.algorithm.parse().map_err(|_| {
        Rejection::InvalidParameter(format!("Invalid algorithm: {}", request.algorithm))
    })?;

    if source_network.traffic_type != TrafficType::Guest {
        return Err(Rejection::InvalidParameter(format!(
            "Only traffic type {} is supported",
            TrafficType::Guest
        )));
    }

    if !guest.lb_supported {
        return Err(Rejection::UnsupportedService(format!(
            "Load balancing service is not supported in network id={}",
            guest.network_id
        )));
    }
    if guest
        .capabilities
        .get(Capability::SupportedLbAlgorithms)
        .is_some()
        && !guest
            .capabilities
            .lists(Capability::SupportedLbAlgorithms, &algorithm.to_string())
    {
        return Err(Rejection::InvalidParameter(format!(
            "Algorithm {algorithm} is not supported by network id={}",
            guest.network_id
        )));
    }

    if let Some(ip) = request.source_ip {
        if !source_network.contains(ip) {
            return Err(Rejection::InvalidParameter(
                "The requested IP is not in the network's CIDR subnet.".into(),
            ));
        }
    }

    non_empty(&request.name, "name")?;
    non_empty(&request.description, "description")?;

    Ok(ValidatedRequest {
        name: request.name.clone(),
        description: request.description.clone(),
        source_ip_network_id: request.source_ip_network_id,
        guest_network_id: request.guest_network_id,
        source_ip: request.source_ip,
        source_port,
        instance_port,
        algorithm,
        account_id: request.account_id,
    })
}

fn port(value: i32, field: &str) -> Result<u16, Rejection> {
    u16::try_from(value)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| Rejection::InvalidParameter(format!("Invalid value for {field}: {value}")))
}

fn non_empty(value: &str, field: &str) -> Result<(), Rejection> {
    if value.trim().is_empty() {
        return Err(Rejection::InvalidParameter(format!(
            "Invalid value for {field}: must not be empty"
        )));
    }
    Ok(())
}
