// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Server/IP Business Rules
//!
//! Shared rule checks for the IP registry and the server lifecycle manager.
//! All functions are pure (no I/O, no mutation) and return a detailed
//! [`RuleViolation`]; the conversion into [`ApiError`] carries the exact
//! caller-facing message for each rule.
//!
//! The rules guarded here:
//!
//! 1. A server name must be non-empty.
//! 2. The current default IP cannot be demoted directly; demotion happens
//!    only as a side effect of promoting another IP.
//! 3. A server's only IP cannot be detached.
//! 4. The current default IP cannot be detached.
//! 5. An IP can only be acted on through the server it belongs to.

use crate::domain::{IpAddress, Server};
use crate::errors::ApiError;

/// Rule check result
pub type RuleResult = Result<(), RuleViolation>;

/// A violated business rule, with the context needed for the message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    /// Server name empty after trimming
    #[error("Server name must not be empty")]
    EmptyServerName,

    /// Attempt to un-default the current default IP directly
    #[error("cannot demote the default IP {value} of server #{server_id}")]
    DirectDemotion { value: String, server_id: u64 },

    /// Attempt to detach the server's only IP
    #[error("cannot detach the only IP {value} of server '{server_name}'")]
    DetachOnlyIp { value: String, server_name: String },

    /// Attempt to detach the server's default IP
    #[error("cannot detach the default IP {value} of server '{server_name}'")]
    DetachDefaultIp { value: String, server_name: String },

    /// IP does not belong to the named server
    #[error("IP {value} does not belong to server '{server_name}'")]
    NotAttached { value: String, server_name: String },
}

impl From<RuleViolation> for ApiError {
    fn from(violation: RuleViolation) -> Self {
        match violation {
            RuleViolation::EmptyServerName => {
                ApiError::Validation("Server name must not be empty".to_string())
            }
            RuleViolation::DirectDemotion { value, server_id } => ApiError::Forbidden(format!(
                "Cannot make the IP \"{value}\" non-default. Please set a new default IP \
                 for the server (#{server_id}) first"
            )),
            RuleViolation::DetachOnlyIp { value, server_name } => ApiError::Forbidden(format!(
                "Cannot remove the IP '{value}' from server '{server_name}' as it is the only one"
            )),
            RuleViolation::DetachDefaultIp { value, server_name } => {
                ApiError::Forbidden(format!(
                    "Cannot remove IP address '{value}' from server '{server_name}' \
                     as it is marked as 'default'"
                ))
            }
            RuleViolation::NotAttached { value, server_name } => ApiError::Conflict(format!(
                "IP address '{value}' does not belong to server '{server_name}'"
            )),
        }
    }
}

/// Validate and normalize a server display name
///
/// # Rules
/// - Must be non-empty after trimming
pub fn validate_server_name(name: &str) -> Result<String, RuleViolation> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RuleViolation::EmptyServerName);
    }
    Ok(trimmed.to_string())
}

/// Validate an explicit `is_default = false` request against an IP
///
/// # Rules
/// - The current default may never be demoted directly; a server must never
///   reach zero default IPs. Demotion happens only as a side effect of
///   promoting a different IP.
pub fn validate_demotion(ip: &IpAddress) -> RuleResult {
    if ip.is_default {
        return Err(RuleViolation::DirectDemotion {
            value: ip.value.to_string(),
            server_id: ip.server_id.0,
        });
    }
    Ok(())
}

/// Validate that an IP is attached to the given server
pub fn validate_attachment(ip: &IpAddress, server: &Server) -> RuleResult {
    if ip.server_id != server.id {
        return Err(RuleViolation::NotAttached {
            value: ip.value.to_string(),
            server_name: server.name.clone(),
        });
    }
    Ok(())
}

/// Validate that an attached IP may be detached from its server
///
/// # Rules
/// - Must not be the server's only IP (the IP set may never become empty)
/// - Must not be the current default (a new default must be set first)
///
/// `attached_count` is the number of IPs currently attached to the server,
/// including `ip` itself.
pub fn validate_detach(ip: &IpAddress, server: &Server, attached_count: usize) -> RuleResult {
    if attached_count <= 1 {
        return Err(RuleViolation::DetachOnlyIp {
            value: ip.value.to_string(),
            server_name: server.name.clone(),
        });
    }
    if ip.is_default {
        return Err(RuleViolation::DetachDefaultIp {
            value: ip.value.to_string(),
            server_name: server.name.clone(),
        });
    }
    Ok(())
}
