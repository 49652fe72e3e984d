// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed Entities for the Server / IP Hierarchy
//!
//! Fixed-field records replacing the dynamic rows behind the record store.
//! Identifiers are store-assigned numeric ids wrapped in newtypes so a
//! server id can never be passed where an IP id is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::IpValue;

/// Store-assigned server identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ServerId(pub u64);

/// Store-assigned IP address identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IpId(pub u64);

/// Store-assigned user identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for IpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical or logical server
///
/// The attached IP set is a store-side relation
/// (`RecordStore::ips_for_server`), not an inline field; [`ServerExport`]
/// carries both together.
///
/// Invariant: every existing server has at least one attached IP, exactly
/// one of which is the default. The invariant is established by
/// [`crate::lifecycle::ServerLifecycle::create_server`] and maintained by
/// [`crate::registry::IpRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: ServerId,
    /// Non-empty display name
    pub name: String,
    /// Free-form description, may be empty
    pub description: String,
    /// Owning user, if any
    pub owner: Option<UserId>,
    /// When the row was stored
    pub created: DateTime<Utc>,
}

/// Draft for a server row; the store assigns id and creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServer {
    pub name: String,
    pub description: String,
    pub owner: Option<UserId>,
}

/// An IP address attached to a server
///
/// An IP belongs to the server it was created for until it is detached and
/// destroyed; reassignment to another server is not supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: IpId,
    /// Globally unique address literal
    pub value: IpValue,
    /// True for exactly one IP per owning server
    pub is_default: bool,
    /// Owning server
    pub server_id: ServerId,
    /// When the row was stored
    pub created: DateTime<Utc>,
}

/// Draft for an IP row; the store assigns id and creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIpAddress {
    pub value: IpValue,
    pub is_default: bool,
    pub server_id: ServerId,
}

/// A user referenced as server owner
///
/// Only the fields owner resolution needs; account management lives
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
}

/// Draft for a user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub login: String,
}

/// Exported state of a server together with its attached IPs
///
/// This is the shape returned to callers and handed to extension hooks as a
/// flattened JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerExport {
    #[serde(flatten)]
    pub server: Server,
    pub ips: Vec<IpAddress>,
}

impl ServerExport {
    /// The server's default IP, if the invariant currently holds
    pub fn default_ip(&self) -> Option<&IpAddress> {
        self.ips.iter().find(|ip| ip.is_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_server() -> Server {
        Server {
            id: ServerId(1),
            name: "web01".to_string(),
            description: String::new(),
            owner: Some(UserId(9)),
            created: Utc::now(),
        }
    }

    #[test]
    fn test_export_flattens_server_fields() {
        let export = ServerExport {
            server: sample_server(),
            ips: vec![],
        };
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["name"], "web01");
        assert_eq!(json["id"], 1);
        assert!(json["ips"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_default_ip_lookup() {
        let server = sample_server();
        let server_id = server.id;
        let mk = |id: u64, value: &str, is_default: bool| IpAddress {
            id: IpId(id),
            value: value.parse().unwrap(),
            is_default,
            server_id,
            created: Utc::now(),
        };
        let export = ServerExport {
            server,
            ips: vec![mk(1, "192.0.2.1", false), mk(2, "192.0.2.2", true)],
        };
        assert_eq!(export.default_ip().unwrap().id, IpId(2));
    }
}
