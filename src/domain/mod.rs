// Copyright (c) 2025 - Cowboy AI, Inc.
//! Server / IP Domain Model
//!
//! Typed entities and value objects for the two-level resource hierarchy,
//! plus the pure rule checks shared by the registry and lifecycle
//! operations.
//!
//! # Value Objects with Invariants
//!
//! - [`IpValue`] - validated IPv4/IPv6 host address, canonical form
//!
//! # Entities
//!
//! - [`Server`] - physical/logical server row
//! - [`IpAddress`] - an address attached to exactly one server
//! - [`User`] - owner reference, minimal
//! - [`ServerExport`] - server row plus attached IPs, the exported shape
//!
//! # Invariants
//!
//! Every existing server has at least one attached IP and exactly one with
//! `is_default = true`; IP values are globally unique. The checks live in
//! [`invariants`]; the operations in [`crate::registry`] and
//! [`crate::lifecycle`] maintain the invariants by step ordering.

pub mod entities;
pub mod invariants;
pub mod ip;

pub use entities::{
    IpAddress, IpId, NewIpAddress, NewServer, NewUser, Server, ServerExport, ServerId, User,
    UserId,
};
pub use invariants::{RuleResult, RuleViolation};
pub use ip::{IpValue, IpValueError};
