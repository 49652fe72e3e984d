// Copyright (c) 2025 - Cowboy AI, Inc.
//! Permission and Ownership Boundary
//!
//! The operations in [`crate::registry`] and [`crate::lifecycle`] consult
//! an [`AccessPolicy`] exactly once, before any read or write; a refusal
//! surfaces as `Forbidden` and no partial state is ever written. How the
//! policy decides (permission tables, sharing sets, token claims) lives
//! behind this boundary and is not reimplemented here.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;
use tracing::debug;

use crate::domain::UserId;
use crate::errors::{ApiError, ApiResult};

/// The authenticated caller of an operation
///
/// Authentication happens at the transport boundary; by the time a caller
/// reaches these operations its identity is established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub login: String,
}

impl Caller {
    pub fn new(user_id: UserId, login: impl Into<String>) -> Self {
        Self {
            user_id,
            login: login.into(),
        }
    }
}

/// The exposed mutating operations, by permission name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AddServer,
    ModifyServer,
    DeleteServer,
    AddServerIp,
    ModifyServerIp,
    DeleteServerIp,
    SetServerDefaultIp,
}

impl Operation {
    /// All mutating operations
    pub const ALL: [Operation; 7] = [
        Operation::AddServer,
        Operation::ModifyServer,
        Operation::DeleteServer,
        Operation::AddServerIp,
        Operation::ModifyServerIp,
        Operation::DeleteServerIp,
        Operation::SetServerDefaultIp,
    ];

    /// Permission name as found in the permission table
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::AddServer => "Server.addServer",
            Operation::ModifyServer => "Server.modifyServer",
            Operation::DeleteServer => "Server.deleteServer",
            Operation::AddServerIp => "Server.addServerIP",
            Operation::ModifyServerIp => "Server.modifyServerIP",
            Operation::DeleteServerIp => "Server.deleteServerIP",
            Operation::SetServerDefaultIp => "Server.setServerDefaultIP",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether a caller may run an operation
pub trait AccessPolicy: Send + Sync {
    fn is_allowed(&self, caller: &Caller, operation: Operation) -> bool;
}

/// Fail with the standard refusal unless the policy permits the operation
///
/// Called once per exposed mutating operation, before any read or write,
/// so a refusal never leaves partial state behind.
pub(crate) fn ensure_allowed(
    policy: &dyn AccessPolicy,
    caller: &Caller,
    operation: Operation,
) -> ApiResult<()> {
    if policy.is_allowed(caller, operation) {
        Ok(())
    } else {
        debug!(caller = %caller.login, %operation, "permission denied");
        Err(ApiError::permission_denied())
    }
}

/// Policy that permits everything; for tests and trusted internal callers
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn is_allowed(&self, _caller: &Caller, _operation: Operation) -> bool {
        true
    }
}

/// Static per-user grant table
///
/// Seeded once at startup (see [`crate::bootstrap::grant_defaults`]) and
/// read-only afterwards from the operations' point of view.
#[derive(Debug, Default)]
pub struct StaticPolicy {
    grants: RwLock<HashMap<UserId, HashSet<Operation>>>,
}

impl StaticPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant one operation to a user
    pub fn grant(&self, user: UserId, operation: Operation) {
        self.grants
            .write()
            .expect("grant table lock poisoned")
            .entry(user)
            .or_default()
            .insert(operation);
    }

    /// Grant every operation to a user
    pub fn grant_all(&self, user: UserId) {
        for operation in Operation::ALL {
            self.grant(user, operation);
        }
    }
}

impl AccessPolicy for StaticPolicy {
    fn is_allowed(&self, caller: &Caller, operation: Operation) -> bool {
        self.grants
            .read()
            .map(|grants| {
                grants
                    .get(&caller.user_id)
                    .is_some_and(|ops| ops.contains(&operation))
            })
            .unwrap_or(false)
    }
}
