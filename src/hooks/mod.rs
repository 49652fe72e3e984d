// Copyright (c) 2025 - Cowboy AI, Inc.
//! Extension Point Dispatch
//!
//! Named lifecycle events fired at defined points inside the server/IP
//! operations. External code observes or vetoes an in-progress mutation by
//! returning an error from its hook; the operation wraps the error as
//! [`ApiError::Hook`](crate::errors::ApiError::Hook) and aborts, rolling
//! back already-applied sub-steps where the operation defines a rollback.
//!
//! The hook points are a closed set; this module is the whole extension
//! contract, there is no open-ended callback registration beyond it.
//!
//! # Dispatch Contract
//!
//! - Payload is the exported (flattened) JSON state of the affected entity.
//! - `Ok(())` lets the operation continue.
//! - `Err(_)` vetoes; the operation fails with the hook's error preserved.
//! - A hook may call back into the lookup operations; no lock is held
//!   across a dispatch call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::debug;

pub mod nats;

pub use nats::NatsHookPublisher;

/// The defined lifecycle event points
///
/// Wire names match the event names the surrounding system dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPoint {
    /// Server row stored, before its first IP is attached
    AddServerAfterStore,
    /// Server creation complete, about to return
    AddServerBeforeReturn,
    /// IP row stored, before the former default is demoted
    AddServerIpAfterStore,
    /// IP attach complete, about to return
    AddServerIpBeforeReturn,
    /// IP modification complete, about to return
    ModifyServerIpBeforeReturn,
    /// Server loaded and about to be deleted; the designed veto point for
    /// subsystems that still need the server
    DeleteServerBeforeDelete,
}

impl HookPoint {
    /// All hook points, in lifecycle order
    pub const ALL: [HookPoint; 6] = [
        HookPoint::AddServerAfterStore,
        HookPoint::AddServerBeforeReturn,
        HookPoint::AddServerIpAfterStore,
        HookPoint::AddServerIpBeforeReturn,
        HookPoint::ModifyServerIpBeforeReturn,
        HookPoint::DeleteServerBeforeDelete,
    ];

    /// Event name as dispatched to external code
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::AddServerAfterStore => "addServer_afterStore",
            HookPoint::AddServerBeforeReturn => "addServer_beforeReturn",
            HookPoint::AddServerIpAfterStore => "addServerIP_afterStore",
            HookPoint::AddServerIpBeforeReturn => "addServerIP_beforeReturn",
            HookPoint::ModifyServerIpBeforeReturn => "modifyServerIP_beforeReturn",
            HookPoint::DeleteServerBeforeDelete => "deleteServer_beforeDelete",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope published to external transports for a fired hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookEnvelope {
    /// Event name (`addServer_afterStore`, ...)
    pub hook: String,
    /// When the event was dispatched
    pub occurred_at: DateTime<Utc>,
    /// Exported entity state
    pub payload: serde_json::Value,
}

/// Dispatcher for lifecycle events
///
/// Implementations decide what "external code" means: in-process
/// callbacks, message fan-out, or nothing at all.
#[async_trait]
pub trait HookDispatcher: Send + Sync {
    /// Fire a hook point with the affected entity's exported state
    ///
    /// An `Err` vetoes the in-progress operation.
    async fn dispatch(&self, point: HookPoint, payload: &serde_json::Value)
        -> anyhow::Result<()>;
}

/// Dispatcher that fires nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

#[async_trait]
impl HookDispatcher for NoopHooks {
    async fn dispatch(
        &self,
        _point: HookPoint,
        _payload: &serde_json::Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hook callback signature
pub type HookFn = Box<dyn Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync>;

/// In-process dispatcher running an ordered callback list per hook point
///
/// Callbacks run in registration order; the first error aborts the
/// remaining callbacks and vetoes the operation.
#[derive(Default)]
pub struct HookRegistry {
    handlers: RwLock<HashMap<HookPoint, Vec<HookFn>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a hook point
    pub fn on<F>(&self, point: HookPoint, handler: F)
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .expect("hook registry lock poisoned")
            .entry(point)
            .or_default()
            .push(Box::new(handler));
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(HookPoint, usize)> = match self.handlers.read() {
            Ok(handlers) => handlers.iter().map(|(k, v)| (*k, v.len())).collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("HookRegistry").field("handlers", &counts).finish()
    }
}

#[async_trait]
impl HookDispatcher for HookRegistry {
    async fn dispatch(
        &self,
        point: HookPoint,
        payload: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| anyhow::anyhow!("hook registry lock poisoned"))?;
        let Some(callbacks) = handlers.get(&point) else {
            return Ok(());
        };
        debug!(hook = %point, count = callbacks.len(), "dispatching hook");
        for callback in callbacks {
            callback(payload)?;
        }
        Ok(())
    }
}
