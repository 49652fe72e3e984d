// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS Hook Publisher
//!
//! Observational [`HookDispatcher`] that fans hook payloads out onto NATS
//! subjects so other subsystems can react to server/IP lifecycle events.
//!
//! # Subject Pattern
//!
//! ```text
//! panel.hooks.{event}
//! ```
//!
//! e.g. `panel.hooks.addServer_afterStore`. Subscribers can take the whole
//! stream with `panel.hooks.>`.
//!
//! This dispatcher never vetoes on its own; a returned error only ever
//! means the publish itself failed, which aborts the operation like any
//! other hook failure. Deployments that want best-effort fan-out should
//! subscribe out-of-band instead of relying on publish success.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{HookDispatcher, HookEnvelope, HookPoint};
use crate::nats::NatsClient;

/// Root of the hook subject hierarchy
pub const HOOK_SUBJECT_ROOT: &str = "panel.hooks";

/// Publishes hook envelopes to `panel.hooks.{event}`
#[derive(Clone)]
pub struct NatsHookPublisher {
    client: NatsClient,
}

impl NatsHookPublisher {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }

    /// Subject a hook point is published on
    pub fn subject(point: HookPoint) -> String {
        format!("{HOOK_SUBJECT_ROOT}.{point}")
    }
}

#[async_trait]
impl HookDispatcher for NatsHookPublisher {
    async fn dispatch(
        &self,
        point: HookPoint,
        payload: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let envelope = HookEnvelope {
            hook: point.as_str().to_string(),
            occurred_at: Utc::now(),
            payload: payload.clone(),
        };

        let subject = Self::subject(point);
        self.client.publish(&subject, &envelope).await?;

        debug!(hook = %point, %subject, "published hook envelope");
        Ok(())
    }
}
