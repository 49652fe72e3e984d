// Copyright (c) 2025 - Cowboy AI, Inc.
//! One-Time Bootstrap
//!
//! Infrastructure setup that runs once at install time, outside the
//! invariant engine: seeding the permission table with the server
//! operations and creating the default demo server. Demo data goes
//! through the public operations so every invariant holds for it.

use crate::access::{Caller, StaticPolicy};
use crate::domain::{ServerExport, UserId};
use crate::errors::ApiResult;
use crate::lifecycle::ServerLifecycle;

/// Name of the server seeded by [`seed_demo_data`]
pub const DEMO_SERVER_NAME: &str = "Testserver";

/// Grant the administrator every server operation
///
/// The permission names seeded here are the `Operation` set
/// (`Server.addServer` through `Server.setServerDefaultIP`).
pub fn grant_defaults(policy: &StaticPolicy, administrator: UserId) {
    policy.grant_all(administrator);
}

/// Create the default demo server (`Testserver`, `127.0.0.1`)
///
/// Idempotent: if a server with the demo name already exists it is
/// returned as-is.
pub async fn seed_demo_data(
    lifecycle: &ServerLifecycle,
    caller: &Caller,
) -> ApiResult<ServerExport> {
    if let Some(existing) = lifecycle
        .list_servers(None)
        .await?
        .into_iter()
        .find(|s| s.name == DEMO_SERVER_NAME)
    {
        return lifecycle.get_server(existing.id).await;
    }

    lifecycle
        .create_server(
            caller,
            DEMO_SERVER_NAME,
            "This is an automatically added default server",
            "127.0.0.1",
            None,
        )
        .await
}
