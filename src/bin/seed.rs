// Copyright (c) 2025 - Cowboy AI, Inc.
//! Install-time seeding tool
//!
//! Sets up an administrator, grants it the server permissions and creates
//! the default demo server, then prints what exists. Runs against the
//! in-memory store; point it at a real store implementation when wiring
//! the crate into a panel deployment.
//!
//! Run with: cargo run --bin hostpanel-seed

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hostpanel::access::{Caller, StaticPolicy};
use hostpanel::bootstrap;
use hostpanel::domain::NewUser;
use hostpanel::hooks::NoopHooks;
use hostpanel::store::{MemoryStore, RecordStore};
use hostpanel::ServerLifecycle;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let policy = Arc::new(StaticPolicy::new());

    let admin_user = store
        .insert_user(NewUser {
            login: "admin".to_string(),
        })
        .await?;
    bootstrap::grant_defaults(policy.as_ref(), admin_user.id);
    let admin = Caller::new(admin_user.id, admin_user.login.clone());
    info!(user_id = admin_user.id.0, "seeded administrator");

    let lifecycle = ServerLifecycle::new(store, Arc::new(NoopHooks), policy);
    let demo = bootstrap::seed_demo_data(&lifecycle, &admin).await?;
    info!(
        server_id = demo.server.id.0,
        name = %demo.server.name,
        default_ip = %demo.ips[0].value,
        "seeded demo server"
    );

    for server in lifecycle.list_servers(None).await? {
        let export = lifecycle.get_server(server.id).await?;
        println!(
            "#{} {} ({} IPs, default {})",
            export.server.id,
            export.server.name,
            export.ips.len(),
            export
                .default_ip()
                .map(|ip| ip.value.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }

    Ok(())
}
