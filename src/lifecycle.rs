// Copyright (c) 2025 - Cowboy AI, Inc.
//! Server Lifecycle Manager
//!
//! Compound server creation and deletion spanning the Server entity and
//! its IPs. A server and its first IP are created as two separate store
//! operations with no shared transaction, so creation is an explicit
//! two-step saga:
//!
//! ```text
//! store server → addServer_afterStore → attach first IP ─┬─ ok → return
//!                                                        └─ err → delete server, propagate
//! ```
//!
//! The compensation (deleting the just-created server) is the only
//! rollback sequence in the system; if the compensation itself fails the
//! operation surfaces [`ApiError::Fatal`] carrying both failures.

use std::sync::Arc;
use tracing::{info, warn};

use crate::access::{ensure_allowed, AccessPolicy, Caller, Operation};
use crate::domain::invariants::validate_server_name;
use crate::domain::{IpValue, NewServer, Server, ServerExport, ServerId, UserId};
use crate::errors::{ApiError, ApiResult};
use crate::hooks::{HookDispatcher, HookPoint};
use crate::registry::IpRegistry;
use crate::store::RecordStore;

/// Create, modify, delete and look up servers
#[derive(Clone)]
pub struct ServerLifecycle {
    store: Arc<dyn RecordStore>,
    hooks: Arc<dyn HookDispatcher>,
    access: Arc<dyn AccessPolicy>,
    registry: IpRegistry,
}

impl ServerLifecycle {
    pub fn new(
        store: Arc<dyn RecordStore>,
        hooks: Arc<dyn HookDispatcher>,
        access: Arc<dyn AccessPolicy>,
    ) -> Self {
        let registry = IpRegistry::new(store.clone(), hooks.clone(), access.clone());
        Self {
            store,
            hooks,
            access,
            registry,
        }
    }

    /// The IP registry operating on the same store, hooks and policy
    pub fn registry(&self) -> &IpRegistry {
        &self.registry
    }

    /// Create a server together with its first (default) IP address
    ///
    /// The owner defaults to the acting caller when `owner` is `None`; a
    /// given owner id must resolve (`NotFound` otherwise). Name and IP
    /// value are validated before anything is written.
    ///
    /// The attach step runs under the caller's identity, so the caller
    /// needs `Server.addServer` and `Server.addServerIP`. If the attach
    /// fails, for any reason, the just-created server
    /// row is deleted and the attach error propagates unchanged.
    ///
    /// Hooks fired: `addServer_afterStore` with the pre-IP export (a veto
    /// rolls the server row back), the attach's own hooks, then
    /// `addServer_beforeReturn` with the full export.
    pub async fn create_server(
        &self,
        caller: &Caller,
        name: &str,
        description: &str,
        ip_value: &str,
        owner: Option<UserId>,
    ) -> ApiResult<ServerExport> {
        ensure_allowed(self.access.as_ref(), caller, Operation::AddServer)?;

        let name = validate_server_name(name)?;
        IpValue::new(ip_value).map_err(|e| ApiError::Validation(e.to_string()))?;

        let owner = match owner {
            Some(id) => {
                self.store
                    .load_user(id)
                    .await?
                    .ok_or_else(|| ApiError::owner_not_found(id))?;
                Some(id)
            }
            None => Some(caller.user_id),
        };

        let server = self
            .store
            .insert_server(NewServer {
                name,
                description: description.trim().to_string(),
                owner,
            })
            .await?;
        info!(server_id = server.id.0, name = %server.name, "stored server row");

        let pre_ip = ServerExport {
            server: server.clone(),
            ips: Vec::new(),
        };
        let payload = serde_json::to_value(&pre_ip)?;
        if let Err(cause) = self
            .hooks
            .dispatch(HookPoint::AddServerAfterStore, &payload)
            .await
        {
            let veto = ApiError::Hook {
                point: HookPoint::AddServerAfterStore,
                cause,
            };
            return Err(self.roll_back_server(server.id, veto).await);
        }

        // Second saga step: the first IP, forced default.
        if let Err(attach_err) = self
            .registry
            .attach(caller, server.id, ip_value, true)
            .await
        {
            return Err(self.roll_back_server(server.id, attach_err).await);
        }

        let export = self.export(server).await?;
        let payload = serde_json::to_value(&export)?;
        self.hooks
            .dispatch(HookPoint::AddServerBeforeReturn, &payload)
            .await
            .map_err(|cause| ApiError::Hook {
                point: HookPoint::AddServerBeforeReturn,
                cause,
            })?;

        info!(server_id = export.server.id.0, name = %export.server.name, "created server");
        Ok(export)
    }

    /// Modify a server's name, description and/or owner
    ///
    /// `name` is applied when non-empty after trimming. An `owner` of
    /// user id 0 removes the previous owner, which makes the acting
    /// caller the owner; any other id must resolve.
    pub async fn modify_server(
        &self,
        caller: &Caller,
        server_id: ServerId,
        name: Option<&str>,
        description: Option<&str>,
        owner: Option<UserId>,
    ) -> ApiResult<ServerExport> {
        ensure_allowed(self.access.as_ref(), caller, Operation::ModifyServer)?;

        let mut server = self
            .store
            .load_server(server_id)
            .await?
            .ok_or_else(|| ApiError::server_not_found(server_id))?;
        let mut changed = false;

        if let Some(raw) = name {
            let trimmed = raw.trim();
            if !trimmed.is_empty() && trimmed != server.name {
                server.name = trimmed.to_string();
                changed = true;
            }
        }
        if let Some(raw) = description {
            let trimmed = raw.trim();
            if trimmed != server.description {
                server.description = trimmed.to_string();
                changed = true;
            }
        }
        if let Some(id) = owner {
            let new_owner = if id == UserId(0) {
                caller.user_id
            } else {
                self.store
                    .load_user(id)
                    .await?
                    .ok_or_else(|| ApiError::owner_not_found(id))?;
                id
            };
            if server.owner != Some(new_owner) {
                server.owner = Some(new_owner);
                changed = true;
            }
        }

        if changed {
            self.store.update_server(&server).await?;
            info!(server_id = server.id.0, name = %server.name, "modified server");
        }

        self.export(server).await
    }

    /// Delete a server
    ///
    /// Fires `deleteServer_beforeDelete` with the export before anything
    /// is removed; a hook error aborts the delete and propagates
    /// unchanged; this is the designed point for other subsystems to block
    /// deletion of a server still in use.
    ///
    /// Attached IP rows are NOT cascade-deleted. Orphaned rows keep
    /// holding their values against global uniqueness; integrators that
    /// reuse addresses must reap them out-of-band.
    pub async fn delete_server(&self, caller: &Caller, server_id: ServerId) -> ApiResult<()> {
        ensure_allowed(self.access.as_ref(), caller, Operation::DeleteServer)?;

        let server = self
            .store
            .load_server(server_id)
            .await?
            .ok_or_else(|| ApiError::server_not_found(server_id))?;

        let export = self.export(server).await?;
        let payload = serde_json::to_value(&export)?;
        self.hooks
            .dispatch(HookPoint::DeleteServerBeforeDelete, &payload)
            .await
            .map_err(|cause| ApiError::Hook {
                point: HookPoint::DeleteServerBeforeDelete,
                cause,
            })?;

        self.store.delete_server(server_id).await?;
        info!(server_id = server_id.0, name = %export.server.name, "deleted server");
        Ok(())
    }

    /// All servers ordered by name ascending, optionally one owner's
    pub async fn list_servers(&self, owner: Option<UserId>) -> ApiResult<Vec<Server>> {
        Ok(self.store.list_servers(owner).await?)
    }

    /// A server with its attached IPs
    pub async fn get_server(&self, server_id: ServerId) -> ApiResult<ServerExport> {
        let server = self
            .store
            .load_server(server_id)
            .await?
            .ok_or_else(|| ApiError::server_not_found(server_id))?;
        self.export(server).await
    }

    async fn export(&self, server: Server) -> ApiResult<ServerExport> {
        let ips = self.store.ips_for_server(server.id).await?;
        Ok(ServerExport { server, ips })
    }

    /// Compensating delete of a just-created server row
    ///
    /// Returns the error to surface: the original failure, or `Fatal`
    /// when the compensation itself failed.
    async fn roll_back_server(&self, server_id: ServerId, original: ApiError) -> ApiError {
        match self.store.delete_server(server_id).await {
            Ok(()) => {
                warn!(server_id = server_id.0, %original, "rolled back server creation");
                original
            }
            Err(rollback) => ApiError::Fatal {
                original: Box::new(original),
                rollback,
            },
        }
    }
}
