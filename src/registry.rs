// Copyright (c) 2025 - Cowboy AI, Inc.
//! IP Registry
//!
//! Single source of truth for IP uniqueness and the one-default-per-server
//! invariant. IP addresses come into existence only by being attached to a
//! server and are destroyed only by explicit detachment.
//!
//! # Ordering Policy
//!
//! Default reassignment is never an atomic swap: the new default is stored
//! first, then the former default is demoted as a distinct, best-effort
//! step. Inside one operation two rows may briefly both carry
//! `is_default = true`; that state is only ever observed by this component
//! before the demotion completes. Under concurrent callers the invariant
//! relies on a serializing layer (per-server mutex or store transaction)
//! supplied by the hosting environment; no lock is taken here, and none may
//! be held across a hook dispatch.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::access::{ensure_allowed, AccessPolicy, Caller, Operation};
use crate::domain::invariants::{validate_attachment, validate_demotion, validate_detach};
use crate::domain::{IpAddress, IpId, IpValue, NewIpAddress, ServerId};
use crate::errors::{ApiError, ApiResult};
use crate::hooks::{HookDispatcher, HookPoint};
use crate::store::RecordStore;

/// Attach, modify, promote and detach IP addresses for servers
#[derive(Clone)]
pub struct IpRegistry {
    store: Arc<dyn RecordStore>,
    hooks: Arc<dyn HookDispatcher>,
    access: Arc<dyn AccessPolicy>,
}

impl IpRegistry {
    pub fn new(
        store: Arc<dyn RecordStore>,
        hooks: Arc<dyn HookDispatcher>,
        access: Arc<dyn AccessPolicy>,
    ) -> Self {
        Self {
            store,
            hooks,
            access,
        }
    }

    /// Create a new IP address and attach it to a server
    ///
    /// Fails with `Conflict` if the value exists anywhere in the system;
    /// the message names the owning server. The server's first IP is
    /// stored as default regardless of `is_default`, since the invariant
    /// could never be established otherwise.
    ///
    /// Hooks fired: `addServerIP_afterStore` (a veto discards the
    /// just-stored row), then, after the former default is demoted,
    /// `addServerIP_beforeReturn` (a veto aborts the response but the
    /// attachment stands).
    pub async fn attach(
        &self,
        caller: &Caller,
        server_id: ServerId,
        value: &str,
        is_default: bool,
    ) -> ApiResult<IpAddress> {
        ensure_allowed(self.access.as_ref(), caller, Operation::AddServerIp)?;

        let value = IpValue::new(value).map_err(|e| ApiError::Validation(e.to_string()))?;
        let server = self
            .store
            .load_server(server_id)
            .await?
            .ok_or_else(|| ApiError::server_not_found(server_id))?;

        // Early, friendly uniqueness check; the storage layer remains the
        // authoritative guard under concurrency.
        if let Some(existing) = self.store.find_ip_by_value(&value).await? {
            let owner_name = match self.store.load_server(existing.server_id).await? {
                Some(owner) => owner.name,
                // orphaned row: its server was deleted without cascade
                None => format!("#{}", existing.server_id),
            };
            return Err(ApiError::Conflict(format!(
                "IP address \"{value}\" already exists for server \"{owner_name}\""
            )));
        }

        let attached = self.store.ips_for_server(server.id).await?;
        let is_default = is_default || attached.is_empty();

        let stored = self
            .store
            .insert_ip(NewIpAddress {
                value,
                is_default,
                server_id: server.id,
            })
            .await?;
        info!(
            ip_id = stored.id.0,
            value = %stored.value,
            server = %server.name,
            is_default = stored.is_default,
            "attached ip address"
        );

        let payload = serde_json::to_value(&stored)?;
        if let Err(cause) = self
            .hooks
            .dispatch(HookPoint::AddServerIpAfterStore, &payload)
            .await
        {
            let veto = ApiError::Hook {
                point: HookPoint::AddServerIpAfterStore,
                cause,
            };
            return Err(self.discard_ip(stored.id, veto).await);
        }

        if stored.is_default {
            self.demote_former_default(server.id, stored.id).await;
        }

        self.hooks
            .dispatch(HookPoint::AddServerIpBeforeReturn, &payload)
            .await
            .map_err(|cause| ApiError::Hook {
                point: HookPoint::AddServerIpBeforeReturn,
                cause,
            })?;

        Ok(stored)
    }

    /// Modify an IP address value and/or default flag
    ///
    /// An explicit `Some(false)` on the current default fails with
    /// `Forbidden`: demotion happens only as a side effect of promoting a
    /// different IP, so a server can never reach zero defaults.
    ///
    /// `new_value` is applied when non-empty. The value is re-validated
    /// but global uniqueness is NOT re-checked on update; the storage
    /// layer is the authoritative guard for collisions introduced here.
    ///
    /// Hooks fired: `modifyServerIP_beforeReturn` with the final state.
    pub async fn modify(
        &self,
        caller: &Caller,
        ip_id: IpId,
        new_value: Option<&str>,
        new_is_default: Option<bool>,
    ) -> ApiResult<IpAddress> {
        ensure_allowed(self.access.as_ref(), caller, Operation::ModifyServerIp)?;

        let mut ip = self
            .store
            .load_ip(ip_id)
            .await?
            .ok_or_else(|| ApiError::ip_not_found(ip_id))?;
        let mut changed = false;

        if let Some(raw) = new_value {
            if !raw.trim().is_empty() {
                let value =
                    IpValue::new(raw).map_err(|e| ApiError::Validation(e.to_string()))?;
                if value != ip.value {
                    ip.value = value;
                    changed = true;
                }
            }
        }

        match new_is_default {
            // Explicit false on a non-default row is a no-op; on the
            // default row it is refused.
            Some(false) => validate_demotion(&ip)?,
            Some(true) => {
                self.demote_former_default(ip.server_id, ip.id).await;
                if !ip.is_default {
                    ip.is_default = true;
                    changed = true;
                }
            }
            None => {}
        }

        if changed {
            self.store.update_ip(&ip).await?;
            info!(ip_id = ip.id.0, value = %ip.value, is_default = ip.is_default, "modified ip address");
        }

        let fresh = self
            .store
            .load_ip(ip_id)
            .await?
            .ok_or_else(|| ApiError::ip_not_found(ip_id))?;
        let payload = serde_json::to_value(&fresh)?;
        self.hooks
            .dispatch(HookPoint::ModifyServerIpBeforeReturn, &payload)
            .await
            .map_err(|cause| ApiError::Hook {
                point: HookPoint::ModifyServerIpBeforeReturn,
                cause,
            })?;

        Ok(fresh)
    }

    /// Promote an IP to be its server's default
    ///
    /// Verifies the IP is attached to the named server (`Conflict`
    /// otherwise), then delegates to [`IpRegistry::modify`]; the caller
    /// therefore also needs the `Server.modifyServerIP` permission, as
    /// with the original's internal API call. Promoting the IP that is
    /// already default leaves the system unchanged.
    pub async fn set_default(
        &self,
        caller: &Caller,
        server_id: ServerId,
        ip_id: IpId,
    ) -> ApiResult<IpAddress> {
        ensure_allowed(self.access.as_ref(), caller, Operation::SetServerDefaultIp)?;

        let server = self
            .store
            .load_server(server_id)
            .await?
            .ok_or_else(|| ApiError::server_not_found(server_id))?;
        let ip = self
            .store
            .load_ip(ip_id)
            .await?
            .ok_or_else(|| ApiError::ip_not_found(ip_id))?;
        validate_attachment(&ip, &server)?;

        self.modify(caller, ip_id, None, Some(true)).await
    }

    /// Detach an IP from a server and destroy it
    ///
    /// Refused (`Forbidden`) when the IP is the server's only one or its
    /// current default; `Conflict` when it is attached to a different
    /// server.
    pub async fn detach(
        &self,
        caller: &Caller,
        server_id: ServerId,
        ip_id: IpId,
    ) -> ApiResult<()> {
        ensure_allowed(self.access.as_ref(), caller, Operation::DeleteServerIp)?;

        let server = self
            .store
            .load_server(server_id)
            .await?
            .ok_or_else(|| ApiError::server_not_found(server_id))?;
        let ip = self
            .store
            .load_ip(ip_id)
            .await?
            .ok_or_else(|| ApiError::ip_not_found(ip_id))?;
        validate_attachment(&ip, &server)?;

        let attached = self.store.ips_for_server(server.id).await?;
        validate_detach(&ip, &server, attached.len())?;

        self.store.delete_ip(ip.id).await?;
        info!(ip_id = ip.id.0, value = %ip.value, server = %server.name, "detached ip address");
        Ok(())
    }

    /// Demote every default IP of `server_id` other than `keep`
    ///
    /// Best-effort by design: once the new default row is stored this step
    /// may not fail the operation. No former default is not an error, and
    /// a failed demotion write is logged and swallowed.
    async fn demote_former_default(&self, server_id: ServerId, keep: IpId) {
        let attached = match self.store.ips_for_server(server_id).await {
            Ok(attached) => attached,
            Err(err) => {
                warn!(server_id = server_id.0, %err, "could not look up former default ip");
                return;
            }
        };

        for mut former in attached
            .into_iter()
            .filter(|ip| ip.is_default && ip.id != keep)
        {
            former.is_default = false;
            match self.store.update_ip(&former).await {
                Ok(()) => {
                    debug!(ip_id = former.id.0, value = %former.value, "demoted former default ip")
                }
                Err(err) => {
                    warn!(ip_id = former.id.0, %err, "failed to demote former default ip")
                }
            }
        }
    }

    /// Roll back a just-stored IP row after a hook veto
    ///
    /// Returns the error to surface: the original veto, or `Fatal` when
    /// the rollback delete itself failed.
    async fn discard_ip(&self, id: IpId, original: ApiError) -> ApiError {
        match self.store.delete_ip(id).await {
            Ok(()) => {
                info!(ip_id = id.0, "rolled back vetoed ip row");
                original
            }
            Err(rollback) => ApiError::Fatal {
                original: Box::new(original),
                rollback,
            },
        }
    }
}
