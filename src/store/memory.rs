// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Record Store
//!
//! RwLock'd maps with a single atomic id sequence. Gives the
//! read-your-writes consistency the operations assume; used by tests, the
//! seed binary and as a reference implementation for real backends.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

use super::{RecordStore, StoreError, StoreResult};
use crate::domain::{
    IpAddress, IpId, IpValue, NewIpAddress, NewServer, NewUser, Server, ServerId, User, UserId,
};

/// In-memory implementation of [`RecordStore`]
///
/// Locks are held only for the duration of a single map access, never
/// across an await point.
#[derive(Debug)]
pub struct MemoryStore {
    next_id: AtomicU64,
    servers: RwLock<HashMap<u64, Server>>,
    ips: RwLock<HashMap<u64, IpAddress>>,
    users: RwLock<HashMap<u64, User>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store; ids start at 1, so id 0 stays free as the
    /// remove-owner sentinel
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            servers: RwLock::new(HashMap::new()),
            ips: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn poisoned(what: &str) -> StoreError {
        StoreError::Backend(format!("{what} table lock poisoned"))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_server(&self, draft: NewServer) -> StoreResult<Server> {
        let server = Server {
            id: ServerId(self.next_id()),
            name: draft.name,
            description: draft.description,
            owner: draft.owner,
            created: Utc::now(),
        };
        self.servers
            .write()
            .map_err(|_| Self::poisoned("server"))?
            .insert(server.id.0, server.clone());
        debug!(server_id = server.id.0, name = %server.name, "stored server row");
        Ok(server)
    }

    async fn load_server(&self, id: ServerId) -> StoreResult<Option<Server>> {
        Ok(self
            .servers
            .read()
            .map_err(|_| Self::poisoned("server"))?
            .get(&id.0)
            .cloned())
    }

    async fn update_server(&self, server: &Server) -> StoreResult<()> {
        let mut servers = self.servers.write().map_err(|_| Self::poisoned("server"))?;
        match servers.get_mut(&server.id.0) {
            Some(row) => {
                *row = server.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "update of missing server row #{}",
                server.id
            ))),
        }
    }

    async fn delete_server(&self, id: ServerId) -> StoreResult<()> {
        self.servers
            .write()
            .map_err(|_| Self::poisoned("server"))?
            .remove(&id.0);
        debug!(server_id = id.0, "deleted server row");
        Ok(())
    }

    async fn list_servers(&self, owner: Option<UserId>) -> StoreResult<Vec<Server>> {
        let servers = self.servers.read().map_err(|_| Self::poisoned("server"))?;
        let mut rows: Vec<Server> = servers
            .values()
            .filter(|s| owner.is_none() || s.owner == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn insert_ip(&self, draft: NewIpAddress) -> StoreResult<IpAddress> {
        let ip = IpAddress {
            id: IpId(self.next_id()),
            value: draft.value,
            is_default: draft.is_default,
            server_id: draft.server_id,
            created: Utc::now(),
        };
        self.ips
            .write()
            .map_err(|_| Self::poisoned("ipaddress"))?
            .insert(ip.id.0, ip.clone());
        debug!(ip_id = ip.id.0, value = %ip.value, server_id = ip.server_id.0, "stored ip row");
        Ok(ip)
    }

    async fn load_ip(&self, id: IpId) -> StoreResult<Option<IpAddress>> {
        Ok(self
            .ips
            .read()
            .map_err(|_| Self::poisoned("ipaddress"))?
            .get(&id.0)
            .cloned())
    }

    async fn update_ip(&self, ip: &IpAddress) -> StoreResult<()> {
        let mut ips = self.ips.write().map_err(|_| Self::poisoned("ipaddress"))?;
        match ips.get_mut(&ip.id.0) {
            Some(row) => {
                *row = ip.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "update of missing ip row #{}",
                ip.id
            ))),
        }
    }

    async fn delete_ip(&self, id: IpId) -> StoreResult<()> {
        self.ips
            .write()
            .map_err(|_| Self::poisoned("ipaddress"))?
            .remove(&id.0);
        debug!(ip_id = id.0, "deleted ip row");
        Ok(())
    }

    async fn find_ip_by_value(&self, value: &IpValue) -> StoreResult<Option<IpAddress>> {
        Ok(self
            .ips
            .read()
            .map_err(|_| Self::poisoned("ipaddress"))?
            .values()
            .find(|ip| ip.value == *value)
            .cloned())
    }

    async fn ips_for_server(&self, server: ServerId) -> StoreResult<Vec<IpAddress>> {
        let ips = self.ips.read().map_err(|_| Self::poisoned("ipaddress"))?;
        let mut rows: Vec<IpAddress> = ips
            .values()
            .filter(|ip| ip.server_id == server)
            .cloned()
            .collect();
        rows.sort_by_key(|ip| ip.id);
        Ok(rows)
    }

    async fn insert_user(&self, draft: NewUser) -> StoreResult<User> {
        let user = User {
            id: UserId(self.next_id()),
            login: draft.login,
        };
        self.users
            .write()
            .map_err(|_| Self::poisoned("user"))?
            .insert(user.id.0, user.clone());
        Ok(user)
    }

    async fn load_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .map_err(|_| Self::poisoned("user"))?
            .get(&id.0)
            .cloned())
    }
}
