// Copyright (c) 2025 - Cowboy AI, Inc.
//! Record Store Abstraction
//!
//! This module defines the storage interface the server/IP operations read
//! and write through, and an in-memory implementation used by tests, demos
//! and seeding.
//!
//! # Architecture
//!
//! ```text
//! Operation → RecordStore → Persistent Storage
//!     ↓
//! Hook dispatch
//! ```
//!
//! # Store Requirements
//!
//! 1. **Read-your-writes**: a row stored earlier in a logical operation is
//!    visible to later reads of the same operation
//! 2. **Assigned ids**: the store assigns numeric ids on insert
//! 3. **Ordering**: `list_servers` returns rows ordered by name ascending
//! 4. **Idempotent deletes**: deleting a missing row is not an error;
//!    callers perform their own existence checks first
//!
//! The trait deliberately exposes only what the core operations need, as
//! typed methods per entity; generic predicate queries stay behind the
//! implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    IpAddress, IpId, IpValue, NewIpAddress, NewServer, NewUser, Server, ServerId, User, UserId,
};

pub mod memory;

pub use memory::MemoryStore;

/// Record store failure
///
/// The store is an external collaborator; its failures surface to callers
/// as infrastructure errors, never silently.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend failure
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Row could not be serialized for storage or export
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage interface for servers, IP addresses and owner lookups
///
/// All calls are synchronous from the core's perspective: each operation
/// issues sequential store calls and suspends only on the store itself.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a server row; the store assigns id and creation time
    async fn insert_server(&self, draft: NewServer) -> StoreResult<Server>;

    /// Load a server by id, `None` if it does not exist
    async fn load_server(&self, id: ServerId) -> StoreResult<Option<Server>>;

    /// Overwrite an existing server row
    async fn update_server(&self, server: &Server) -> StoreResult<()>;

    /// Delete a server row; missing rows are a no-op
    async fn delete_server(&self, id: ServerId) -> StoreResult<()>;

    /// All servers ordered by name ascending, optionally one owner's
    async fn list_servers(&self, owner: Option<UserId>) -> StoreResult<Vec<Server>>;

    /// Insert an IP row; the store assigns id and creation time
    async fn insert_ip(&self, draft: NewIpAddress) -> StoreResult<IpAddress>;

    /// Load an IP by id, `None` if it does not exist
    async fn load_ip(&self, id: IpId) -> StoreResult<Option<IpAddress>>;

    /// Overwrite an existing IP row
    async fn update_ip(&self, ip: &IpAddress) -> StoreResult<()>;

    /// Delete an IP row; missing rows are a no-op
    async fn delete_ip(&self, id: IpId) -> StoreResult<()>;

    /// Find the IP row holding `value`, anywhere in the system
    async fn find_ip_by_value(&self, value: &IpValue) -> StoreResult<Option<IpAddress>>;

    /// All IPs attached to a server, ordered by id ascending
    async fn ips_for_server(&self, server: ServerId) -> StoreResult<Vec<IpAddress>>;

    /// Insert a user row
    async fn insert_user(&self, draft: NewUser) -> StoreResult<User>;

    /// Load a user by id, `None` if it does not exist
    async fn load_user(&self, id: UserId) -> StoreResult<Option<User>>;
}
