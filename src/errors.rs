//! Error types for server and IP management operations

use thiserror::Error;

use crate::hooks::HookPoint;
use crate::store::StoreError;

/// Errors surfaced by the server/IP management operations
///
/// Every failure carries a human-readable message identifying the offending
/// entity by id, value or name. [`ApiError::status`] maps each kind onto the
/// status code the transport layer reports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller lacks permission, or the mutation would violate the
    /// single-default / non-empty-IP-set protections
    #[error("{0}")]
    Forbidden(String),

    /// Referenced server, IP or owner does not resolve
    #[error("{0}")]
    NotFound(String),

    /// IP value already exists elsewhere, or an IP does not belong to the
    /// named server
    #[error("{0}")]
    Conflict(String),

    /// Malformed input rejected before any write
    #[error("{0}")]
    Validation(String),

    /// An extension hook vetoed the in-progress operation
    #[error("hook '{point}' rejected the operation: {cause}")]
    Hook {
        /// Hook point that raised
        point: HookPoint,
        /// The hook's own error, propagated unchanged
        cause: anyhow::Error,
    },

    /// Record store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A compensating rollback itself failed; both failures are preserved
    #[error("compensating rollback failed: {rollback} (original failure: {original})")]
    Fatal {
        /// The failure that triggered the rollback
        original: Box<ApiError>,
        /// The rollback's own failure
        rollback: StoreError,
    },
}

impl ApiError {
    /// Status code reported to the transport layer (200 is implicit success)
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Forbidden(_) | ApiError::Hook { .. } => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) | ApiError::Validation(_) => 406,
            ApiError::Store(_) | ApiError::Fatal { .. } => 500,
        }
    }

    /// Standard refusal for a caller without the required permission
    pub(crate) fn permission_denied() -> Self {
        ApiError::Forbidden("You are not allowed to access this function".to_string())
    }

    pub(crate) fn server_not_found(id: crate::domain::ServerId) -> Self {
        ApiError::NotFound(format!("Server with id #{id} could not be found"))
    }

    pub(crate) fn ip_not_found(id: crate::domain::IpId) -> Self {
        ApiError::NotFound(format!("IP with id #{id} could not be found"))
    }

    pub(crate) fn owner_not_found(id: crate::domain::UserId) -> Self {
        ApiError::NotFound(format!("Specified owner with id #{id} does not exist"))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Store(StoreError::Serialization(err.to_string()))
    }
}

/// Result type for server/IP management operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServerId;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::permission_denied().status(), 403);
        assert_eq!(ApiError::server_not_found(ServerId(7)).status(), 404);
        assert_eq!(ApiError::Conflict("dup".into()).status(), 406);
        assert_eq!(ApiError::Validation("bad".into()).status(), 406);
        assert_eq!(
            ApiError::Store(StoreError::Backend("down".into())).status(),
            500
        );
    }

    #[test]
    fn test_fatal_preserves_both_failures() {
        let original = ApiError::Conflict("IP exists".into());
        let err = ApiError::Fatal {
            original: Box::new(original),
            rollback: StoreError::Backend("delete failed".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("delete failed"));
        assert!(msg.contains("IP exists"));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_not_found_messages_identify_entity() {
        assert_eq!(
            ApiError::server_not_found(ServerId(3)).to_string(),
            "Server with id #3 could not be found"
        );
    }
}
