//! Error types for the authorization engine

use thiserror::Error;
use uuid::Uuid;

use crate::permission::PermissionError;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed permission string
    #[error("Invalid permission: {0}")]
    InvalidPermission(#[from] PermissionError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The permission catalog has no entries
    #[error("Permission catalog is empty")]
    EmptyCatalog,

    /// A manifest line could not be accepted
    #[error("Catalog line {line}: {reason}")]
    CatalogLine {
        /// 1-based line number
        line: usize,
        /// Why the line was rejected
        reason: String,
    },

    /// Group not found
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Membership not found
    #[error("Membership not found: principal={principal}, group={group}")]
    MembershipNotFound {
        /// Principal identifier
        principal: String,
        /// Group identifier
        group: String,
    },

    /// Requested credential permissions exceed the issuer's rights
    #[error("Requested permissions exceed issuer rights: {}", .violations.join(", "))]
    PermissionEscalation {
        /// Every offending concrete permission, sorted
        violations: Vec<String>,
    },

    /// Unknown credential id or secret
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    /// Credential is past its expiry
    #[error("Credential expired: {0}")]
    CredentialExpired(Uuid),

    /// Credential was revoked
    #[error("Credential revoked: {0}")]
    CredentialRevoked(Uuid),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Group store error
    #[error("Store error: {0}")]
    Store(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
