//! Core identifier types

/// Unique principal identifier (user, service account, agent)
pub type PrincipalId = String;

/// Unique group identifier
pub type GroupId = String;

/// Unique credential identifier (session or API key)
pub type CredentialId = uuid::Uuid;
