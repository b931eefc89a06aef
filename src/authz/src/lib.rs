//! # Gatekeeper Authorization Engine
//!
//! Permission-string authorization with wildcards, scope tiers and group
//! aggregation.
//!
//! ## Features
//!
//! - **Permission grammar** `service.resource.action:scope` with `*` segments
//! - **Scope hierarchy** `own` < `group` < `all`, with `*` covering every tier
//! - **Closed catalog** of concrete permissions for wildcard expansion
//! - **Group aggregation** with last-write-wins overrides
//! - **Subset validation** so derived credentials cannot escalate
//! - **Credential snapshots** for sessions and API keys
//!
//! ## Example
//!
//! ```rust
//! use gatekeeper_authz::groups::{Group, InMemoryGroupStore};
//! use gatekeeper_authz::permission::PermissionMap;
//! use gatekeeper_authz::{AuthzEngine, PermissionCatalog};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = PermissionCatalog::from_manifest(
//!         "chats.create:own\nchats.create:all\nchats.read:own\n",
//!     )?;
//!
//!     let store = Arc::new(InMemoryGroupStore::new());
//!     let grants = PermissionMap::try_from_entries(vec![("chats.*:own", true)])?;
//!     store.put_group(Group::new("members", "Members").with_grants(grants)).await;
//!     store.add_membership("user:alice", "members").await?;
//!
//!     let engine = AuthzEngine::new(Arc::new(catalog), store)?;
//!     let held = engine.aggregate_group_permissions("user:alice").await?;
//!
//!     assert!(engine.authorize(&held, "chats.create:own"));
//!     assert!(!engine.authorize(&held, "chats.create:all"));
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod credential;
pub mod engine;
pub mod error;
pub mod expand;
pub mod groups;
pub mod permission;
pub mod types;
pub mod validate;

// Re-export commonly used types
pub use catalog::PermissionCatalog;
pub use config::GatekeeperConfig;
pub use credential::{Credential, CredentialIssuer, PermissionSnapshot};
pub use engine::{authorize, AuthDecision, AuthzEngine, DecisionReason, EngineConfig};
pub use error::{AuthzError, Result};
pub use expand::{expand, expand_map, CacheStats, WildcardExpander};
pub use groups::{GroupAggregator, GroupStore, InMemoryGroupStore};
pub use permission::{matches, Permission, PermissionMap, PermissionScope};
pub use types::{CredentialId, GroupId, PrincipalId};
pub use validate::{validate_subset, SubsetValidation};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
