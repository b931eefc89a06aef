//! Groups, memberships and permission aggregation
//!
//! # Example
//!
//! ```rust
//! use gatekeeper_authz::groups::{Group, GroupAggregator, InMemoryGroupStore};
//! use gatekeeper_authz::permission::PermissionMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryGroupStore::new());
//! let grants = PermissionMap::try_from_entries(vec![("chats.*:own", true)])?;
//! store.put_group(Group::new("members", "Members").with_grants(grants)).await;
//! store.add_membership("user:alice", "members").await?;
//!
//! let aggregator = GroupAggregator::new(store);
//! let effective = aggregator.aggregate("user:alice").await?;
//! assert!(effective.is_granted("chats.*:own"));
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod store;
pub mod types;

pub use aggregator::GroupAggregator;
pub use store::{GroupStore, InMemoryGroupStore};
pub use types::{Group, GroupMembership};
