//! Group membership and grant storage

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{Group, GroupMembership};
use crate::error::{AuthzError, Result};
use crate::permission::PermissionMap;
use crate::types::GroupId;

/// Read interface the aggregator consumes
///
/// Implementations return memberships in a stable order (creation order);
/// the aggregator relies on it for last-write-wins.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Group ids of the principal's active memberships, in creation order
    async fn active_memberships(&self, principal: &str) -> Result<Vec<GroupId>>;

    /// Raw grants of a group, `None` if the group does not exist
    async fn group_grants(&self, group: &str) -> Result<Option<PermissionMap>>;

    /// Grants of every active group of the principal, in membership order
    ///
    /// Stores that can read memberships and grants at a single point in
    /// time should override this. The default issues one read per group
    /// and skips groups that disappeared in between.
    async fn load_principal_grants(&self, principal: &str) -> Result<Vec<(GroupId, PermissionMap)>> {
        let mut loaded = Vec::new();
        for group in self.active_memberships(principal).await? {
            match self.group_grants(&group).await? {
                Some(grants) => loaded.push((group, grants)),
                None => warn!(
                    "Skipping membership of {} in missing group {}",
                    principal, group
                ),
            }
        }
        Ok(loaded)
    }
}

#[derive(Default)]
struct StoreState {
    groups: HashMap<GroupId, Group>,
    /// Creation order
    memberships: Vec<GroupMembership>,
}

/// In-memory group store
///
/// Administrative mutations take the write lock; `load_principal_grants`
/// reads memberships and grants under one read lock.
pub struct InMemoryGroupStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryGroupStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
        }
    }

    /// Create or replace a group
    pub async fn put_group(&self, group: Group) {
        let mut state = self.state.write().await;
        info!("Storing group {} ({} grants)", group.id, group.grants.len());
        state.groups.insert(group.id.clone(), group);
    }

    /// Get a group by id
    pub async fn get_group(&self, id: &str) -> Option<Group> {
        let state = self.state.read().await;
        state.groups.get(id).cloned()
    }

    /// List all groups
    pub async fn list_groups(&self) -> Vec<Group> {
        let state = self.state.read().await;
        state.groups.values().cloned().collect()
    }

    /// Delete a group and every membership in it
    pub async fn remove_group(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.groups.remove(id).is_none() {
            return Err(AuthzError::GroupNotFound(id.to_string()));
        }
        state.memberships.retain(|m| m.group_id != id);
        info!("Removed group {}", id);
        Ok(())
    }

    /// Add a principal to a group
    ///
    /// Re-adding an existing membership reactivates it in place, keeping
    /// its original position in the processing order.
    pub async fn add_membership(&self, principal: &str, group: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(group) {
            return Err(AuthzError::GroupNotFound(group.to_string()));
        }

        match state
            .memberships
            .iter()
            .position(|m| m.principal_id == principal && m.group_id == group)
        {
            Some(idx) => state.memberships[idx].active = true,
            None => state.memberships.push(GroupMembership::new(principal, group)),
        }

        Ok(())
    }

    /// Toggle a membership's `active` flag
    pub async fn set_membership_active(&self, principal: &str, group: &str, active: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let membership = state
            .memberships
            .iter_mut()
            .find(|m| m.principal_id == principal && m.group_id == group)
            .ok_or_else(|| AuthzError::MembershipNotFound {
                principal: principal.to_string(),
                group: group.to_string(),
            })?;

        membership.active = active;
        Ok(())
    }

    /// Remove a membership, returning whether one existed
    pub async fn remove_membership(&self, principal: &str, group: &str) -> bool {
        let mut state = self.state.write().await;
        let before = state.memberships.len();
        state
            .memberships
            .retain(|m| !(m.principal_id == principal && m.group_id == group));
        state.memberships.len() != before
    }

    /// All memberships (active or not) of a principal, in creation order
    pub async fn memberships(&self, principal: &str) -> Vec<GroupMembership> {
        let state = self.state.read().await;
        state
            .memberships
            .iter()
            .filter(|m| m.principal_id == principal)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn active_memberships(&self, principal: &str) -> Result<Vec<GroupId>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.principal_id == principal && m.active)
            .map(|m| m.group_id.clone())
            .collect())
    }

    async fn group_grants(&self, group: &str) -> Result<Option<PermissionMap>> {
        let state = self.state.read().await;
        Ok(state.groups.get(group).map(|g| g.grants.clone()))
    }

    async fn load_principal_grants(&self, principal: &str) -> Result<Vec<(GroupId, PermissionMap)>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.principal_id == principal && m.active)
            .filter_map(|m| {
                state
                    .groups
                    .get(&m.group_id)
                    .map(|g| (g.id.clone(), g.grants.clone()))
            })
            .collect())
    }
}
