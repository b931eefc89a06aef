//! Group and membership definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::permission::PermissionMap;
use crate::types::{GroupId, PrincipalId};

/// Named bundle of raw permission grants (e.g. "Guest", "Member", "Admin")
///
/// Grants may contain wildcard patterns. Keys are validated when the map is
/// built, so a malformed grant cannot be stored on a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group identifier
    pub id: GroupId,

    /// Display name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Raw grants as configured
    #[serde(default)]
    pub grants: PermissionMap,
}

impl Group {
    /// Create a group with no grants
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            grants: PermissionMap::new(),
        }
    }

    /// Replace the grants
    pub fn with_grants(mut self, grants: PermissionMap) -> Self {
        self.grants = grants;
        self
    }

    /// Add a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Link between a principal and a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Member principal
    pub principal_id: PrincipalId,

    /// Group joined
    pub group_id: GroupId,

    /// Only active memberships contribute to aggregation
    pub active: bool,

    /// Creation time; aggregation processes memberships in this order
    pub created_at: DateTime<Utc>,
}

impl GroupMembership {
    /// Create an active membership
    pub fn new(principal_id: impl Into<PrincipalId>, group_id: impl Into<GroupId>) -> Self {
        Self {
            principal_id: principal_id.into(),
            group_id: group_id.into(),
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Mark the membership inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
