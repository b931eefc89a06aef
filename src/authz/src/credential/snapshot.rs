//! Frozen permission snapshots carried by credentials

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::permission::PermissionMap;

/// Expanded permission map frozen at issuance
///
/// Cloning shares the map. Nothing can mutate it after creation, so a
/// credential authorizes against exactly what it was issued with until it
/// expires or is revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSnapshot {
    permissions: Arc<PermissionMap>,
    taken_at: DateTime<Utc>,
}

impl PermissionSnapshot {
    /// Freeze a map
    pub fn new(permissions: PermissionMap, taken_at: DateTime<Utc>) -> Self {
        Self {
            permissions: Arc::new(permissions),
            taken_at,
        }
    }

    /// The frozen map
    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    /// When the snapshot was taken
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Number of frozen entries
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Whether the snapshot grants nothing
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Whether two snapshots share the same frozen map
    pub fn same_as(&self, other: &PermissionSnapshot) -> bool {
        Arc::ptr_eq(&self.permissions, &other.permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_map() {
        let map = PermissionMap::try_from_entries(vec![("a.b:own", true)]).unwrap();
        let snapshot = PermissionSnapshot::new(map.clone(), Utc::now());
        let copy = snapshot.clone();

        assert!(snapshot.same_as(&copy));
        assert_eq!(copy.permissions(), &map);
        assert_eq!(copy.len(), 1);

        let other = PermissionSnapshot::new(map, snapshot.taken_at());
        assert!(!snapshot.same_as(&other));
        assert_eq!(snapshot, other);
    }
}
