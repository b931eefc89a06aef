//! Ordered permission → boolean maps
//!
//! Absence of a key is an implicit deny. An explicit `false` is kept as an
//! entry so it can override an earlier `true` during aggregation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{Permission, PermissionResult};

/// Insertion-ordered map of permission grants
///
/// Keys are validated [`Permission`]s; lookups accept plain `&str`.
/// Inserting an existing key overwrites its value in place (the key keeps
/// its original position), which is the last-write-wins rule used by both
/// aggregation and expansion.
///
/// Serializes as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap {
    entries: IndexMap<Permission, bool>,
}

impl PermissionMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Parses raw `(permission, value)` pairs, rejecting the first malformed key
    pub fn try_from_entries<I, K>(entries: I) -> PermissionResult<Self>
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        let mut map = Self::new();
        for (key, value) in entries {
            map.insert(Permission::new(key.as_ref())?, value);
        }
        Ok(map)
    }

    /// Parses raw pairs, dropping malformed keys with a warning
    pub fn from_entries_lossy<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        let mut map = Self::new();
        for (key, value) in entries {
            match Permission::new(key.as_ref()) {
                Ok(permission) => {
                    map.insert(permission, value);
                }
                Err(e) => warn!("Dropping malformed permission key '{}': {}", key.as_ref(), e),
            }
        }
        map
    }

    /// Sets a value, returning the previous one
    pub fn insert(&mut self, permission: Permission, value: bool) -> Option<bool> {
        self.entries.insert(permission, value)
    }

    /// Inserts an explicit grant
    pub fn grant(&mut self, permission: Permission) -> Option<bool> {
        self.insert(permission, true)
    }

    /// Inserts an explicit deny override
    pub fn deny(&mut self, permission: Permission) -> Option<bool> {
        self.insert(permission, false)
    }

    /// Returns the value stored for a key
    pub fn get(&self, permission: &str) -> Option<bool> {
        self.entries.get(permission).copied()
    }

    /// Returns whether the key is present and `true`
    pub fn is_granted(&self, permission: &str) -> bool {
        self.get(permission).unwrap_or(false)
    }

    /// Returns whether the key is present (with either value)
    pub fn contains_key(&self, permission: &str) -> bool {
        self.entries.contains_key(permission)
    }

    /// Removes a key, preserving the order of the remaining entries
    pub fn remove(&mut self, permission: &str) -> Option<bool> {
        self.entries.shift_remove(permission)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Permission, bool)> + '_ {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Iterates keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.entries.keys()
    }

    /// Iterates the keys whose value is `true`
    pub fn granted(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.entries.iter().filter(|(_, v)| **v).map(|(k, _)| k)
    }

    /// Whether any key is a wildcard pattern
    pub fn has_patterns(&self) -> bool {
        self.entries.keys().any(Permission::is_pattern)
    }

    /// Overlays `other` onto this map; values from `other` win on collision
    pub fn merge(&mut self, other: &PermissionMap) {
        for (permission, value) in other.iter() {
            self.entries.insert(permission.clone(), value);
        }
    }
}

impl FromIterator<(Permission, bool)> for PermissionMap {
    fn from_iter<T: IntoIterator<Item = (Permission, bool)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Permission, bool)> for PermissionMap {
    fn extend<T: IntoIterator<Item = (Permission, bool)>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for PermissionMap {
    type Item = (Permission, bool);
    type IntoIter = indexmap::map::IntoIter<Permission, bool>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(s: &str) -> Permission {
        Permission::new(s).unwrap()
    }

    #[test]
    fn test_insert_and_lookup_by_str() {
        let mut map = PermissionMap::new();
        map.grant(perm("chats.create:own"));
        map.deny(perm("chats.delete:own"));

        assert_eq!(map.get("chats.create:own"), Some(true));
        assert_eq!(map.get("chats.delete:own"), Some(false));
        assert_eq!(map.get("chats.read:own"), None);
        assert!(map.is_granted("chats.create:own"));
        assert!(!map.is_granted("chats.delete:own"));
        assert!(map.contains_key("chats.delete:own"));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut map = PermissionMap::new();
        map.grant(perm("a.b:own"));
        map.grant(perm("c.d:own"));
        assert_eq!(map.deny(perm("a.b:own")), Some(true));

        let keys: Vec<&str> = map.keys().map(Permission::as_str).collect();
        assert_eq!(keys, vec!["a.b:own", "c.d:own"]);
        assert_eq!(map.get("a.b:own"), Some(false));
    }

    #[test]
    fn test_try_from_entries_rejects_malformed() {
        let ok = PermissionMap::try_from_entries(vec![("chats.*:own", true)]).unwrap();
        assert_eq!(ok.len(), 1);
        assert!(ok.has_patterns());

        let err = PermissionMap::try_from_entries(vec![("chats.*:own", true), ("broken", true)]);
        assert!(err.is_err());
    }

    #[test]
    fn test_lossy_parsing_drops_malformed() {
        let map = PermissionMap::from_entries_lossy(vec![
            ("chats.read:own", true),
            ("no-scope", true),
            ("chats.write:own", false),
        ]);
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key("no-scope"));
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut base = PermissionMap::try_from_entries(vec![("x.y:own", true), ("x.z:own", true)]).unwrap();
        let overlay = PermissionMap::try_from_entries(vec![("x.y:own", false)]).unwrap();
        base.merge(&overlay);

        assert_eq!(base.get("x.y:own"), Some(false));
        assert_eq!(base.get("x.z:own"), Some(true));
    }

    #[test]
    fn test_json_preserves_order() {
        let map = PermissionMap::try_from_entries(vec![
            ("z.last:own", true),
            ("a.first:all", false),
        ])
        .unwrap();

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"z.last:own":true,"a.first:all":false}"#);

        let back: PermissionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);

        let bad: Result<PermissionMap, _> = serde_json::from_str(r#"{"missing-scope":true}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_granted_iterator() {
        let map = PermissionMap::try_from_entries(vec![
            ("a.b:own", true),
            ("a.c:own", false),
            ("a.d:own", true),
        ])
        .unwrap();

        let granted: Vec<&str> = map.granted().map(Permission::as_str).collect();
        assert_eq!(granted, vec!["a.b:own", "a.d:own"]);
    }
}
