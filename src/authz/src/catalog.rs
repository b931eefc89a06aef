//! Permission catalog
//!
//! The closed set of concrete permissions a deployment recognizes. Built
//! once at startup from a manifest and shared read-only (behind an `Arc`)
//! with everything that expands wildcards.
//!
//! Manifest format: one permission per line, surrounding whitespace
//! trimmed, blank lines and lines starting with `#` ignored.

use indexmap::IndexSet;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AuthzError, Result};
use crate::permission::Permission;

/// Immutable set of valid concrete permissions, in manifest order
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    entries: IndexSet<Permission>,
}

impl PermissionCatalog {
    /// Builds a catalog from already-parsed permissions
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if any entry is a wildcard pattern
    /// - `EmptyCatalog` if there are no entries
    pub fn new<I>(permissions: I) -> Result<Self>
    where
        I: IntoIterator<Item = Permission>,
    {
        let mut entries = IndexSet::new();
        for permission in permissions {
            if permission.is_pattern() {
                return Err(AuthzError::InvalidInput(format!(
                    "Catalog entries must be concrete: '{}'",
                    permission
                )));
            }
            entries.insert(permission);
        }

        if entries.is_empty() {
            return Err(AuthzError::EmptyCatalog);
        }

        Ok(Self { entries })
    }

    /// Parses a manifest
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeeper_authz::PermissionCatalog;
    ///
    /// let catalog = PermissionCatalog::from_manifest(
    ///     "# chats\nchats.create:own\n\nchats.read:own\n",
    /// ).unwrap();
    /// assert_eq!(catalog.len(), 2);
    /// assert!(catalog.contains("chats.read:own"));
    /// ```
    pub fn from_manifest(contents: &str) -> Result<Self> {
        let mut entries = IndexSet::new();

        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let permission = Permission::new(line).map_err(|e| AuthzError::CatalogLine {
                line: idx + 1,
                reason: e.to_string(),
            })?;

            if permission.is_pattern() {
                return Err(AuthzError::CatalogLine {
                    line: idx + 1,
                    reason: format!("'{}' is a pattern, catalog entries must be concrete", line),
                });
            }

            if !entries.insert(permission) {
                debug!("Duplicate catalog entry on line {}: {}", idx + 1, line);
            }
        }

        if entries.is_empty() {
            return Err(AuthzError::EmptyCatalog);
        }

        Ok(Self { entries })
    }

    /// Loads a manifest file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_manifest(&contents)?;

        info!(
            "Loaded permission catalog from {:?}: {} entries",
            path.as_ref(),
            catalog.len()
        );

        Ok(catalog)
    }

    /// Returns whether a concrete permission is recognized
    pub fn contains(&self, permission: &str) -> bool {
        self.entries.contains(permission)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` for a constructed catalog
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in manifest order
    pub fn iter(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.entries.iter()
    }
}
