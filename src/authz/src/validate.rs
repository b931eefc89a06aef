//! Subset validation for derived credentials
//!
//! A derived credential (API key) may only carry rights its issuer
//! currently holds. Both maps are expanded against the catalog, then every
//! requested `true` must also be `true` on the issuer's side.

use serde::{Deserialize, Serialize};

use crate::catalog::PermissionCatalog;
use crate::error::AuthzError;
use crate::expand::expand_map;
use crate::permission::PermissionMap;

/// Outcome of a subset check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetValidation {
    /// Requested concrete permissions the issuer does not hold, sorted
    pub violations: Vec<String>,
}

impl SubsetValidation {
    /// Whether the request is within the issuer's rights
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Splits into `(ok, violations)`
    pub fn into_parts(self) -> (bool, Vec<String>) {
        (self.violations.is_empty(), self.violations)
    }

    /// Converts violations into a hard rejection
    pub fn into_result(self) -> Result<(), AuthzError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(AuthzError::PermissionEscalation {
                violations: self.violations,
            })
        }
    }
}

/// Checks that `requested` grants nothing beyond `superset`
///
/// # Examples
///
/// ```
/// use gatekeeper_authz::{validate_subset, PermissionCatalog};
/// use gatekeeper_authz::permission::PermissionMap;
///
/// let catalog = PermissionCatalog::from_manifest("a.b.c:own\na.b.c:all\n").unwrap();
/// let requested = PermissionMap::try_from_entries(vec![("a.b.c:all", true)]).unwrap();
/// let held = PermissionMap::try_from_entries(vec![("a.b.c:own", true)]).unwrap();
///
/// let result = validate_subset(&requested, &held, &catalog);
/// assert!(!result.is_ok());
/// assert_eq!(result.violations, vec!["a.b.c:all"]);
/// ```
pub fn validate_subset(
    requested: &PermissionMap,
    superset: &PermissionMap,
    catalog: &PermissionCatalog,
) -> SubsetValidation {
    let requested = expand_map(requested, catalog);
    let superset = expand_map(superset, catalog);
    violations_between(&requested, &superset)
}

/// Subset check on maps that are already expanded
pub(crate) fn violations_between(requested: &PermissionMap, superset: &PermissionMap) -> SubsetValidation {
    let mut violations: Vec<String> = requested
        .granted()
        .filter(|permission| !superset.is_granted(permission.as_str()))
        .map(|permission| permission.as_str().to_string())
        .collect();

    violations.sort();

    SubsetValidation { violations }
}
