//! Pattern matching between a (possibly wildcarded) grant and a concrete permission
//!
//! Segment rules:
//! - a non-terminal `*` matches exactly one segment, and the pattern and the
//!   concrete permission must have the same number of segments;
//! - a terminal `*` matches zero or more trailing segments, only the prefix
//!   before it has to line up.
//!
//! Scope rules follow [`PermissionScope::covers`](super::PermissionScope::covers).

use super::types::{Permission, WILDCARD};

impl Permission {
    /// Checks whether this grant matches a concrete permission
    ///
    /// Returns `false` when `concrete` is itself a pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeeper_authz::permission::Permission;
    ///
    /// let grant = Permission::new("a.*.read:own").unwrap();
    /// assert!(grant.matches(&Permission::new("a.b.read:own").unwrap()));
    /// assert!(!grant.matches(&Permission::new("a.b.c.read:own").unwrap()));
    ///
    /// let broad = Permission::new("a.*:own").unwrap();
    /// assert!(broad.matches(&Permission::new("a.b.c.read:own").unwrap()));
    /// ```
    pub fn matches(&self, concrete: &Permission) -> bool {
        concrete.is_concrete()
            && self.scope().covers(concrete.scope())
            && segments_match(self.segments(), concrete.segments())
    }
}

/// Segment-only comparison of a pattern path against a concrete path
pub(crate) fn segments_match(pattern: &[String], concrete: &[String]) -> bool {
    match pattern.split_last() {
        Some((last, prefix)) if last == WILDCARD => {
            concrete.len() >= prefix.len()
                && prefix
                    .iter()
                    .zip(concrete.iter())
                    .all(|(p, c)| segment_matches(p, c))
        }
        _ => {
            pattern.len() == concrete.len()
                && pattern
                    .iter()
                    .zip(concrete.iter())
                    .all(|(p, c)| segment_matches(p, c))
        }
    }
}

#[inline]
fn segment_matches(pattern: &str, concrete: &str) -> bool {
    pattern == WILDCARD || pattern == concrete
}

/// String-level matcher
///
/// Either side failing to parse means no match; this never errors.
///
/// ```
/// use gatekeeper_authz::permission::matches;
///
/// assert!(matches("chats.*:own", "chats.create:own"));
/// assert!(!matches("chats.*:own", "chats.create:all"));
/// assert!(!matches("chats.*", "chats.create:own"));
/// ```
pub fn matches(pattern: &str, concrete: &str) -> bool {
    match (Permission::new(pattern), Permission::new(concrete)) {
        (Ok(pattern), Ok(concrete)) => pattern.matches(&concrete),
        _ => false,
    }
}
