//! Authorization decision point
//!
//! `authorize` is the check every protected operation runs. It works on the
//! raw held map (patterns included), so no expansion is needed:
//!
//! 1. exact key present with `true` → allow
//! 2. any `true` key whose pattern matches the requirement → allow
//! 3. otherwise deny
//!
//! A malformed or wildcarded requirement is denied, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::permission::{Permission, PermissionMap};

/// Why a decision came out the way it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    /// The exact permission is held with `true`
    ExactGrant,
    /// A held pattern matched
    PatternGrant {
        /// The matching held key
        pattern: String,
    },
    /// Nothing held covers the requirement
    NoMatchingGrant,
    /// The requirement is malformed or not concrete
    InvalidRequirement {
        /// Parse or validation error
        error: String,
    },
}

/// Authorization decision with its reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDecision {
    /// Whether the operation may proceed
    pub allowed: bool,

    /// The permission that was required
    pub required: String,

    /// Reason for the decision
    pub reason: DecisionReason,

    /// Decision timestamp
    pub decided_at: DateTime<Utc>,
}

impl AuthDecision {
    /// Create an allow decision
    pub fn allow(required: impl Into<String>, reason: DecisionReason) -> Self {
        Self::new(true, required, reason)
    }

    /// Create a deny decision
    pub fn deny(required: impl Into<String>, reason: DecisionReason) -> Self {
        Self::new(false, required, reason)
    }

    fn new(allowed: bool, required: impl Into<String>, reason: DecisionReason) -> Self {
        Self {
            allowed,
            required: required.into(),
            reason,
            decided_at: Utc::now(),
        }
    }
}

/// Grant that satisfied a requirement
enum Grant<'a> {
    Exact,
    Pattern(&'a Permission),
}

fn find_grant<'a>(held: &'a PermissionMap, required: &Permission) -> Option<Grant<'a>> {
    if held.is_granted(required.as_str()) {
        return Some(Grant::Exact);
    }

    held.iter()
        .filter(|(_, value)| *value)
        .find(|(key, _)| key.matches(required))
        .map(|(key, _)| Grant::Pattern(key))
}

/// Typed check, for callers that already hold a parsed requirement
pub fn authorize_permission(held: &PermissionMap, required: &Permission) -> bool {
    required.is_concrete() && find_grant(held, required).is_some()
}

/// Decides whether `held` covers the concrete permission `required`
///
/// # Examples
///
/// ```
/// use gatekeeper_authz::authorize;
/// use gatekeeper_authz::permission::PermissionMap;
///
/// let held = PermissionMap::try_from_entries(vec![("chats.*:own", true)]).unwrap();
/// assert!(authorize(&held, "chats.create:own"));
/// assert!(!authorize(&held, "chats.create:all"));
/// ```
pub fn authorize(held: &PermissionMap, required: &str) -> bool {
    match Permission::new(required) {
        Ok(required) => authorize_permission(held, &required),
        Err(e) => {
            warn!("Denying malformed requirement '{}': {}", required, e);
            false
        }
    }
}

/// Same as [`authorize`], with the reason attached
pub fn evaluate(held: &PermissionMap, required: &str) -> AuthDecision {
    let parsed = match Permission::new(required) {
        Ok(parsed) if parsed.is_concrete() => parsed,
        Ok(_) => {
            return AuthDecision::deny(
                required,
                DecisionReason::InvalidRequirement {
                    error: "requirement must be concrete".to_string(),
                },
            );
        }
        Err(e) => {
            return AuthDecision::deny(
                required,
                DecisionReason::InvalidRequirement { error: e.to_string() },
            );
        }
    };

    match find_grant(held, &parsed) {
        Some(Grant::Exact) => AuthDecision::allow(required, DecisionReason::ExactGrant),
        Some(Grant::Pattern(pattern)) => AuthDecision::allow(
            required,
            DecisionReason::PatternGrant {
                pattern: pattern.as_str().to_string(),
            },
        ),
        None => AuthDecision::deny(required, DecisionReason::NoMatchingGrant),
    }
}
