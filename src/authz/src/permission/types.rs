//! Permission type definitions and validation
//!
//! Provides the core `Permission` type: a dot-separated segment path
//! followed by a mandatory ownership scope, e.g. `chats.create:own`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Wildcard token, valid as a whole segment or as the scope
pub const WILDCARD: &str = "*";

/// Separator between path segments
pub const SEGMENT_SEPARATOR: char = '.';

/// Separator between the path and the scope (the last occurrence wins)
pub const SCOPE_SEPARATOR: char = ':';

/// Result type for permission parsing
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Errors that can occur while parsing a permission string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// Empty permission string provided
    Empty,
    /// No `:scope` suffix
    MissingScope(String),
    /// Scope is not one of `own`, `group`, `all`, `*`
    UnknownScope(String),
    /// A path segment is empty (e.g. `chats..read:own`)
    EmptySegment(String),
    /// `*` used inside a segment instead of as the whole segment
    InvalidWildcard(String),
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Permission cannot be empty"),
            Self::MissingScope(raw) => write!(f, "Permission '{}' has no ':scope' suffix", raw),
            Self::UnknownScope(scope) => write!(f, "Unknown permission scope '{}'", scope),
            Self::EmptySegment(raw) => write!(f, "Permission '{}' contains an empty segment", raw),
            Self::InvalidWildcard(segment) => {
                write!(f, "Wildcards must be standalone segments: '{}'", segment)
            }
        }
    }
}

impl std::error::Error for PermissionError {}

/// Ownership breadth of a permission
///
/// Ordered `own < group < all`. The wildcard scope `*` behaves exactly
/// like `all` when it appears on a pattern, but it is never concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    /// Resources owned by the principal
    Own,
    /// Resources shared through a common group
    Group,
    /// Every resource
    All,
    /// Wildcard scope, equivalent to `all`
    #[serde(rename = "*")]
    Any,
}

impl PermissionScope {
    /// Every concrete scope, narrowest first
    pub const CONCRETE: [PermissionScope; 3] = [Self::Own, Self::Group, Self::All];

    /// Parses a scope token
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "own" => Some(Self::Own),
            "group" => Some(Self::Group),
            "all" => Some(Self::All),
            WILDCARD => Some(Self::Any),
            _ => None,
        }
    }

    /// Returns the scope token
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Group => "group",
            Self::All => "all",
            Self::Any => WILDCARD,
        }
    }

    /// Position in the `own < group < all` order
    pub fn rank(&self) -> u8 {
        match self {
            Self::Own => 0,
            Self::Group => 1,
            Self::All | Self::Any => 2,
        }
    }

    /// Returns whether this is the wildcard scope
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Returns whether a grant at this scope covers a requirement at `required`
    ///
    /// | granted       | covers              |
    /// |---------------|---------------------|
    /// | `all` or `*`  | `all`, `group`, `own` |
    /// | `group`       | `group`, `own`      |
    /// | `own`         | `own`               |
    pub fn covers(&self, required: PermissionScope) -> bool {
        !required.is_wildcard() && required.rank() <= self.rank()
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated permission string
///
/// Grammar: `segment(.segment)*:scope`, where each segment is an opaque
/// non-empty token or the standalone wildcard `*`, and scope is one of
/// `own`, `group`, `all`, `*`. The scope is split off at the last `:`.
///
/// A permission without any wildcard is *concrete*; otherwise it is a
/// *pattern*. Equality, hashing and ordering use the raw string only, so a
/// `PermissionMap` can be queried with a plain `&str`.
///
/// # Examples
///
/// ```
/// use gatekeeper_authz::permission::{Permission, PermissionScope};
///
/// let perm = Permission::new("chats.create:own").unwrap();
/// assert_eq!(perm.segments().len(), 2);
/// assert_eq!(perm.scope(), PermissionScope::Own);
/// assert!(perm.is_concrete());
///
/// let pattern = Permission::new("chats.*:group").unwrap();
/// assert!(pattern.matches(&perm));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    /// Original permission string
    raw: String,
    /// Parsed path segments
    segments: Vec<String>,
    /// Parsed scope
    scope: PermissionScope,
    /// Whether any segment or the scope is a wildcard
    pattern: bool,
}

impl Permission {
    /// Parses and validates a permission string
    pub fn new(s: &str) -> PermissionResult<Self> {
        if s.is_empty() {
            return Err(PermissionError::Empty);
        }

        let (path, scope_token) = s
            .rsplit_once(SCOPE_SEPARATOR)
            .ok_or_else(|| PermissionError::MissingScope(s.to_string()))?;

        let scope = PermissionScope::parse(scope_token)
            .ok_or_else(|| PermissionError::UnknownScope(scope_token.to_string()))?;

        let mut segments = Vec::new();
        for segment in path.split(SEGMENT_SEPARATOR) {
            if segment.is_empty() {
                return Err(PermissionError::EmptySegment(s.to_string()));
            }
            if segment.contains('*') && segment != WILDCARD {
                return Err(PermissionError::InvalidWildcard(segment.to_string()));
            }
            segments.push(segment.to_string());
        }

        let pattern = scope.is_wildcard() || segments.iter().any(|seg| seg == WILDCARD);

        Ok(Self {
            raw: s.to_string(),
            segments,
            scope,
            pattern,
        })
    }

    /// Returns the raw permission string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the path segments (scope excluded)
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the scope
    pub fn scope(&self) -> PermissionScope {
        self.scope
    }

    /// Returns the number of path segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns whether this permission contains a wildcard segment or scope
    pub fn is_pattern(&self) -> bool {
        self.pattern
    }

    /// Returns whether this permission is fully specified
    pub fn is_concrete(&self) -> bool {
        !self.pattern
    }

    /// Returns the service name (first segment)
    pub fn service(&self) -> &str {
        // A parsed permission always has at least one segment
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    /// Returns a copy of this permission with a different scope
    pub fn with_scope(&self, scope: PermissionScope) -> Self {
        let path = self.segments.join(".");
        let raw = format!("{}{}{}", path, SCOPE_SEPARATOR, scope.as_str());
        let pattern = scope.is_wildcard() || self.segments.iter().any(|seg| seg == WILDCARD);

        Self {
            raw,
            segments: self.segments.clone(),
            scope,
            pattern,
        }
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Permission {}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permission {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl TryFrom<&str> for Permission {
    type Error = PermissionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.raw
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
