//! Permission grammar module
//!
//! Parses `service.segment.action:scope` strings into validated values and
//! matches wildcard grants against concrete permissions, honoring the
//! `own < group < all` scope hierarchy.
//!
//! # Examples
//!
//! ```
//! use gatekeeper_authz::permission::{matches, Permission, PermissionMap};
//!
//! assert!(matches("chats.*:group", "chats.create:own"));
//! assert!(!matches("chats.*:own", "chats.create:group"));
//!
//! let held = PermissionMap::try_from_entries(vec![("chats.*:own", true)]).unwrap();
//! assert!(held.has_patterns());
//! ```

mod map;
mod matcher;
mod types;


pub use map::PermissionMap;
pub use matcher::matches;
pub use types::{
    Permission, PermissionError, PermissionResult, PermissionScope, SCOPE_SEPARATOR,
    SEGMENT_SEPARATOR, WILDCARD,
};
