//! Credential issuance
//!
//! Credentials carry a [`PermissionSnapshot`] taken at issuance and are
//! authorized against that snapshot only:
//!
//! - sessions snapshot the principal's expanded group permissions
//! - API keys snapshot a caller-chosen map, accepted only if it is a subset
//!   of the owner's current permissions
//!
//! Later group changes never reach an issued credential. Revocation or
//! expiry are the only ways to take rights away from one.

pub mod api_key;
pub mod issuer;
pub mod session;
pub mod snapshot;

pub use api_key::{ApiKey, IssuedApiKey, SECRET_PREFIX};
pub use issuer::{system_clock, Clock, CredentialIssuer};
pub use session::SessionCredential;
pub use snapshot::PermissionSnapshot;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, Result};
use crate::types::CredentialId;

/// Upper bound for any configured lifetime (ten years)
const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Common view over issued credentials
pub trait Credential {
    /// Credential identifier, used for revocation
    fn id(&self) -> CredentialId;

    /// Principal the credential acts for
    fn principal(&self) -> &str;

    /// Frozen permissions
    fn snapshot(&self) -> &PermissionSnapshot;

    /// Expiry, `None` for credentials that never expire
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    /// Whether the credential is expired at `now`
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(false, |expires_at| now >= expires_at)
    }
}

/// Credential lifetimes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Session lifetime, and the extension granted by each refresh
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Time after issuance past which a session can no longer be refreshed
    #[serde(default = "default_refresh_window")]
    pub refresh_window_secs: u64,

    /// API key lifetime in days, 0 for keys that never expire
    #[serde(default = "default_api_key_ttl")]
    pub api_key_ttl_days: u32,
}

fn default_session_ttl() -> u64 { 3600 }
fn default_refresh_window() -> u64 { 7 * 24 * 3600 }
fn default_api_key_ttl() -> u32 { 90 }

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            refresh_window_secs: default_refresh_window(),
            api_key_ttl_days: default_api_key_ttl(),
        }
    }
}

impl CredentialConfig {
    /// Validate lifetimes
    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_secs == 0 {
            return Err(AuthzError::Config("session_ttl_secs must be positive".to_string()));
        }

        if self.refresh_window_secs < self.session_ttl_secs {
            return Err(AuthzError::Config(
                "refresh_window_secs must be at least session_ttl_secs".to_string(),
            ));
        }

        if self.refresh_window_secs > MAX_LIFETIME_SECS {
            return Err(AuthzError::Config(format!(
                "refresh_window_secs must not exceed {}",
                MAX_LIFETIME_SECS
            )));
        }

        if u64::from(self.api_key_ttl_days) * 24 * 3600 > MAX_LIFETIME_SECS {
            return Err(AuthzError::Config(format!(
                "api_key_ttl_days must not exceed {}",
                MAX_LIFETIME_SECS / (24 * 3600)
            )));
        }

        Ok(())
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs.min(MAX_LIFETIME_SECS) as i64)
    }

    /// Refresh window
    pub fn refresh_window(&self) -> Duration {
        Duration::seconds(self.refresh_window_secs.min(MAX_LIFETIME_SECS) as i64)
    }

    /// API key lifetime
    pub fn api_key_ttl(&self) -> Option<Duration> {
        match self.api_key_ttl_days {
            0 => None,
            days => Some(Duration::days(i64::from(days))),
        }
    }
}
