//! Session credentials

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::snapshot::PermissionSnapshot;
use super::Credential;
use crate::error::{AuthzError, Result};
use crate::types::{CredentialId, PrincipalId};

/// Interactive session bound to a permission snapshot
///
/// `expires_at` never moves past `refresh_deadline`: refreshing extends the
/// session inside its window but the snapshot is never re-taken.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    id: CredentialId,
    principal: PrincipalId,
    snapshot: PermissionSnapshot,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    refresh_deadline: DateTime<Utc>,
    refresh_count: u32,
}

impl SessionCredential {
    pub(crate) fn issue(
        principal: impl Into<PrincipalId>,
        snapshot: PermissionSnapshot,
        now: DateTime<Utc>,
        ttl: Duration,
        refresh_window: Duration,
    ) -> Self {
        let refresh_deadline = now + refresh_window;
        Self {
            id: Uuid::new_v4(),
            principal: principal.into(),
            snapshot,
            issued_at: now,
            expires_at: (now + ttl).min(refresh_deadline),
            refresh_deadline,
            refresh_count: 0,
        }
    }

    /// Extend the session by `ttl` from `now`, capped at the refresh deadline
    ///
    /// # Errors
    ///
    /// `CredentialExpired` once `now` is past the refresh deadline.
    pub(crate) fn refresh(&mut self, now: DateTime<Utc>, ttl: Duration) -> Result<()> {
        if now >= self.refresh_deadline {
            return Err(AuthzError::CredentialExpired(self.id));
        }

        self.expires_at = (now + ttl).min(self.refresh_deadline);
        self.refresh_count += 1;
        Ok(())
    }

    /// Issuance time
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Last instant a refresh is accepted
    pub fn refresh_deadline(&self) -> DateTime<Utc> {
        self.refresh_deadline
    }

    /// Number of successful refreshes
    pub fn refresh_count(&self) -> u32 {
        self.refresh_count
    }
}

impl Credential for SessionCredential {
    fn id(&self) -> CredentialId {
        self.id
    }

    fn principal(&self) -> &str {
        &self.principal
    }

    fn snapshot(&self) -> &PermissionSnapshot {
        &self.snapshot
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        Some(self.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionMap;

    fn session(now: DateTime<Utc>) -> SessionCredential {
        SessionCredential::issue(
            "user:alice",
            PermissionSnapshot::new(PermissionMap::new(), now),
            now,
            Duration::minutes(15),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_issue_sets_expiry() {
        let now = Utc::now();
        let session = session(now);
        assert_eq!(session.expires_at(), Some(now + Duration::minutes(15)));
        assert_eq!(session.refresh_deadline(), now + Duration::hours(1));
        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::minutes(15)));
    }

    #[test]
    fn test_refresh_capped_by_window() {
        let now = Utc::now();
        let mut session = session(now);

        session.refresh(now + Duration::minutes(10), Duration::minutes(15)).unwrap();
        assert_eq!(session.expires_at(), Some(now + Duration::minutes(25)));

        session.refresh(now + Duration::minutes(55), Duration::minutes(15)).unwrap();
        assert_eq!(session.expires_at(), Some(now + Duration::hours(1)));
        assert_eq!(session.refresh_count(), 2);
    }

    #[test]
    fn test_refresh_after_lapse_within_window() {
        let now = Utc::now();
        let mut session = session(now);
        let later = now + Duration::minutes(30);
        assert!(session.is_expired_at(later));

        session.refresh(later, Duration::minutes(15)).unwrap();
        assert!(!session.is_expired_at(later));
    }

    #[test]
    fn test_refresh_past_window_fails() {
        let now = Utc::now();
        let mut session = session(now);
        let result = session.refresh(now + Duration::hours(2), Duration::minutes(15));
        assert!(matches!(result, Err(AuthzError::CredentialExpired(id)) if id == session.id()));
    }
}
