//! Credential issuer and in-memory credential registry

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::api_key::{generate_secret, secret_digest, ApiKey, IssuedApiKey};
use super::session::SessionCredential;
use super::snapshot::PermissionSnapshot;
use super::{Credential, CredentialConfig};
use crate::engine::AuthzEngine;
use crate::error::{AuthzError, Result};
use crate::permission::PermissionMap;
use crate::types::CredentialId;

/// Time source for expiry decisions
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Issues, refreshes, revokes and checks credentials
///
/// # Example
///
/// ```rust
/// use gatekeeper_authz::credential::{CredentialConfig, CredentialIssuer};
/// use gatekeeper_authz::groups::{Group, InMemoryGroupStore};
/// use gatekeeper_authz::permission::PermissionMap;
/// use gatekeeper_authz::{AuthzEngine, Credential, PermissionCatalog};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = Arc::new(PermissionCatalog::from_manifest("chats.read:own\n")?);
/// let store = Arc::new(InMemoryGroupStore::new());
/// let grants = PermissionMap::try_from_entries(vec![("chats.*:own", true)])?;
/// store.put_group(Group::new("members", "Members").with_grants(grants)).await;
/// store.add_membership("user:alice", "members").await?;
///
/// let engine = Arc::new(AuthzEngine::new(catalog, store)?);
/// let issuer = CredentialIssuer::new(engine, CredentialConfig::default())?;
///
/// let session = issuer.issue_session("user:alice").await?;
/// assert!(issuer.authorize_session(session.id(), "chats.read:own")?);
/// # Ok(())
/// # }
/// ```
pub struct CredentialIssuer {
    engine: Arc<AuthzEngine>,
    config: CredentialConfig,
    clock: Clock,

    sessions: DashMap<CredentialId, SessionCredential>,
    api_keys: DashMap<CredentialId, ApiKey>,
    /// Secret digest -> key id
    key_index: DashMap<[u8; 32], CredentialId>,
    /// Revoked credential -> revocation time
    revoked: DashMap<CredentialId, DateTime<Utc>>,
}

impl CredentialIssuer {
    /// Create an issuer using the wall clock
    pub fn new(engine: Arc<AuthzEngine>, config: CredentialConfig) -> Result<Self> {
        Self::with_clock(engine, config, system_clock())
    }

    /// Create an issuer with an explicit time source
    pub fn with_clock(engine: Arc<AuthzEngine>, config: CredentialConfig, clock: Clock) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            engine,
            config,
            clock,
            sessions: DashMap::new(),
            api_keys: DashMap::new(),
            key_index: DashMap::new(),
            revoked: DashMap::new(),
        })
    }

    /// The engine credentials are checked with
    pub fn engine(&self) -> &Arc<AuthzEngine> {
        &self.engine
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // Sessions

    /// Issue a session bound to the principal's current expanded permissions
    pub async fn issue_session(&self, principal: &str) -> Result<SessionCredential> {
        let effective = self.engine.effective_permissions(principal).await?;
        let now = self.now();

        let session = SessionCredential::issue(
            principal,
            PermissionSnapshot::new(effective, now),
            now,
            self.config.session_ttl(),
            self.config.refresh_window(),
        );

        info!(
            "Issued session {} for {} with {} permissions",
            session.id(),
            principal,
            session.snapshot().len()
        );

        self.sessions.insert(session.id(), session.clone());
        Ok(session)
    }

    /// Extend a session, keeping its snapshot
    ///
    /// # Errors
    ///
    /// - `CredentialNotFound` for an unknown id
    /// - `CredentialRevoked` if the session was revoked
    /// - `CredentialExpired` past the refresh window
    pub fn refresh_session(&self, id: CredentialId) -> Result<SessionCredential> {
        if self.revoked.contains_key(&id) {
            return Err(AuthzError::CredentialRevoked(id));
        }

        let now = self.now();
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AuthzError::CredentialNotFound(id.to_string()))?;

        session.refresh(now, self.config.session_ttl())?;
        debug!("Refreshed session {} until {:?}", id, session.expires_at());

        Ok(session.clone())
    }

    /// Look up a session
    pub fn get_session(&self, id: CredentialId) -> Option<SessionCredential> {
        self.sessions.get(&id).map(|s| s.clone())
    }

    /// Check a session against a concrete requirement
    pub fn authorize_session(&self, id: CredentialId, required: &str) -> Result<bool> {
        let session = self
            .get_session(id)
            .ok_or_else(|| AuthzError::CredentialNotFound(id.to_string()))?;

        self.authorize_credential(&session, required)
    }

    // API keys

    /// Issue an API key for `owner` carrying `requested`
    ///
    /// The request is checked against the owner's current permissions; the
    /// stored snapshot is its expansion.
    ///
    /// # Errors
    ///
    /// `PermissionEscalation` listing every requested permission the owner
    /// does not hold.
    pub async fn issue_api_key(
        &self,
        owner: &str,
        name: &str,
        requested: &PermissionMap,
    ) -> Result<IssuedApiKey> {
        let validation = self.engine.validate_for_principal(owner, requested).await?;
        if !validation.is_ok() {
            warn!(
                "Rejected API key '{}' for {}: {} permissions exceed owner rights",
                name,
                owner,
                validation.violations.len()
            );
        }
        validation.into_result()?;

        let now = self.now();
        let snapshot = PermissionSnapshot::new(self.engine.expand_map(requested), now);
        let expires_at = self.config.api_key_ttl().map(|ttl| now + ttl);

        let secret = generate_secret();
        let digest = secret_digest(&secret);
        let key = ApiKey::new(owner, name, snapshot, digest, now, expires_at);

        info!(
            "Issued API key {} '{}' for {} with {} permissions",
            key.id(),
            name,
            owner,
            key.snapshot().len()
        );

        self.key_index.insert(*digest.as_bytes(), key.id());
        self.api_keys.insert(key.id(), key.clone());

        Ok(IssuedApiKey { key, secret })
    }

    /// Resolve a presented secret to a usable key
    ///
    /// # Errors
    ///
    /// - `CredentialNotFound` for an unknown secret
    /// - `CredentialRevoked` or `CredentialExpired` for unusable keys
    pub fn verify_api_key(&self, secret: &str) -> Result<ApiKey> {
        let digest = secret_digest(secret);
        let key = self
            .key_index
            .get(digest.as_bytes())
            .and_then(|id| self.api_keys.get(id.value()).map(|k| k.clone()))
            .filter(|key| key.verify_secret(secret))
            .ok_or_else(|| AuthzError::CredentialNotFound("api key".to_string()))?;

        self.ensure_usable(&key)?;
        Ok(key)
    }

    /// Check a presented API key secret against a concrete requirement
    pub fn authorize_api_key(&self, secret: &str, required: &str) -> Result<bool> {
        let key = self.verify_api_key(secret)?;
        Ok(self.engine.authorize(key.snapshot().permissions(), required))
    }

    /// Look up an API key by id
    pub fn get_api_key(&self, id: CredentialId) -> Option<ApiKey> {
        self.api_keys.get(&id).map(|k| k.clone())
    }

    /// All API keys owned by a principal
    pub fn list_api_keys(&self, owner: &str) -> Vec<ApiKey> {
        let mut keys: Vec<ApiKey> = self
            .api_keys
            .iter()
            .filter(|entry| entry.principal() == owner)
            .map(|entry| entry.value().clone())
            .collect();
        keys.sort_by_key(|key| key.created_at());
        keys
    }

    // Revocation

    /// Revoke a session or API key
    pub fn revoke(&self, id: CredentialId) -> Result<()> {
        if !self.sessions.contains_key(&id) && !self.api_keys.contains_key(&id) {
            return Err(AuthzError::CredentialNotFound(id.to_string()));
        }

        self.revoked.insert(id, self.now());
        info!("Revoked credential {}", id);
        Ok(())
    }

    /// Whether a credential was revoked
    pub fn is_revoked(&self, id: CredentialId) -> bool {
        self.revoked.contains_key(&id)
    }

    /// Drop credentials that can never be used again
    ///
    /// Sessions past their refresh window and expired keys go, along with
    /// their revocation entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.now();
        let before = self.sessions.len() + self.api_keys.len();

        self.sessions.retain(|_, session| now < session.refresh_deadline());
        self.api_keys.retain(|_, key| !key.is_expired_at(now));
        self.key_index.retain(|_, id| self.api_keys.contains_key(id));
        self.revoked
            .retain(|id, _| self.sessions.contains_key(id) || self.api_keys.contains_key(id));

        let removed = before.saturating_sub(self.sessions.len() + self.api_keys.len());
        if removed > 0 {
            info!("Purged {} expired credentials", removed);
        }
        removed
    }

    fn ensure_usable<C: Credential>(&self, credential: &C) -> Result<()> {
        if self.revoked.contains_key(&credential.id()) {
            return Err(AuthzError::CredentialRevoked(credential.id()));
        }

        if credential.is_expired_at(self.now()) {
            return Err(AuthzError::CredentialExpired(credential.id()));
        }

        Ok(())
    }

    fn authorize_credential<C: Credential>(&self, credential: &C, required: &str) -> Result<bool> {
        self.ensure_usable(credential)?;
        Ok(self.engine.authorize(credential.snapshot().permissions(), required))
    }
}
