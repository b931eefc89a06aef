//! API keys

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::fmt;
use uuid::Uuid;

use super::snapshot::PermissionSnapshot;
use super::Credential;
use crate::types::{CredentialId, PrincipalId};

/// Prefix of every issued secret
pub const SECRET_PREFIX: &str = "gk_";

const SECRET_BYTES: usize = 32;

/// Generate a fresh secret: `gk_` followed by 32 random bytes, base64url
pub(crate) fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", SECRET_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// Digest stored in place of the secret
pub(crate) fn secret_digest(secret: &str) -> blake3::Hash {
    blake3::hash(secret.as_bytes())
}

/// Long-lived credential with a caller-chosen, pre-validated snapshot
///
/// Only the BLAKE3 digest of the secret is kept.
#[derive(Debug, Clone)]
pub struct ApiKey {
    id: CredentialId,
    owner: PrincipalId,
    name: String,
    snapshot: PermissionSnapshot,
    digest: blake3::Hash,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub(crate) fn new(
        owner: impl Into<PrincipalId>,
        name: impl Into<String>,
        snapshot: PermissionSnapshot,
        digest: blake3::Hash,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            name: name.into(),
            snapshot,
            digest,
            created_at,
            expires_at,
        }
    }

    /// Human label given at issuance
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stored digest of the secret
    pub fn digest(&self) -> &blake3::Hash {
        &self.digest
    }

    /// Constant-time check of a presented secret
    pub fn verify_secret(&self, secret: &str) -> bool {
        secret_digest(secret) == self.digest
    }
}

impl Credential for ApiKey {
    fn id(&self) -> CredentialId {
        self.id
    }

    fn principal(&self) -> &str {
        &self.owner
    }

    fn snapshot(&self) -> &PermissionSnapshot {
        &self.snapshot
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// A newly issued key together with its secret
///
/// The secret is only ever available here; `Debug` redacts it.
#[derive(Clone)]
pub struct IssuedApiKey {
    /// Stored key record
    pub key: ApiKey,
    /// Plaintext secret to hand to the caller
    pub secret: String,
}

impl fmt::Debug for IssuedApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedApiKey")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}
