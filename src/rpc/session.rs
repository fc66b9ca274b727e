//! Admin sessions.
//!
//! The service has one admin identity, taken from configuration. A successful
//! login returns a bearer token of the form `<expiry>.<nonce>.<mac>`, where the
//! MAC is a keyed BLAKE3 hash over the admin email, expiry and nonce under a
//! key derived from the session secret. Tokens are stateless; rotating the
//! secret invalidates every outstanding session.

use crate::config::AdminConfig;
use crate::{Error, Result};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const KEY_CONTEXT: &str = "liteclient 2024-10 admin session token";

/// Login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Admin email
    pub email: String,
    /// Admin password
    pub password: String,
}

/// An authenticated admin session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Admin email
    pub email: String,
    /// Session expiry
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued session and its bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedSession {
    /// Bearer token to send as `Authorization: Bearer <token>`
    pub token: String,
    /// The session the token stands for
    #[serde(flatten)]
    pub session: Session,
}

/// Issues and verifies admin session tokens.
pub struct SessionManager {
    key: [u8; 32],
    email: String,
    password_hash: blake3::Hash,
    ttl: Duration,
}

impl SessionManager {
    /// Create a manager for the configured admin identity.
    pub fn new(admin: &AdminConfig) -> Result<Self> {
        let ttl = Duration::from_std(admin.session_ttl())
            .map_err(|e| Error::config_key(e.to_string(), "admin.session_ttl_secs"))?;
        Ok(Self {
            key: blake3::derive_key(KEY_CONTEXT, admin.session_secret.as_bytes()),
            email: admin.email.clone(),
            password_hash: blake3::hash(admin.password.as_bytes()),
            ttl,
        })
    }

    /// Check credentials and issue a session.
    pub fn login(&self, credentials: &Credentials) -> Result<IssuedSession> {
        // blake3::Hash equality is constant time.
        let email_ok = blake3::hash(credentials.email.trim().to_lowercase().as_bytes())
            == blake3::hash(self.email.trim().to_lowercase().as_bytes());
        let password_ok = blake3::hash(credentials.password.as_bytes()) == self.password_hash;

        if !(email_ok && password_ok) {
            tracing::warn!(email = %credentials.email, "rejected admin login");
            return Err(Error::unauthorized("Invalid email or password"));
        }
        self.issue(Utc::now())
    }

    /// Issue a session starting at `now`.
    pub fn issue(&self, now: DateTime<Utc>) -> Result<IssuedSession> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::internal("session expiry is out of range"))?;
        let expiry = expires_at.timestamp();
        let nonce = Uuid::new_v4().simple().to_string();
        let mac = self.mac(expiry, &nonce);

        Ok(IssuedSession {
            token: format!("{}.{}.{}", expiry, nonce, mac.to_hex()),
            session: Session {
                email: self.email.clone(),
                expires_at: self.expiry_time(expiry),
            },
        })
    }

    /// Verify a bearer token at `now`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Session> {
        let invalid = || Error::unauthorized("Invalid session token");

        let mut parts = token.trim().splitn(3, '.');
        let (Some(expiry), Some(nonce), Some(mac)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let expiry: i64 = expiry.parse().map_err(|_| invalid())?;
        let mac = blake3::Hash::from_hex(mac).map_err(|_| invalid())?;

        if mac != self.mac(expiry, nonce) {
            return Err(invalid());
        }
        if expiry <= now.timestamp() {
            return Err(Error::unauthorized("Session expired"));
        }

        Ok(Session {
            email: self.email.clone(),
            expires_at: self.expiry_time(expiry),
        })
    }

    fn mac(&self, expiry: i64, nonce: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(self.email.as_bytes());
        hasher.update(b"\0");
        hasher.update(expiry.to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(nonce.as_bytes());
        hasher.finalize()
    }

    fn expiry_time(&self, expiry: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(expiry, 0).single().unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
