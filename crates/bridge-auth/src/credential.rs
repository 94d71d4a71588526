//! Bearer credential decoding.
//!
//! The backend issues a JWT-shaped token. The client never verifies the
//! signature; it only reads the payload to derive the identity shown to the
//! user. The backend is the authority on validity.

use crate::{AuthError, AuthResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity projected from a credential's claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(alias = "sub")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// A decoded bearer credential.
///
/// Holds the raw token for the `Authorization` header alongside the identity
/// derived from its payload. `Debug` never prints the raw token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    raw: String,
    identity: Identity,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Decode `header.payload.signature`.
    ///
    /// Fails with [`AuthError::MalformedCredential`] when the token does not
    /// have three segments, the payload is not base64url JSON, or no subject
    /// claim (`id` or `sub`) is present.
    pub fn decode(raw: &str) -> AuthResult<Self> {
        let raw = raw.trim();
        let mut segments = raw.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(header), Some(payload), Some(_), None) if !header.is_empty() => payload,
            _ => {
                return Err(AuthError::MalformedCredential(
                    "expected three dot-separated segments".to_string(),
                ))
            }
        };

        // Some issuers pad their base64url; the engine expects none.
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::MalformedCredential(format!("payload is not base64url: {}", e)))?;

        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedCredential(format!("payload is not a claim set: {}", e)))?;

        let id = claims
            .id
            .or(claims.sub)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::MalformedCredential("missing subject claim".to_string()))?;

        let expires_at = claims
            .exp
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0));

        Ok(Self {
            raw: raw.to_string(),
            identity: Identity {
                id,
                email: claims.email.unwrap_or_default(),
                name: claims.name.unwrap_or_default(),
                picture: claims.picture.filter(|p| !p.is_empty()),
            },
            expires_at,
        })
    }

    /// The raw token, as sent in `Authorization: Bearer ...`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the `exp` claim is in the past. Tokens without `exp` never
    /// expire locally.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= Utc::now())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("raw", &"[REDACTED]")
            .field("identity", &self.identity)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
