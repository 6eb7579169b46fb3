//! Signed access and refresh tokens.

use std::fmt::{self, Debug, Formatter};

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Default lifetime of access tokens.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::minutes(60);
/// Default lifetime of refresh tokens.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::days(7);

/// What a token may be used for.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Authenticates API requests.
    Access,
    /// Obtains a new token pair.
    Refresh,
}

/// JWT claims.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id, as a string.
    pub sub: String,
    /// Token kind.
    pub token_type: TokenKind,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

impl Claims {
    /// The user id carried by `sub`, if it is numeric.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Access and refresh tokens issued together.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    /// Refresh token.
    pub refresh: String,
    /// Access token.
    pub access: String,
}

/// Issues and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Debug for TokenIssuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer signing with `secret`.
    #[must_use]
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Signs a token of `kind` for `user_id`.
    pub fn issue(&self, kind: TokenKind, user_id: i64) -> Result<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            token_type: kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Signs a fresh access and refresh token for `user_id`.
    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair> {
        Ok(TokenPair {
            refresh: self.issue(TokenKind::Refresh, user_id)?,
            access: self.issue(TokenKind::Access, user_id)?,
        })
    }

    /// Verifies `token` and checks that it is of the `expected` kind.
    ///
    /// Any failure is reported as [`Error::Unauthorized`].
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected token");
                Error::Unauthorized("Token non valido o scaduto.".into())
            })?
            .claims;
        if claims.token_type != expected {
            return Err(Error::Unauthorized("Tipo di token non valido.".into()));
        }
        Ok(claims)
    }
}
