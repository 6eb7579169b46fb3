//! Registration, login and token refresh.

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::model::{User, UserProfile};
use crate::password::{validate_strength, verify_password};
use crate::store::{NewUser, Store};
use crate::token::{TokenIssuer, TokenKind, TokenPair};
use crate::{Error, Result};

pub(crate) const REQUIRED: &str = "Questo campo è obbligatorio.";
const INVALID_EMAIL: &str = "Inserisci un indirizzo email valido.";
const PASSWORD_MISMATCH: &str = "Password fields didn't match.";
const MISSING_CREDENTIALS: &str = "Email and password are required";
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const DISABLED_ACCOUNT: &str = "User account is disabled";

/// Trims `email` and lower-cases its domain part.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_owned(),
    }
}

/// Body of a registration request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    /// Login email.
    pub email: String,
    /// Full name.
    pub name: String,
    /// Password.
    pub password: String,
    /// Password confirmation.
    pub password2: String,
}

impl Registration {
    /// Checks fields in order, returning the first failure.
    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(Error::validation("email", REQUIRED));
        }
        if !EmailAddress::is_valid(email) {
            return Err(Error::validation("email", INVALID_EMAIL));
        }
        if self.name.trim().is_empty() {
            return Err(Error::validation("name", REQUIRED));
        }
        if self.password.is_empty() {
            return Err(Error::validation("password", REQUIRED));
        }
        validate_strength(&self.password, &[email, self.name.trim()])?;
        if self.password2.is_empty() {
            return Err(Error::validation("password2", REQUIRED));
        }
        if self.password != self.password2 {
            return Err(Error::validation("password", PASSWORD_MISMATCH));
        }
        Ok(())
    }
}

/// Body of a login request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Login email.
    pub email: Option<String>,
    /// Password.
    pub password: Option<String>,
}

/// An authenticated user with a fresh token pair.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    /// The account.
    pub user: UserProfile,
    /// Tokens.
    pub tokens: TokenPair,
}

impl Store {
    /// Validates `registration`, creates the account and opens a session for it.
    pub async fn register(&self, issuer: &TokenIssuer, registration: &Registration) -> Result<Session> {
        registration.validate()?;
        let user = self
            .create_user(NewUser {
                email: &registration.email,
                name: &registration.name,
                password: Some(&registration.password),
                ..NewUser::default()
            })
            .await?;
        Ok(Session {
            tokens: issuer.issue_pair(user.id)?,
            user: user.profile(),
        })
    }

    /// Checks `credentials` and opens a session.
    pub async fn login(&self, issuer: &TokenIssuer, credentials: &Credentials) -> Result<Session> {
        let (Some(email), Some(password)) = (
            credentials.email.as_deref().filter(|s| !s.trim().is_empty()),
            credentials.password.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(Error::validation("email", MISSING_CREDENTIALS));
        };

        let user = self
            .user_by_email(email)
            .await?
            .filter(|user| {
                user.password_hash
                    .as_deref()
                    .is_some_and(|hash| verify_password(password, hash))
            })
            .ok_or_else(|| {
                tracing::info!(email, "failed login");
                Error::Unauthorized(INVALID_CREDENTIALS.into())
            })?;
        if !user.is_active {
            return Err(Error::Unauthorized(DISABLED_ACCOUNT.into()));
        }
        tracing::info!(user_id = user.id, "login");
        Ok(Session {
            tokens: issuer.issue_pair(user.id)?,
            user: user.profile(),
        })
    }

    /// Exchanges a refresh token for a new token pair.
    pub async fn refresh_tokens(&self, issuer: &TokenIssuer, refresh: &str) -> Result<TokenPair> {
        let claims = issuer.verify(refresh, TokenKind::Refresh)?;
        let user = self.active_user(&claims.sub).await?;
        issuer.issue_pair(user.id)
    }

    /// Resolves the subject of a verified token to an active account.
    ///
    /// Unknown subjects and disabled accounts are [`Error::Unauthorized`].
    pub async fn active_user(&self, subject: &str) -> Result<User> {
        let unauthorized = || Error::Unauthorized("Utente non trovato o disattivato.".into());
        let id: i64 = subject.parse().map_err(|_| unauthorized())?;
        match self.user(id).await {
            Ok(user) if user.is_active => Ok(user),
            Ok(_) | Err(Error::NotFound) => Err(unauthorized()),
            Err(e) => Err(e),
        }
    }
}
