use chrono::Utc;
use serde::Deserialize;

use super::{Store, contains_pattern};
use crate::account::normalize_email;
use crate::model::User;
use crate::password::hash_password;
use crate::{Error, Result};

/// Email of the editorial account that owns the mission story.
pub const REDAZIONE_EMAIL: &str = "redazione@sardegnaricette.it";

pub(crate) const DUPLICATE_EMAIL: &str = "Un utente con questa email esiste già.";

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_redazione, date_joined";

/// Data for a new account.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewUser<'a> {
    /// Login email, normalized before storage.
    pub email: &'a str,
    /// Full name.
    pub name: &'a str,
    /// Plain password. `None` creates an account that cannot log in with a password.
    pub password: Option<&'a str>,
    /// Staff flag.
    pub is_staff: bool,
    /// Editorial flag.
    pub is_redazione: bool,
}

/// Account flags an administrator may change. `None` leaves a flag as is.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserFlags {
    /// Active flag.
    pub is_active: Option<bool>,
    /// Staff flag.
    pub is_staff: Option<bool>,
    /// Editorial flag.
    pub is_redazione: Option<bool>,
}

impl Store {
    /// Creates an account. Fails with [`Error::Conflict`] when the email is taken.
    pub async fn create_user(&self, new: NewUser<'_>) -> Result<User> {
        let email = normalize_email(new.email);
        let password_hash = new.password.map(hash_password).transpose()?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash, is_active, is_staff, is_redazione, date_joined) \
             VALUES (?, ?, ?, 1, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(&email)
        .bind(new.name.trim())
        .bind(password_hash)
        .bind(new.is_staff)
        .bind(new.is_redazione)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::on_unique_violation(e, DUPLICATE_EMAIL))?;
        tracing::info!(user_id = user.id, email = %user.email, "user created");
        Ok(user)
    }

    /// Loads an account by id.
    pub async fn user(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound)
    }

    /// Loads an account by email, after normalizing it.
    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Lists accounts, newest first, optionally filtered by a substring of email or name.
    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ?1 IS NULL OR email LIKE ?1 ESCAPE '\\' OR name LIKE ?1 ESCAPE '\\' \
             ORDER BY date_joined DESC, id DESC"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Updates the flags that are set in `flags`.
    pub async fn update_user_flags(&self, id: i64, flags: UserFlags) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = COALESCE(?, is_active), \
             is_staff = COALESCE(?, is_staff), is_redazione = COALESCE(?, is_redazione) \
             WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(flags.is_active)
        .bind(flags.is_staff)
        .bind(flags.is_redazione)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound)?;
        tracing::info!(user_id = id, ?flags, "user flags updated");
        Ok(user)
    }

    /// Returns the editorial account, creating it without a usable password if missing.
    pub async fn redazione_user(&self) -> Result<User> {
        match self.user_by_email(REDAZIONE_EMAIL).await? {
            Some(user) if user.is_redazione => Ok(user),
            Some(user) => {
                self.update_user_flags(
                    user.id,
                    UserFlags {
                        is_redazione: Some(true),
                        ..UserFlags::default()
                    },
                )
                .await
            }
            None => {
                self.create_user(NewUser {
                    email: REDAZIONE_EMAIL,
                    name: "Redazione Sardegna Ricette",
                    is_redazione: true,
                    ..NewUser::default()
                })
                .await
            }
        }
    }
}
