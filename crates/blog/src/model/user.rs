use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Public name shown for editorial accounts.
pub const REDAZIONE_DISPLAY_NAME: &str = "Redazione";

/// A stored account.
#[derive(Clone, Debug, FromRow)]
pub struct User {
    /// Primary key.
    pub id: i64,
    /// Unique login identity.
    pub email: String,
    /// Full name.
    pub name: String,
    /// Argon2 PHC string. `None` for accounts that cannot log in with a password.
    pub password_hash: Option<String>,
    /// Disabled accounts cannot log in or use existing tokens.
    pub is_active: bool,
    /// Staff accounts may use the admin API.
    pub is_staff: bool,
    /// Editorial account: its content is attributed to the "Redazione".
    pub is_redazione: bool,
    /// Registration time.
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Public display name: "Redazione" for editorial accounts, else the user's name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        display_name(self.is_redazione, &self.name)
    }

    /// Serializable view of the account.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            display_name: self.display_name().to_owned(),
            name: self.name.clone(),
            is_redazione: self.is_redazione,
            is_staff: self.is_staff,
            date_joined: self.date_joined,
            is_active: self.is_active,
        }
    }
}

fn display_name(is_redazione: bool, name: &str) -> &str {
    if is_redazione {
        REDAZIONE_DISPLAY_NAME
    } else {
        name
    }
}

/// The representation of an account sent to clients.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Primary key.
    pub id: i64,
    /// Login email.
    pub email: String,
    /// Full name.
    pub name: String,
    /// Name to show publicly.
    pub display_name: String,
    /// Editorial account flag.
    pub is_redazione: bool,
    /// Staff flag.
    pub is_staff: bool,
    /// Registration time.
    pub date_joined: DateTime<Utc>,
    /// Active flag.
    pub is_active: bool,
}

/// Author columns joined onto recipe, story and report queries.
///
/// Queries select them through [`AUTHOR_COLUMNS`] with the users table aliased as `u`.
#[derive(Clone, Debug, FromRow)]
pub(crate) struct AuthorColumns {
    author_id: i64,
    author_email: String,
    author_name: String,
    author_is_active: bool,
    author_is_staff: bool,
    author_is_redazione: bool,
    author_date_joined: DateTime<Utc>,
}

pub(crate) const AUTHOR_COLUMNS: &str = "u.id AS author_id, u.email AS author_email, \
     u.name AS author_name, u.is_active AS author_is_active, u.is_staff AS author_is_staff, \
     u.is_redazione AS author_is_redazione, u.date_joined AS author_date_joined";

impl From<AuthorColumns> for UserProfile {
    fn from(cols: AuthorColumns) -> Self {
        Self {
            id: cols.author_id,
            display_name: display_name(cols.author_is_redazione, &cols.author_name).to_owned(),
            email: cols.author_email,
            name: cols.author_name,
            is_redazione: cols.author_is_redazione,
            is_staff: cols.author_is_staff,
            date_joined: cols.author_date_joined,
            is_active: cols.author_is_active,
        }
    }
}
