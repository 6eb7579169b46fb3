//! SQLite persistence.
//!
//! [`Store`] owns the connection pool; the operations on each entity live in the
//! submodules as `impl Store` blocks.

use std::str::FromStr;

use sqlx::QueryBuilder;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::Result;

mod likes;
mod recipes;
mod reports;
mod stories;
mod users;

pub use recipes::{RecipeFilter, RecipeInput, RecipeOrder, Visibility};
pub use users::{NewUser, REDAZIONE_EMAIL, UserFlags};

/// Handle to the database. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connects to `url`, creating the database file if needed, and runs pending migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(url, "database ready");
        Ok(store)
    }

    /// A fresh private in-memory database, migrated.
    ///
    /// The pool holds a single connection that is never recycled, since closing it
    /// would drop the database.
    pub async fn memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// `%text%` for a `LIKE ... ESCAPE '\'` match. `%`, `_` and `\` in `text` match themselves.
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Appends `AND (<col> LIKE .. OR ..)` matching `search` as a substring of any column.
fn push_search(query: &mut QueryBuilder<'_, Sqlite>, columns: &[&str], search: &str) {
    let pattern = contains_pattern(search);
    query.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        query
            .push(format!("{column} LIKE "))
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\'");
    }
    query.push(")");
}
