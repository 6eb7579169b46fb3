use std::sync::Arc;

use ricette_blog::{Store, TokenIssuer};
use salvo::Depot;

use crate::config::Config;
use crate::error::ApiError;

/// Everything a handler needs, injected into the depot by `affix_state`.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database handle.
    pub store: Store,
    /// Signs and verifies JWTs.
    pub tokens: Arc<TokenIssuer>,
    /// Server settings.
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the state from an open store and the loaded configuration.
    #[must_use]
    pub fn new(store: Store, config: Config) -> Self {
        let tokens = TokenIssuer::new(
            config.jwt_secret.as_bytes(),
            config.access_ttl,
            config.refresh_ttl,
        );
        Self {
            store,
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        }
    }

    pub(crate) fn from_depot(depot: &Depot) -> Result<Self, ApiError> {
        depot.obtain::<Self>().cloned().map_err(|_| {
            tracing::error!("application state missing from depot");
            ApiError::internal()
        })
    }
}
