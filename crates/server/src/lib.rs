//! HTTP API of the Ricette recipe blog.
//!
//! [`service`] builds the Salvo service: JSON endpoints under `/api/`, uploaded media
//! under `/media/` and a generated `/sitemap.xml`. Requests authenticate with bearer
//! access tokens; errors are answered as `{"error": <message>, "detail": null}`.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use ricette_blog::Store;
//! use ricette_server::{AppState, Config, service};
//! use salvo::prelude::*;
//!
//! let config = Config::from_env()?;
//! let store = Store::connect(&config.database_url).await?;
//! let acceptor = TcpListener::new(config.listen.clone()).bind().await;
//! Server::new(acceptor).serve(service(AppState::new(store, config))).await;
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod error;
mod form;
mod handlers;
mod routing;
mod state;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use routing::{router, service};
pub use state::AppState;
