//! Domain and persistence layer of the Ricette recipe blog.
//!
//! Users publish recipes with ordered ingredient and instruction lists, like them,
//! and report them. A recipe with more than [`FLAG_THRESHOLD`] reports disappears
//! from public views until reports are removed. The editorial staff publishes
//! stories and may feature a single recipe at a time.
//!
//! All state lives in SQLite behind [`Store`]. User-submitted text passes through the
//! [`ricette_moderation`] filter before it is stored.
//!
//! ```no_run
//! # async fn demo() -> ricette_blog::Result<()> {
//! use ricette_blog::{RecipeFilter, Store};
//!
//! let store = Store::connect("sqlite://ricette.db?mode=rwc").await?;
//! for recipe in store.list_recipes(&RecipeFilter::default(), None).await? {
//!     println!("{} ({} likes)", recipe.title, recipe.likes_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod account;
mod error;
pub mod model;
pub mod password;
pub mod slug;
mod store;
pub mod token;
pub mod upload;

pub use account::{Credentials, Registration, Session};
pub use error::{Error, Result};
pub use model::{
    Category, FLAG_THRESHOLD, LikeToggle, NewReport, Recipe, RecipeKey, Report, ReportReason,
    StoryInput, StoryPost, User, UserProfile,
};
pub use store::{
    NewUser, REDAZIONE_EMAIL, RecipeFilter, RecipeInput, RecipeOrder, Store, UserFlags, Visibility,
};
pub use token::{Claims, TokenIssuer, TokenKind, TokenPair};
