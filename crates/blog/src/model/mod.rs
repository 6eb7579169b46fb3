//! Domain types.

use serde::Serializer;

mod recipe;
mod report;
mod story;
mod user;

pub use recipe::{
    Category, FLAG_THRESHOLD, Ingredient, Instruction, LikeToggle, Recipe, RecipeKey,
    UnknownCategory, is_flagged,
};
pub(crate) use recipe::RecipeRow;
pub use report::{NewReport, Report, ReportReason};
pub(crate) use report::ReportRow;
pub use story::{StoryInput, StoryPost};
pub(crate) use story::StoryRow;
pub use user::{REDAZIONE_DISPLAY_NAME, User, UserProfile};
pub(crate) use user::AUTHOR_COLUMNS;

/// URL prefix under which files of the media root are served.
pub const MEDIA_URL: &str = "/media/";

/// Turns a stored media path into its public URL.
#[must_use]
pub fn media_url(path: &str) -> String {
    format!("{MEDIA_URL}{}", path.trim_start_matches('/'))
}

pub(crate) fn serialize_media_url<S>(path: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match path {
        Some(path) if !path.is_empty() => serializer.serialize_some(&media_url(path)),
        _ => serializer.serialize_none(),
    }
}
