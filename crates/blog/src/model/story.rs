use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::serialize_media_url;
use super::user::{AuthorColumns, UserProfile};

#[derive(Clone, Debug, FromRow)]
pub(crate) struct StoryRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) image: Option<String>,
    pub(crate) role: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) is_published: bool,
    #[sqlx(flatten)]
    pub(crate) author: AuthorColumns,
}

impl From<StoryRow> for StoryPost {
    fn from(row: StoryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            author: row.author.into(),
            image: row.image,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_published: row.is_published,
        }
    }
}

/// An editorial story.
#[derive(Clone, Debug, Serialize)]
pub struct StoryPost {
    /// Primary key.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Author.
    pub author: UserProfile,
    /// Image path relative to the media root, serialized as a media URL.
    #[serde(serialize_with = "serialize_media_url")]
    pub image: Option<String>,
    /// Role of the author in the story, e.g. "Chef".
    pub role: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Visible in public views.
    pub is_published: bool,
}

/// Fields of a story, all optional so the same type serves creation and partial updates.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoryInput {
    /// Title.
    pub title: Option<String>,
    /// Body text.
    pub content: Option<String>,
    /// Role of the author, at most 100 characters.
    pub role: Option<String>,
    /// Image path relative to the media root.
    pub image: Option<String>,
    /// Published flag, `true` for new stories when omitted.
    pub is_published: Option<bool>,
    /// Author of a new story. Defaults to the acting staff member.
    pub author_id: Option<i64>,
}
