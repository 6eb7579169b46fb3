use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::{AuthorColumns, UserProfile};
use super::serialize_media_url;

/// A recipe with more than this many reports is hidden from public views.
pub const FLAG_THRESHOLD: i64 = 5;

/// Returns `true` when `reports_count` hides a recipe from public views.
#[inline]
#[must_use]
pub fn is_flagged(reports_count: i64) -> bool {
    reports_count > FLAG_THRESHOLD
}

/// Recipe category.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Breads, focacce and pizzas.
    #[serde(rename = "Bread & Pizza")]
    BreadAndPizza,
    /// First courses.
    #[serde(rename = "Pasta Dishes")]
    PastaDishes,
    /// Meat and poultry.
    #[serde(rename = "Meat & Poultry")]
    MeatAndPoultry,
    /// Desserts.
    #[serde(rename = "Desserts")]
    Desserts,
    /// Fish and seafood.
    #[serde(rename = "Fish")]
    Fish,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 5] = [
        Self::BreadAndPizza,
        Self::PastaDishes,
        Self::MeatAndPoultry,
        Self::Desserts,
        Self::Fish,
    ];

    /// Wire and storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BreadAndPizza => "Bread & Pizza",
            Self::PastaDishes => "Pasta Dishes",
            Self::MeatAndPoultry => "Meat & Poultry",
            Self::Desserts => "Desserts",
            Self::Fish => "Fish",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string is not a known category.
#[derive(Clone, Debug, thiserror::Error)]
#[error("\"{0}\" non è una scelta valida.")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One ingredient line.
#[derive(Clone, Debug, FromRow, Serialize, PartialEq, Eq)]
pub struct Ingredient {
    /// Primary key.
    pub id: i64,
    /// Owning recipe.
    #[serde(skip)]
    pub recipe_id: i64,
    /// Free text, e.g. "500 g di semola".
    pub name: String,
    /// Position in the list, ascending.
    #[sqlx(rename = "position")]
    #[serde(rename = "order")]
    pub order: i64,
}

/// One preparation step.
#[derive(Clone, Debug, FromRow, Serialize, PartialEq, Eq)]
pub struct Instruction {
    /// Primary key.
    pub id: i64,
    /// Owning recipe.
    #[serde(skip)]
    pub recipe_id: i64,
    /// Free text of the step.
    pub step: String,
    /// Position in the list, ascending.
    #[sqlx(rename = "position")]
    #[serde(rename = "order")]
    pub order: i64,
}

/// Recipe row joined with its author and aggregate counts.
#[derive(Clone, Debug, FromRow)]
pub(crate) struct RecipeRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) description: String,
    pub(crate) final_comment: Option<String>,
    #[sqlx(try_from = "String")]
    pub(crate) category: Category,
    pub(crate) prep_time: i32,
    pub(crate) image: Option<String>,
    pub(crate) gluten_free: bool,
    pub(crate) lactose_free: bool,
    pub(crate) is_sardinian: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) is_published: bool,
    pub(crate) is_featured: bool,
    pub(crate) likes_count: i64,
    pub(crate) reports_count: i64,
    pub(crate) is_liked: bool,
    #[sqlx(flatten)]
    pub(crate) author: AuthorColumns,
}

impl RecipeRow {
    pub(crate) fn into_recipe(self, ingredients: Vec<Ingredient>, instructions: Vec<Instruction>) -> Recipe {
        Recipe {
            id: self.id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            final_comment: self.final_comment,
            category: self.category,
            prep_time: self.prep_time,
            author: self.author.into(),
            image: self.image,
            gluten_free: self.gluten_free,
            lactose_free: self.lactose_free,
            is_sardinian: self.is_sardinian,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_published: self.is_published,
            is_featured: self.is_featured,
            ingredients,
            instructions,
            likes_count: self.likes_count,
            reports_count: self.reports_count,
            is_flagged: is_flagged(self.reports_count),
            is_liked: self.is_liked,
        }
    }
}

/// A recipe as returned to clients, with its lists, author and counters.
#[derive(Clone, Debug, Serialize)]
pub struct Recipe {
    /// Primary key.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Unique slug, assigned at creation.
    pub slug: String,
    /// Description.
    pub description: String,
    /// Closing remarks of the author.
    pub final_comment: Option<String>,
    /// Category.
    pub category: Category,
    /// Preparation time in minutes.
    pub prep_time: i32,
    /// Author.
    pub author: UserProfile,
    /// Image path relative to the media root, serialized as a media URL.
    #[serde(serialize_with = "serialize_media_url")]
    pub image: Option<String>,
    /// Gluten free.
    pub gluten_free: bool,
    /// Lactose free.
    pub lactose_free: bool,
    /// Traditional Sardinian recipe.
    pub is_sardinian: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Visible in public views.
    pub is_published: bool,
    /// Pinned first in listings. At most one recipe has it set.
    pub is_featured: bool,
    /// Ingredients by ascending `order`.
    pub ingredients: Vec<Ingredient>,
    /// Instructions by ascending `order`.
    pub instructions: Vec<Instruction>,
    /// Number of likes.
    pub likes_count: i64,
    /// Number of reports.
    pub reports_count: i64,
    /// Hidden from public views because of reports.
    pub is_flagged: bool,
    /// Whether the viewer likes the recipe. Always `false` for anonymous viewers.
    pub is_liked: bool,
}

impl Recipe {
    /// Whether the recipe shows up in public listings and detail views.
    #[must_use]
    pub fn is_publicly_visible(&self) -> bool {
        self.is_published && !self.is_flagged
    }
}

/// Identifies a recipe by numeric id or by slug.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecipeKey {
    /// Primary key.
    Id(i64),
    /// Slug.
    Slug(String),
}

impl RecipeKey {
    /// All-digit keys are ids, everything else is a slug.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        let key = key.trim();
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = key.parse() {
                return Self::Id(id);
            }
        }
        Self::Slug(key.to_owned())
    }
}

impl From<i64> for RecipeKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for RecipeKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

impl Display for RecipeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Result of a like toggle.
#[derive(Copy, Clone, Debug, Serialize, PartialEq, Eq)]
pub struct LikeToggle {
    /// Whether the caller now likes the recipe.
    pub liked: bool,
    /// Likes after the toggle.
    pub likes_count: i64,
}
