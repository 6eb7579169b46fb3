use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use ricette_moderation::{Field, validate_all, validate_field};
use serde::Deserialize;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use super::{Store, push_search};
use crate::account::REQUIRED;
use crate::model::{
    AUTHOR_COLUMNS, Category, FLAG_THRESHOLD, Ingredient, Instruction, Recipe, RecipeKey, RecipeRow,
    User,
};
use crate::slug::{slugify, with_suffix};
use crate::{Error, Result};

const MAX_TITLE_LEN: usize = 255;
const BLANK: &str = "Questo campo non può essere vuoto.";
const TITLE_TOO_LONG: &str = "Assicurati che questo campo non abbia più di 255 caratteri.";
const PREP_TIME_NOT_POSITIVE: &str = "Il tempo di preparazione deve essere maggiore di zero.";
const EDIT_FORBIDDEN: &str = "Non hai il permesso di modificare questa ricetta.";
const DELETE_FORBIDDEN: &str = "Non hai il permesso di eliminare questa ricetta.";
const DUPLICATE_SLUG: &str = "Esiste già una ricetta con un titolo simile. Modifica il titolo e riprova.";

/// Which recipes a listing may return.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Visibility {
    /// Published and not flagged. The featured recipe is pinned first.
    #[default]
    Public,
    /// Every recipe of one author, in any state.
    Author(i64),
    /// Every recipe.
    All,
}

/// Sort order of a listing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RecipeOrder {
    /// Newest first.
    #[default]
    Recent,
    /// Most liked first, then newest.
    MostLiked,
}

/// Filters of a recipe listing. The default lists public recipes, newest first.
#[derive(Clone, Debug, Default)]
pub struct RecipeFilter {
    /// Which recipes are candidates.
    pub visibility: Visibility,
    /// Case-insensitive substring of title, description, category or author name.
    pub search: Option<String>,
    /// Exact category wire name.
    pub category: Option<String>,
    /// Keep only recipes whose flag equals the value.
    pub gluten_free: Option<bool>,
    /// Keep only recipes whose flag equals the value.
    pub lactose_free: Option<bool>,
    /// Keep only recipes whose flag equals the value.
    pub is_sardinian: Option<bool>,
    /// Keep only recipes by editorial accounts.
    pub redazione_only: bool,
    /// Sort order.
    pub order: RecipeOrder,
}

/// Fields of a recipe submission. Creation requires title, description, category,
/// prep time and both lists; updates change only the fields that are present.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecipeInput {
    /// Title.
    pub title: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Closing remarks. An empty string clears them.
    pub final_comment: Option<String>,
    /// Category wire name.
    pub category: Option<String>,
    /// Preparation time in minutes.
    pub prep_time: Option<i32>,
    /// Gluten free.
    pub gluten_free: Option<bool>,
    /// Lactose free.
    pub lactose_free: Option<bool>,
    /// Traditional Sardinian recipe.
    pub is_sardinian: Option<bool>,
    /// Visible in public views.
    pub is_published: Option<bool>,
    /// Ingredient lines. Blank lines are dropped, the others keep their index as order.
    pub ingredients: Option<Vec<String>>,
    /// Instruction lines, handled like ingredients.
    pub instructions: Option<Vec<String>>,
    /// Stored image path, set by the upload layer rather than the client.
    #[serde(skip)]
    pub image: Option<String>,
}

impl RecipeInput {
    /// Checks the fields in submission order and returns the first failure.
    ///
    /// With `creating` set, missing required fields are failures too.
    pub fn validate(&self, creating: bool) -> Result<()> {
        let require = |field: &'static str, present: bool| {
            if creating && !present {
                Err(Error::validation(field, REQUIRED))
            } else {
                Ok(())
            }
        };

        require("title", self.title.is_some())?;
        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(Error::validation("title", BLANK));
            }
            if title.chars().count() > MAX_TITLE_LEN {
                return Err(Error::validation("title", TITLE_TOO_LONG));
            }
            validate_field(Field::Title, title)?;
        }
        require("description", self.description.is_some())?;
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(Error::validation("description", BLANK));
            }
            validate_field(Field::Description, description)?;
        }
        if let Some(comment) = &self.final_comment {
            validate_field(Field::Content, comment)?;
        }
        require("category", self.category.is_some())?;
        if let Some(category) = &self.category {
            category
                .parse::<Category>()
                .map_err(|e| Error::validation("category", e.to_string()))?;
        }
        require("prep_time", self.prep_time.is_some())?;
        if self.prep_time.is_some_and(|minutes| minutes <= 0) {
            return Err(Error::validation("prep_time", PREP_TIME_NOT_POSITIVE));
        }
        require("ingredients", self.ingredients.is_some())?;
        require("instructions", self.instructions.is_some())?;
        if let Some(ingredients) = &self.ingredients {
            validate_all(Field::Ingredients, non_blank(ingredients))?;
        }
        if let Some(instructions) = &self.instructions {
            validate_all(Field::Instructions, non_blank(instructions))?;
        }
        Ok(())
    }
}

fn non_blank(lines: &[String]) -> impl Iterator<Item = &str> {
    lines.iter().map(|line| line.trim()).filter(|line| !line.is_empty())
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or_else(|| Error::validation(field, REQUIRED))
}

fn select_recipes(viewer: Option<i64>) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new(
        "SELECT r.id, r.title, r.slug, r.description, r.final_comment, r.category, r.prep_time, \
         r.image, r.gluten_free, r.lactose_free, r.is_sardinian, r.created_at, r.updated_at, \
         r.is_published, r.is_featured, \
         (SELECT COUNT(*) FROM recipe_likes l WHERE l.recipe_id = r.id) AS likes_count, \
         (SELECT COUNT(*) FROM recipe_reports p WHERE p.recipe_id = r.id) AS reports_count, \
         EXISTS (SELECT 1 FROM recipe_likes l WHERE l.recipe_id = r.id AND l.user_id = ",
    );
    query.push_bind(viewer);
    query.push(format!(
        ") AS is_liked, {AUTHOR_COLUMNS} FROM recipes r JOIN users u ON u.id = r.author_id WHERE 1 = 1"
    ));
    query
}

fn push_publicly_visible(query: &mut QueryBuilder<'_, Sqlite>) {
    query.push(
        " AND r.is_published = 1 \
         AND (SELECT COUNT(*) FROM recipe_reports p WHERE p.recipe_id = r.id) <= ",
    );
    query.push_bind(FLAG_THRESHOLD);
}

fn push_key(query: &mut QueryBuilder<'_, Sqlite>, key: &RecipeKey) {
    match key {
        RecipeKey::Id(id) => query.push(" AND r.id = ").push_bind(*id),
        RecipeKey::Slug(slug) => query.push(" AND r.slug = ").push_bind(slug.clone()),
    };
}

async fn slug_taken(conn: &mut SqliteConnection, slug: &str) -> Result<bool> {
    let taken = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM recipes WHERE slug = ?)")
        .bind(slug)
        .fetch_one(&mut *conn)
        .await?;
    Ok(taken)
}

/// The slug of `title`, or the first free `-n` variant of it. Each candidate is looked
/// up on its own since long slugs lose characters to the suffix.
async fn unique_slug(conn: &mut SqliteConnection, title: &str) -> Result<String> {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut n = 0;
    while slug_taken(conn, &candidate).await? {
        n += 1;
        candidate = with_suffix(&base, n);
    }
    Ok(candidate)
}

#[derive(Copy, Clone)]
enum Lines {
    Ingredients,
    Instructions,
}

impl Lines {
    fn table(self) -> &'static str {
        match self {
            Self::Ingredients => "ingredients",
            Self::Instructions => "instructions",
        }
    }

    fn text_column(self) -> &'static str {
        match self {
            Self::Ingredients => "name",
            Self::Instructions => "step",
        }
    }
}

/// Replaces the lines of a recipe. Blank entries are skipped but still consume their index.
async fn replace_lines(
    conn: &mut SqliteConnection,
    lines: Lines,
    recipe_id: i64,
    entries: &[String],
) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE recipe_id = ?", lines.table()))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    let kept: Vec<(i64, &str)> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| (index as i64, entry.trim()))
        .filter(|(_, entry)| !entry.is_empty())
        .collect();
    if kept.is_empty() {
        return Ok(());
    }
    let mut insert = QueryBuilder::<Sqlite>::new(format!(
        "INSERT INTO {} (recipe_id, {}, position) ",
        lines.table(),
        lines.text_column()
    ));
    insert.push_values(kept, |mut row, (position, text)| {
        row.push_bind(recipe_id).push_bind(text).push_bind(position);
    });
    insert.build().execute(&mut *conn).await?;
    Ok(())
}

impl Store {
    async fn children<T>(&self, select: &str, ids: &[i64]) -> Result<HashMap<i64, Vec<T>>>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
        T: HasRecipe,
    {
        let mut grouped: HashMap<i64, Vec<T>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }
        let mut query = QueryBuilder::<Sqlite>::new(select);
        query.push(" WHERE recipe_id IN (");
        let mut list = query.separated(", ");
        for id in ids {
            list.push_bind(*id);
        }
        list.push_unseparated(") ORDER BY recipe_id, position, id");
        for child in query.build_query_as::<T>().fetch_all(&self.pool).await? {
            grouped.entry(child.recipe_id()).or_default().push(child);
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<RecipeRow>) -> Result<Vec<Recipe>> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut ingredients = self
            .children::<Ingredient>("SELECT id, recipe_id, name, position FROM ingredients", &ids)
            .await?;
        let mut instructions = self
            .children::<Instruction>("SELECT id, recipe_id, step, position FROM instructions", &ids)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_recipe(
                    ingredients.remove(&id).unwrap_or_default(),
                    instructions.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    /// Lists recipes matching `filter`. `viewer` drives the `is_liked` field.
    pub async fn list_recipes(&self, filter: &RecipeFilter, viewer: Option<i64>) -> Result<Vec<Recipe>> {
        let mut query = select_recipes(viewer);
        match filter.visibility {
            Visibility::Public => push_publicly_visible(&mut query),
            Visibility::Author(author_id) => {
                query.push(" AND r.author_id = ").push_bind(author_id);
            }
            Visibility::All => {}
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
push_search(
                &mut query,
                &["r.title", "r.description", "r.category", "u.name"],
                search,
            );
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            query.push(" AND r.category = ").push_bind(category.to_owned());
        }
        for (column, value) in [
            ("gluten_free", filter.gluten_free),
            ("lactose_free", filter.lactose_free),
            ("is_sardinian", filter.is_sardinian),
        ] {
            if let Some(value) = value {
                query.push(format!(" AND r.{column} = ")).push_bind(value);
            }
        }
        if filter.redazione_only {
            query.push(" AND u.is_redazione = 1");
        }

        query.push(" ORDER BY ");
        if filter.visibility == Visibility::Public {
            query.push("r.is_featured DESC, ");
        }
        if filter.order == RecipeOrder::MostLiked {
            query.push("likes_count DESC, ");
        }
        query.push("r.created_at DESC, r.id DESC");

        let rows = query.build_query_as::<RecipeRow>().fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    /// Every recipe of `author`, newest first.
    pub async fn my_recipes(&self, author: &User) -> Result<Vec<Recipe>> {
        let filter = RecipeFilter {
            visibility: Visibility::Author(author.id),
            ..RecipeFilter::default()
        };
        self.list_recipes(&filter, Some(author.id)).await
    }

    /// Loads a recipe in any state.
    pub async fn find_recipe(&self, key: &RecipeKey, viewer: Option<i64>) -> Result<Recipe> {
        let mut query = select_recipes(viewer);
        push_key(&mut query, key);
        let row = query
            .build_query_as::<RecipeRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound)?;
        self.hydrate(vec![row]).await?.pop().ok_or(Error::NotFound)
    }

    /// Loads a recipe for a public detail view.
    ///
    /// Unpublished and flagged recipes are [`Error::NotFound`] unless `viewer` is the author.
    pub async fn recipe(&self, key: &RecipeKey, viewer: Option<&User>) -> Result<Recipe> {
        let recipe = self.find_recipe(key, viewer.map(|user| user.id)).await?;
        let is_author = viewer.is_some_and(|user| user.id == recipe.author.id);
        if recipe.is_publicly_visible() || is_author {
            Ok(recipe)
        } else {
            Err(Error::NotFound)
        }
    }

    pub(crate) async fn recipe_owner(&self, key: &RecipeKey) -> Result<(i64, i64)> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT r.id, r.author_id FROM recipes r WHERE 1 = 1");
        push_key(&mut query, key);
        query
            .build_query_as::<(i64, i64)>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound)
    }

    /// Creates a recipe by `author` with a fresh unique slug.
    pub async fn create_recipe(&self, author: &User, input: RecipeInput) -> Result<Recipe> {
        input.validate(true)?;
        let title = required(input.title, "title")?;
        let title = title.trim();
        let category = required(input.category, "category")?
            .parse::<Category>()
            .map_err(|e| Error::validation("category", e.to_string()))?;
        let ingredients = required(input.ingredients, "ingredients")?;
        let instructions = required(input.instructions, "instructions")?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let slug = unique_slug(&mut tx, title).await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO recipes (title, slug, description, final_comment, category, prep_time, \
             author_id, image, gluten_free, lactose_free, is_sardinian, created_at, updated_at, \
             is_published, is_featured) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0) RETURNING id",
        )
        .bind(title)
        .bind(&slug)
        .bind(required(input.description, "description")?.trim())
        .bind(input.final_comment.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty()))
        .bind(category.as_str())
        .bind(required(input.prep_time, "prep_time")?)
        .bind(author.id)
        .bind(input.image)
        .bind(input.gluten_free.unwrap_or(false))
        .bind(input.lactose_free.unwrap_or(false))
        .bind(input.is_sardinian.unwrap_or(false))
        .bind(now)
        .bind(now)
        .bind(input.is_published.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::on_unique_violation(e, DUPLICATE_SLUG))?;
        replace_lines(&mut tx, Lines::Ingredients, id, &ingredients).await?;
        replace_lines(&mut tx, Lines::Instructions, id, &instructions).await?;
        tx.commit().await?;

        tracing::info!(recipe_id = id, slug, author_id = author.id, "recipe created");
        self.find_recipe(&RecipeKey::Id(id), Some(author.id)).await
    }

    /// Applies a partial update. Only the author may update a recipe; the slug never changes.
    pub async fn update_recipe(&self, actor: &User, key: &RecipeKey, input: RecipeInput) -> Result<Recipe> {
        let (id, author_id) = self.recipe_owner(key).await?;
        if author_id != actor.id {
            return Err(Error::Forbidden(EDIT_FORBIDDEN.into()));
        }
        input.validate(false)?;

        let mut tx = self.pool.begin().await?;
        let mut update = QueryBuilder::<Sqlite>::new("UPDATE recipes SET updated_at = ");
        update.push_bind(Utc::now());
        if let Some(title) = &input.title {
            update.push(", title = ").push_bind(title.trim().to_owned());
        }
        if let Some(description) = &input.description {
            update.push(", description = ").push_bind(description.trim().to_owned());
        }
        if let Some(comment) = &input.final_comment {
            let comment = comment.trim();
            update
                .push(", final_comment = ")
                .push_bind((!comment.is_empty()).then(|| comment.to_owned()));
        }
        if let Some(category) = &input.category {
            update.push(", category = ").push_bind(category.clone());
        }
        if let Some(prep_time) = input.prep_time {
            update.push(", prep_time = ").push_bind(prep_time);
        }
        if let Some(image) = &input.image {
            update.push(", image = ").push_bind(image.clone());
        }
        for (column, value) in [
            ("gluten_free", input.gluten_free),
            ("lactose_free", input.lactose_free),
            ("is_sardinian", input.is_sardinian),
            ("is_published", input.is_published),
        ] {
            if let Some(value) = value {
                update.push(format!(", {column} = ")).push_bind(value);
            }
        }
        update.push(" WHERE id = ").push_bind(id);
        update.build().execute(&mut *tx).await?;
        if let Some(ingredients) = &input.ingredients {
            replace_lines(&mut tx, Lines::Ingredients, id, ingredients).await?;
        }
        if let Some(instructions) = &input.instructions {
            replace_lines(&mut tx, Lines::Instructions, id, instructions).await?;
        }
        tx.commit().await?;

        tracing::info!(recipe_id = id, user_id = actor.id, "recipe updated");
        self.find_recipe(&RecipeKey::Id(id), Some(actor.id)).await
    }

    /// Deletes a recipe of `actor`, returning it as it was.
    pub async fn delete_recipe(&self, actor: &User, key: &RecipeKey) -> Result<Recipe> {
        let recipe = self.find_recipe(key, Some(actor.id)).await?;
        if recipe.author.id != actor.id {
            return Err(Error::Forbidden(DELETE_FORBIDDEN.into()));
        }
        self.remove_recipe(recipe).await
    }

    /// Deletes any recipe. Staff only.
    pub async fn admin_delete_recipe(&self, id: i64) -> Result<Recipe> {
        let recipe = self.find_recipe(&RecipeKey::Id(id), None).await?;
        self.remove_recipe(recipe).await
    }

    async fn remove_recipe(&self, recipe: Recipe) -> Result<Recipe> {
        sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(recipe.id)
            .execute(&self.pool)
            .await?;
        tracing::info!(recipe_id = recipe.id, slug = %recipe.slug, "recipe deleted");
        Ok(recipe)
    }

    /// Sets the moderation flags of a recipe. Staff only.
    ///
    /// Featuring a recipe unfeatures every other one in the same transaction.
    pub async fn moderate_recipe(
        &self,
        id: i64,
        is_published: Option<bool>,
        is_featured: Option<bool>,
    ) -> Result<Recipe> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound);
        }
        if let Some(published) = is_published {
            sqlx::query("UPDATE recipes SET is_published = ? WHERE id = ?")
                .bind(published)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(featured) = is_featured {
            if featured {
                sqlx::query("UPDATE recipes SET is_featured = 0 WHERE is_featured = 1 AND id <> ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            sqlx::query("UPDATE recipes SET is_featured = ? WHERE id = ?")
                .bind(featured)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        tracing::info!(recipe_id = id, ?is_published, ?is_featured, "recipe moderated");
        self.find_recipe(&RecipeKey::Id(id), None).await
    }

    /// Number of public recipes per category, zero included.
    pub async fn category_counts(&self) -> Result<BTreeMap<Category, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT r.category, COUNT(*) FROM recipes r WHERE r.is_published = 1 \
             AND (SELECT COUNT(*) FROM recipe_reports p WHERE p.recipe_id = r.id) <= ? \
             GROUP BY r.category",
        )
        .bind(FLAG_THRESHOLD)
        .fetch_all(&self.pool)
        .await?;
        let mut counts: BTreeMap<Category, i64> = Category::ALL.into_iter().map(|c| (c, 0)).collect();
        for (category, count) in rows {
            match category.parse() {
                Ok(category) => {
                    counts.insert(category, count);
                }
                Err(e) => tracing::warn!(error = %e, "recipe with unknown category"),
            }
        }
        Ok(counts)
    }

    /// Slugs and update times of published recipes, most recently updated first.
    pub async fn published_recipe_slugs(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        let rows = sqlx::query_as(
            "SELECT slug, updated_at FROM recipes WHERE is_published = 1 ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Rows that belong to a recipe.
trait HasRecipe {
    fn recipe_id(&self) -> i64;
}

impl HasRecipe for Ingredient {
    fn recipe_id(&self) -> i64 {
        self.recipe_id
    }
}

impl HasRecipe for Instruction {
    fn recipe_id(&self) -> i64 {
        self.recipe_id
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::NewUser;

    pub(crate) async fn user(store: &Store, email: &str) -> User {
        store
            .create_user(NewUser {
                email,
                name: email.split('@').next().unwrap_or(email),
                password: None,
                ..NewUser::default()
            })
            .await
            .unwrap()
    }

    pub(crate) fn input(title: &str) -> RecipeInput {
        RecipeInput {
            title: Some(title.to_owned()),
            description: Some("Una ricetta della tradizione.".to_owned()),
            category: Some("Pasta Dishes".to_owned()),
            prep_time: Some(45),
            ingredients: Some(vec!["semola".into(), "  ".into(), "acqua".into()]),
            instructions: Some(vec!["Impastare.".into(), "Cuocere.".into()]),
            ..RecipeInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_unique_slugs() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;

        let first = store.create_recipe(&anna, input("Malloreddus")).await.unwrap();
        let second = store.create_recipe(&anna, input("Malloreddus")).await.unwrap();
        let third = store.create_recipe(&anna, input("Malloreddus!")).await.unwrap();
        assert_eq!(first.slug, "malloreddus");
        assert_eq!(second.slug, "malloreddus-1");
        assert_eq!(third.slug, "malloreddus-2");

        assert_eq!(first.author.id, anna.id);
        assert!(first.is_published);
        assert!(!first.is_featured);
        let names: Vec<_> = first.ingredients.iter().map(|i| (i.name.as_str(), i.order)).collect();
        assert_eq!(names, [("semola", 0), ("acqua", 2)]);
        assert_eq!(first.instructions.len(), 2);
    }

    #[tokio::test]
    async fn test_long_titles_get_distinct_slugs() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let title = "a".repeat(MAX_TITLE_LEN);

        let mut slugs = Vec::new();
        for _ in 0..3 {
            slugs.push(store.create_recipe(&anna, input(&title)).await.unwrap().slug);
        }
        assert_eq!(slugs[0], title);
        assert_eq!(slugs[1], format!("{}-1", "a".repeat(MAX_TITLE_LEN - 2)));
        assert_eq!(slugs[2], format!("{}-2", "a".repeat(MAX_TITLE_LEN - 2)));
        assert!(slugs.iter().all(|slug| slug.len() <= MAX_TITLE_LEN));
    }

    #[tokio::test]
    async fn test_create_validates() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;

        let mut missing = input("Fregola");
        missing.prep_time = None;
        let err = store.create_recipe(&anna, missing).await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "prep_time"));

        let err = store.create_recipe(&anna, input("Pane di merda")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation { ref message, .. } if message.starts_with("Il titolo contiene")
        ));

        let mut bad = input("Fregola");
        bad.instructions = Some(vec!["Cuocere".into(), "c.a.z.z.o".into()]);
        let err = store.create_recipe(&anna, bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "instructions"));

        let mut bad = input("Fregola");
        bad.category = Some("Zuppe".into());
        assert!(store.create_recipe(&anna, bad).await.is_err());
    }

    #[tokio::test]
    async fn test_update_is_partial_and_owner_only() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let bruno = user(&store, "bruno@example.com").await;
        let recipe = store.create_recipe(&anna, input("Seadas")).await.unwrap();
        let key = RecipeKey::Slug(recipe.slug.clone());

        let patch = RecipeInput {
            title: Some("Seadas al miele".into()),
            ingredients: Some(vec!["formaggio".into(), "miele".into()]),
            ..RecipeInput::default()
        };
        let err = store.update_recipe(&bruno, &key, patch.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref m) if *m == EDIT_FORBIDDEN));

        let updated = store.update_recipe(&anna, &key, patch).await.unwrap();
        assert_eq!(updated.title, "Seadas al miele");
        assert_eq!(updated.slug, "seadas");
        assert_eq!(updated.description, recipe.description);
        assert_eq!(updated.ingredients.len(), 2);
        assert_eq!(updated.instructions.len(), 2);

        let err = store.delete_recipe(&bruno, &key).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref m) if *m == DELETE_FORBIDDEN));
        store.delete_recipe(&anna, &key).await.unwrap();
        assert!(matches!(store.find_recipe(&key, None).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_single_featured_recipe() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let a = store.create_recipe(&anna, input("Pane carasau")).await.unwrap();
        let b = store.create_recipe(&anna, input("Pane guttiau")).await.unwrap();

        store.moderate_recipe(a.id, None, Some(true)).await.unwrap();
        store.moderate_recipe(b.id, None, Some(true)).await.unwrap();

        let listed = store.list_recipes(&RecipeFilter::default(), None).await.unwrap();
        let featured: Vec<_> = listed.iter().filter(|r| r.is_featured).map(|r| r.id).collect();
        assert_eq!(featured, [b.id]);
        assert_eq!(listed[0].id, b.id);

        store.moderate_recipe(a.id, None, Some(true)).await.unwrap();
        let listed = store.list_recipes(&RecipeFilter::default(), None).await.unwrap();
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed.iter().filter(|r| r.is_featured).count(), 1);
    }

    #[tokio::test]
    async fn test_listing_filters() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let redazione = store.redazione_user().await.unwrap();

        let mut gluten_free = input("Amaretti sardi");
        gluten_free.category = Some("Desserts".into());
        gluten_free.gluten_free = Some(true);
        gluten_free.is_sardinian = Some(true);
        store.create_recipe(&anna, gluten_free).await.unwrap();
        store.create_recipe(&redazione, input("Culurgiones")).await.unwrap();
        let mut draft = input("Bozza");
        draft.is_published = Some(false);
        store.create_recipe(&anna, draft).await.unwrap();

        let all = store.list_recipes(&RecipeFilter::default(), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let filter = RecipeFilter {
            gluten_free: Some(true),
            ..RecipeFilter::default()
        };
        let listed = store.list_recipes(&filter, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Amaretti sardi");

        let filter = RecipeFilter {
            redazione_only: true,
            ..RecipeFilter::default()
        };
        let listed = store.list_recipes(&filter, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].author.display_name, "Redazione");

        let filter = RecipeFilter {
            search: Some("anna".into()),
            ..RecipeFilter::default()
        };
        assert_eq!(store.list_recipes(&filter, None).await.unwrap().len(), 1);

        for wildcard in ["%", "_"] {
            let filter = RecipeFilter {
                search: Some(wildcard.into()),
                ..RecipeFilter::default()
            };
            assert!(store.list_recipes(&filter, None).await.unwrap().is_empty(), "{wildcard}");
        }

        let filter = RecipeFilter {
            category: Some("Desserts".into()),
            ..RecipeFilter::default()
        };
        assert_eq!(store.list_recipes(&filter, None).await.unwrap().len(), 1);

        assert_eq!(store.my_recipes(&anna).await.unwrap().len(), 2);

        let counts = store.category_counts().await.unwrap();
        assert_eq!(counts[&Category::Desserts], 1);
        assert_eq!(counts[&Category::PastaDishes], 1);
        assert_eq!(counts[&Category::Fish], 0);
    }

    #[tokio::test]
    async fn test_most_liked_order() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let bruno = user(&store, "bruno@example.com").await;
        let carla = user(&store, "carla@example.com").await;
        let older = store.create_recipe(&anna, input("Fregola")).await.unwrap();
        let liked = store.create_recipe(&anna, input("Culurgiones")).await.unwrap();
        let newest = store.create_recipe(&anna, input("Seadas")).await.unwrap();
        for fan in [&bruno, &carla] {
            store.toggle_like(fan, &RecipeKey::Id(liked.id)).await.unwrap();
        }
        store.toggle_like(&bruno, &RecipeKey::Id(older.id)).await.unwrap();

        let filter = RecipeFilter {
            order: RecipeOrder::MostLiked,
            ..RecipeFilter::default()
        };
        let listed = store.list_recipes(&filter, Some(bruno.id)).await.unwrap();
        let order: Vec<_> = listed.iter().map(|r| (r.id, r.likes_count)).collect();
        assert_eq!(order, [(liked.id, 2), (older.id, 1), (newest.id, 0)]);
        assert!(listed[0].is_liked);
        assert!(!listed[2].is_liked);

        let recent = store.list_recipes(&RecipeFilter::default(), None).await.unwrap();
        let order: Vec<_> = recent.iter().map(|r| r.id).collect();
        assert_eq!(order, [newest.id, liked.id, older.id]);
    }

    #[tokio::test]
    async fn test_unpublished_detail_is_author_only() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let bruno = user(&store, "bruno@example.com").await;
        let mut draft = input("Bozza");
        draft.is_published = Some(false);
        let recipe = store.create_recipe(&anna, draft).await.unwrap();
        let key = RecipeKey::Id(recipe.id);

        assert!(matches!(store.recipe(&key, None).await, Err(Error::NotFound)));
        assert!(matches!(store.recipe(&key, Some(&bruno)).await, Err(Error::NotFound)));
        assert_eq!(store.recipe(&key, Some(&anna)).await.unwrap().id, recipe.id);
    }
}
