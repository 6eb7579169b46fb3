use chrono::Utc;
use ricette_moderation::{Field, validate_field};
use sqlx::QueryBuilder;
use sqlx::sqlite::Sqlite;

use super::{Store, push_search};
use crate::account::REQUIRED;
use crate::model::{AUTHOR_COLUMNS, StoryInput, StoryPost, StoryRow, User};
use crate::{Error, Result};

const MAX_ROLE_LEN: usize = 100;
const ROLE_TOO_LONG: &str = "Assicurati che questo campo non abbia più di 100 caratteri.";

const MISSION_TITLE: &str = "La nostra missione";
const MISSION_ROLE: &str = "Redazione";
const MISSION_CONTENT: &str = "Sardegna Ricette nasce per custodire e condividere la cucina \
della nostra isola. Raccogliamo le ricette delle famiglie, dei paesi e delle feste, \
dal pane carasau ai culurgiones, dalla fregola alle seadas, perché ogni piatto racconta \
una storia che merita di essere tramandata.\n\n\
La redazione seleziona, verifica e mette in evidenza le ricette più rappresentative, \
e dà voce a chi la tradizione la vive ogni giorno: cuochi, pastori, panettiere e nonne. \
Cucinate con noi, condividete le vostre ricette e aiutateci a tenere viva la memoria \
della tavola sarda.";

fn select_stories() -> String {
    format!(
        "SELECT s.id, s.title, s.content, s.image, s.role, s.created_at, s.updated_at, \
         s.is_published, {AUTHOR_COLUMNS} FROM story_posts s JOIN users u ON u.id = s.author_id"
    )
}

impl StoryInput {
    fn validate(&self, creating: bool) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("content", &self.content),
            ("role", &self.role),
        ] {
            match value.as_deref().map(str::trim) {
                None if creating => return Err(Error::validation(field, REQUIRED)),
                Some("") => return Err(Error::validation(field, REQUIRED)),
                _ => {}
            }
        }
        if let Some(title) = &self.title {
            validate_field(Field::Title, title)?;
        }
        if let Some(content) = &self.content {
            validate_field(Field::Content, content)?;
        }
        if self
            .role
            .as_deref()
            .is_some_and(|role| role.trim().chars().count() > MAX_ROLE_LEN)
        {
            return Err(Error::validation("role", ROLE_TOO_LONG));
        }
        Ok(())
    }
}

impl Store {
    /// Published stories, newest first, optionally filtered by a substring of title,
    /// content, role or author name.
    pub async fn list_stories(&self, search: Option<&str>) -> Result<Vec<StoryPost>> {
        self.query_stories(true, search).await
    }

    /// Every story, newest first.
    pub async fn all_stories(&self, search: Option<&str>) -> Result<Vec<StoryPost>> {
        self.query_stories(false, search).await
    }

    async fn query_stories(&self, published_only: bool, search: Option<&str>) -> Result<Vec<StoryPost>> {
        let mut query = QueryBuilder::<Sqlite>::new(select_stories());
        query.push(" WHERE 1 = 1");
        if published_only {
            query.push(" AND s.is_published = 1");
        }
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            push_search(&mut query, &["s.title", "s.content", "s.role", "u.name"], search);
        }
        query.push(" ORDER BY s.created_at DESC, s.id DESC");
        let rows = query.build_query_as::<StoryRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(StoryPost::from).collect())
    }

    /// A published story.
    pub async fn story(&self, id: i64) -> Result<StoryPost> {
        let story = self.find_story(id).await?;
        if story.is_published {
            Ok(story)
        } else {
            Err(Error::NotFound)
        }
    }

    /// A story in any state.
    pub async fn find_story(&self, id: i64) -> Result<StoryPost> {
        let row = sqlx::query_as::<_, StoryRow>(&format!("{} WHERE s.id = ?", select_stories()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound)?;
        Ok(row.into())
    }

    /// Creates a story. The author defaults to `actor`.
    pub async fn create_story(&self, actor: &User, input: StoryInput) -> Result<StoryPost> {
        input.validate(true)?;
        let author_id = match input.author_id {
            Some(id) => self.user(id).await?.id,
            None => actor.id,
        };
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO story_posts (title, content, author_id, image, role, created_at, updated_at, is_published) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.content.as_deref().map(str::trim))
        .bind(author_id)
        .bind(input.image.as_deref())
        .bind(input.role.as_deref().map(str::trim))
        .bind(now)
        .bind(now)
        .bind(input.is_published.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(story_id = id, author_id, "story created");
        self.find_story(id).await
    }

    /// Applies a partial update to a story.
    pub async fn update_story(&self, id: i64, input: StoryInput) -> Result<StoryPost> {
        input.validate(false)?;
        let mut update = QueryBuilder::<Sqlite>::new("UPDATE story_posts SET updated_at = ");
        update.push_bind(Utc::now());
        for (column, value) in [
            ("title", &input.title),
            ("content", &input.content),
            ("role", &input.role),
            ("image", &input.image),
        ] {
            if let Some(value) = value {
                update
                    .push(format!(", {column} = "))
                    .push_bind(value.trim().to_owned());
            }
        }
        if let Some(published) = input.is_published {
            update.push(", is_published = ").push_bind(published);
        }
        if let Some(author_id) = input.author_id {
            update.push(", author_id = ").push_bind(self.user(author_id).await?.id);
        }
        update.push(" WHERE id = ").push_bind(id);
        let done = update.build().execute(&self.pool).await?;
        if done.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        tracing::info!(story_id = id, "story updated");
        self.find_story(id).await
    }

    /// Deletes a story.
    pub async fn delete_story(&self, id: i64) -> Result<StoryPost> {
        let story = self.find_story(id).await?;
        sqlx::query("DELETE FROM story_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::info!(story_id = id, "story deleted");
        Ok(story)
    }

    /// Creates the editorial mission story, or brings it back to its canonical text.
    ///
    /// The story belongs to the editorial account, which is created if missing.
    pub async fn ensure_redazione_story(&self) -> Result<StoryPost> {
        let redazione = self.redazione_user().await?;
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM story_posts WHERE author_id = ? AND title = ? ORDER BY id LIMIT 1",
        )
        .bind(redazione.id)
        .bind(MISSION_TITLE)
        .fetch_optional(&self.pool)
        .await?;
        let input = StoryInput {
            title: Some(MISSION_TITLE.to_owned()),
            content: Some(MISSION_CONTENT.to_owned()),
            role: Some(MISSION_ROLE.to_owned()),
            is_published: Some(true),
            ..StoryInput::default()
        };
        match existing {
            Some(id) => self.update_story(id, input).await,
            None => self.create_story(&redazione, input).await,
        }
    }

    /// Ids and update times of published stories, most recently updated first.
    pub async fn published_story_ids(&self) -> Result<Vec<(i64, chrono::DateTime<Utc>)>> {
        let rows = sqlx::query_as(
            "SELECT id, updated_at FROM story_posts WHERE is_published = 1 ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
