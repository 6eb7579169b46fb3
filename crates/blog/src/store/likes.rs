use chrono::Utc;

use super::Store;
use crate::Result;
use crate::model::{LikeToggle, RecipeKey, User};

impl Store {
    /// Likes the recipe, or removes the like if `user` already likes it.
    ///
    /// Any recipe can be liked, whatever its visibility.
    pub async fn toggle_like(&self, user: &User, key: &RecipeKey) -> Result<LikeToggle> {
        let (recipe_id, _) = self.recipe_owner(key).await?;
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM recipe_likes WHERE user_id = ? AND recipe_id = ?")
            .bind(user.id)
            .bind(recipe_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;
        if !removed {
            sqlx::query("INSERT INTO recipe_likes (user_id, recipe_id, created_at) VALUES (?, ?, ?)")
                .bind(user.id)
                .bind(recipe_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
        }
        let likes_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM recipe_likes WHERE recipe_id = ?")
                .bind(recipe_id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;

        tracing::debug!(recipe_id, user_id = user.id, liked = !removed, likes_count, "like toggled");
        Ok(LikeToggle {
            liked: !removed,
            likes_count,
        })
    }
}
