use chrono::Utc;
use ricette_moderation::{Field, validate_field};

use super::Store;
use crate::model::{AUTHOR_COLUMNS, FLAG_THRESHOLD, NewReport, RecipeKey, Report, ReportRow, User};
use crate::{Error, Result};

const ALREADY_REPORTED: &str = "Hai già segnalato questa ricetta.";
const OWN_RECIPE: &str = "Non puoi segnalare la tua stessa ricetta.";

fn select_reports() -> String {
    format!(
        "SELECT p.id, p.recipe_id, r.title AS recipe_title, p.reason, p.description, p.created_at, \
         {AUTHOR_COLUMNS} FROM recipe_reports p \
         JOIN users u ON u.id = p.user_id JOIN recipes r ON r.id = p.recipe_id"
    )
}

impl Store {
    /// Files a report by `user` against a recipe.
    ///
    /// A user reports a recipe at most once and never their own. Every report past
    /// the flag threshold keeps the recipe hidden from public views.
    pub async fn report_recipe(&self, user: &User, key: &RecipeKey, report: NewReport) -> Result<Report> {
        let (recipe_id, author_id) = self.recipe_owner(key).await?;
        let description = report.description.trim();
        validate_field(Field::ReportDescription, description)?;

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM recipe_reports WHERE user_id = ? AND recipe_id = ?)",
        )
        .bind(user.id)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await?;
        if already {
            return Err(Error::Conflict(ALREADY_REPORTED.into()));
        }
        if author_id == user.id {
            return Err(Error::validation("recipe", OWN_RECIPE));
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO recipe_reports (user_id, recipe_id, reason, description, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(user.id)
        .bind(recipe_id)
        .bind(report.reason.as_str())
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::on_unique_violation(e, ALREADY_REPORTED))?;

        let reports_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM recipe_reports WHERE recipe_id = ?")
                .bind(recipe_id)
                .fetch_one(&self.pool)
                .await?;
        tracing::info!(recipe_id, user_id = user.id, reason = report.reason.as_str(), "recipe reported");
        if reports_count == FLAG_THRESHOLD + 1 {
            tracing::warn!(recipe_id, reports_count, "recipe flagged and hidden from public views");
        }
        self.report(id).await
    }

    /// Loads one report.
    pub async fn report(&self, id: i64) -> Result<Report> {
        let row = sqlx::query_as::<_, ReportRow>(&format!("{} WHERE p.id = ?", select_reports()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound)?;
        Ok(row.into())
    }

    /// Lists reports, newest first, optionally for a single recipe.
    pub async fn list_reports(&self, recipe_id: Option<i64>) -> Result<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            "{} WHERE ?1 IS NULL OR p.recipe_id = ?1 ORDER BY p.created_at DESC, p.id DESC",
            select_reports()
        ))
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Report::from).collect())
    }

    /// Deletes a report. A recipe drops back below the flag threshold this way.
    pub async fn delete_report(&self, id: i64) -> Result<()> {
        let done = sqlx::query("DELETE FROM recipe_reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        tracing::info!(report_id = id, "report deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReportReason;
    use crate::store::RecipeFilter;
    use crate::store::recipes::tests::{input, user};

    #[tokio::test]
    async fn test_report_rules() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let bruno = user(&store, "bruno@example.com").await;
        let recipe = store.create_recipe(&anna, input("Zuppa gallurese")).await.unwrap();
        let key = RecipeKey::Id(recipe.id);

        let report = store
            .report_recipe(
                &bruno,
                &key,
                NewReport {
                    reason: ReportReason::Spam,
                    description: "  pubblicità  ".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(report.recipe, recipe.id);
        assert_eq!(report.user.id, bruno.id);
        assert_eq!(report.description, "pubblicità");
        assert_eq!(report.reason_label, "Spam");

        let again = store.report_recipe(&bruno, &key, NewReport::default()).await;
        assert!(matches!(again, Err(Error::Conflict(ref m)) if *m == ALREADY_REPORTED));

        let own = store.report_recipe(&anna, &key, NewReport::default()).await;
        assert!(matches!(own, Err(Error::Validation { ref message, .. }) if *message == OWN_RECIPE));

        let rude = NewReport {
            description: "che schifo di merda".into(),
            ..NewReport::default()
        };
        let carla = user(&store, "carla@example.com").await;
        let rude = store.report_recipe(&carla, &key, rude).await.unwrap_err();
        assert!(matches!(rude, Error::Validation { .. }));

        assert_eq!(store.list_reports(Some(recipe.id)).await.unwrap().len(), 1);
        assert_eq!(store.list_reports(Some(recipe.id + 1)).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_flagged_recipe_is_hidden_except_from_author() {
        let store = Store::memory().await.unwrap();
        let anna = user(&store, "anna@example.com").await;
        let recipe = store.create_recipe(&anna, input("Pecora in cappotto")).await.unwrap();
        let key = RecipeKey::Slug(recipe.slug.clone());

        for n in 0..6 {
            let reporter = user(&store, &format!("r{n}@example.com")).await;
            store
                .report_recipe(&reporter, &key, NewReport::default())
                .await
                .unwrap();
            let visible = store.recipe(&key, None).await.is_ok();
            assert_eq!(visible, n < 5, "after {} reports", n + 1);
        }

        let public = store.list_recipes(&RecipeFilter::default(), None).await.unwrap();
        assert!(public.is_empty());
        assert!(store.category_counts().await.unwrap().values().all(|&c| c == 0));

        let own = store.recipe(&key, Some(&anna)).await.unwrap();
        assert!(own.is_flagged);
        assert_eq!(own.reports_count, 6);
        assert_eq!(store.my_recipes(&anna).await.unwrap().len(), 1);

        let reports = store.list_reports(Some(recipe.id)).await.unwrap();
        store.delete_report(reports[0].id).await.unwrap();
        assert!(store.recipe(&key, None).await.is_ok());
        assert!(matches!(store.delete_report(reports[0].id).await, Err(Error::NotFound)));
    }
}
