//! Staff-only content management.

use ricette_blog::{Recipe, RecipeFilter, Report, StoryPost, UserFlags, UserProfile, Visibility};
use salvo::prelude::*;
use serde::Deserialize;

use super::{id_param, search};
use crate::auth::{CurrentUser, require_staff};
use crate::error::ApiError;
use crate::form::{discard_image, story_input};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Moderation {
    is_published: Option<bool>,
    is_featured: Option<bool>,
}

pub(crate) fn router() -> Router {
    Router::with_path("admin")
        .hoop(require_staff)
        .push(
            Router::with_path("users")
                .get(list_users)
                .push(Router::with_path("{id}").patch(update_user)),
        )
        .push(
            Router::with_path("recipes")
                .get(list_recipes)
                .push(
                    Router::with_path("{id}")
                        .patch(moderate_recipe)
                        .delete(delete_recipe),
                ),
        )
        .push(
            Router::with_path("reports")
                .get(list_reports)
                .push(Router::with_path("{id}").delete(delete_report)),
        )
        .push(
            Router::with_path("stories")
                .get(list_stories)
                .post(create_story)
                .push(Router::with_path("redazione").post(ensure_redazione_story))
                .push(
                    Router::with_path("{id}")
                        .patch(update_story)
                        .delete(delete_story),
                ),
        )
}

#[handler]
async fn list_users(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let users = state.store.list_users(search(req).as_deref()).await?;
    Ok(Json(users.iter().map(|user| user.profile()).collect()))
}

#[handler]
async fn update_user(req: &mut Request, depot: &mut Depot) -> Result<Json<UserProfile>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let id = id_param(req)?;
    let flags: UserFlags = req.parse_json().await?;
    let user = state.store.update_user_flags(id, flags).await?;
    Ok(Json(user.profile()))
}

/// Every recipe, with like and report counts.
#[handler]
async fn list_recipes(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<Recipe>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let filter = RecipeFilter {
        visibility: Visibility::All,
        search: search(req),
        ..RecipeFilter::default()
    };
    let viewer = depot.current_user().map(|user| user.id);
    Ok(Json(state.store.list_recipes(&filter, viewer).await?))
}

#[handler]
async fn moderate_recipe(req: &mut Request, depot: &mut Depot) -> Result<Json<Recipe>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let id = id_param(req)?;
    let moderation: Moderation = req.parse_json().await?;
    let recipe = state
        .store
        .moderate_recipe(id, moderation.is_published, moderation.is_featured)
        .await?;
    Ok(Json(recipe))
}

#[handler]
async fn delete_recipe(req: &mut Request, depot: &mut Depot, res: &mut Response) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    state.store.admin_delete_recipe(id_param(req)?).await?;
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

#[handler]
async fn list_reports(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<Report>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let recipe = req.query::<i64>("recipe");
    Ok(Json(state.store.list_reports(recipe).await?))
}

#[handler]
async fn delete_report(req: &mut Request, depot: &mut Depot, res: &mut Response) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    state.store.delete_report(id_param(req)?).await?;
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

#[handler]
async fn list_stories(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<StoryPost>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    Ok(Json(state.store.all_stories(search(req).as_deref()).await?))
}

#[handler]
async fn create_story(req: &mut Request, depot: &mut Depot, res: &mut Response) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    let actor = depot.require_user()?;
    let input = story_input(req, &state.config).await?;
    let image = input.image.clone();
    match state.store.create_story(actor, input).await {
        Ok(story) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(story));
            Ok(())
        }
        Err(e) => {
            discard_image(&state.config, image.as_deref()).await;
            Err(e.into())
        }
    }
}

#[handler]
async fn update_story(req: &mut Request, depot: &mut Depot) -> Result<Json<StoryPost>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let id = id_param(req)?;
    let input = story_input(req, &state.config).await?;
    let image = input.image.clone();
    match state.store.update_story(id, input).await {
        Ok(story) => Ok(Json(story)),
        Err(e) => {
            discard_image(&state.config, image.as_deref()).await;
            Err(e.into())
        }
    }
}

#[handler]
async fn delete_story(req: &mut Request, depot: &mut Depot, res: &mut Response) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    state.store.delete_story(id_param(req)?).await?;
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

/// Creates or refreshes the editorial mission story.
#[handler]
async fn ensure_redazione_story(depot: &mut Depot) -> Result<Json<StoryPost>, ApiError> {
    let state = AppState::from_depot(depot)?;
    Ok(Json(state.store.ensure_redazione_story().await?))
}

#[cfg(test)]
mod tests {
    use ricette_blog::RecipeInput;
    use salvo::http::StatusCode;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::{Value, json};

    use crate::tests::{API, TestApp};

    fn input(title: &str) -> RecipeInput {
        RecipeInput {
            title: Some(title.to_owned()),
            description: Some("Dolce di ricotta e zafferano.".to_owned()),
            category: Some("Desserts".to_owned()),
            prep_time: Some(90),
            ingredients: Some(vec!["ricotta".to_owned()]),
            instructions: Some(vec!["Infornare".to_owned()]),
            ..RecipeInput::default()
        }
    }

    #[tokio::test]
    async fn test_admin_requires_staff() {
        let app = TestApp::new().await;
        let (_, user) = app.user("anna@example.com").await;
        let res = TestClient::get(format!("{API}/admin/users/"))
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
        let mut res = TestClient::get(format!("{API}/admin/users/"))
            .bearer_auth(&user)
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
        let body: Value = res.take_json().await.unwrap();
        assert_eq!(body["error"], "Non hai il permesso di eseguire questa azione.");
    }

    #[tokio::test]
    async fn test_featuring_is_exclusive() {
        let app = TestApp::new().await;
        let (anna, _) = app.user("anna@example.com").await;
        let (_, staff) = app.staff("staff@example.com").await;
        let first = app.state.store.create_recipe(&anna, input("Pardulas")).await.unwrap();
        let second = app.state.store.create_recipe(&anna, input("Pabassinas")).await.unwrap();

        for id in [first.id, second.id] {
            let mut res = TestClient::patch(format!("{API}/admin/recipes/{id}/"))
                .bearer_auth(&staff)
                .json(&json!({"is_featured": true}))
                .send(&app.service)
                .await;
            assert_eq!(res.status_code, Some(StatusCode::OK));
            let recipe: Value = res.take_json().await.unwrap();
            assert_eq!(recipe["is_featured"], true);
        }

        let mut res = TestClient::get(format!("{API}/recipes/"))
            .send(&app.service)
            .await;
        let listed: Vec<Value> = res.take_json().await.unwrap();
        let featured: Vec<i64> = listed
            .iter()
            .filter(|r| r["is_featured"] == true)
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(featured, [second.id]);
        assert_eq!(listed[0]["id"], second.id);
    }

    #[tokio::test]
    async fn test_moderation_of_users_reports_and_stories() {
        let app = TestApp::new().await;
        let (anna, anna_token) = app.user("anna@example.com").await;
        let (bruno, _) = app.user("bruno@example.com").await;
        let (_, staff) = app.staff("staff@example.com").await;
        let recipe = app.state.store.create_recipe(&anna, input("Zippole")).await.unwrap();
        let report = app
            .state
            .store
            .report_recipe(&bruno, &recipe.id.into(), Default::default())
            .await
            .unwrap();

        let mut res = TestClient::get(format!("{API}/admin/reports/"))
            .bearer_auth(&staff)
            .query("recipe", recipe.id)
            .send(&app.service)
            .await;
        let reports: Vec<Value> = res.take_json().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0]["recipe_title"], "Zippole");
        let res = TestClient::delete(format!("{API}/admin/reports/{}/", report.id))
            .bearer_auth(&staff)
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));

        let mut res = TestClient::patch(format!("{API}/admin/users/{}/", anna.id))
            .bearer_auth(&staff)
            .json(&json!({"is_active": false}))
            .send(&app.service)
            .await;
        let profile: Value = res.take_json().await.unwrap();
        assert_eq!(profile["is_active"], false);
        let res = TestClient::get(format!("{API}/auth/me/"))
            .bearer_auth(&anna_token)
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        let mut res = TestClient::post(format!("{API}/admin/stories/redazione/"))
            .bearer_auth(&staff)
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::OK));
        let mission: Value = res.take_json().await.unwrap();
        assert_eq!(mission["author"]["display_name"], "Redazione");

        let mut res = TestClient::post(format!("{API}/admin/stories/"))
            .bearer_auth(&staff)
            .json(&json!({"title": "Le launeddas", "content": "Tre canne.", "role": "Musicista"}))
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        let story: Value = res.take_json().await.unwrap();
        let res = TestClient::delete(format!("{API}/admin/stories/{}/", story["id"]))
            .bearer_auth(&staff)
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
    }
}
