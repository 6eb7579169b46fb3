use std::collections::BTreeMap;

use ricette_blog::{Category, LikeToggle, NewReport, Recipe, RecipeFilter, RecipeOrder};
use salvo::prelude::*;

use super::{recipe_key, search};
use crate::auth::CurrentUser;
use crate::error::{ApiError, BAD_REQUEST};
use crate::form::{discard_image, parse_bool, recipe_input};
use crate::state::AppState;

fn listing_filter(req: &Request) -> RecipeFilter {
    let flag = |name: &str| req.query::<String>(name).map(|v| parse_bool(&v));
    let order = match req.query::<String>("order_by").as_deref() {
        Some("likes" | "most_liked") => RecipeOrder::MostLiked,
        _ => RecipeOrder::Recent,
    };
    RecipeFilter {
        search: search(req),
        category: req
            .query::<String>("category")
            .filter(|c| !c.trim().is_empty()),
        gluten_free: flag("gluten_free"),
        lactose_free: flag("lactose_free"),
        is_sardinian: flag("is_sardinian"),
        redazione_only: flag("redazione_only").unwrap_or(false),
        order,
        ..RecipeFilter::default()
    }
}

/// Public listing. The featured recipe comes first.
#[handler]
pub(crate) async fn list(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<Recipe>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let viewer = depot.current_user().map(|user| user.id);
    let recipes = state.store.list_recipes(&listing_filter(req), viewer).await?;
    Ok(Json(recipes))
}

#[handler]
pub(crate) async fn mine(depot: &mut Depot) -> Result<Json<Vec<Recipe>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let user = depot.require_user()?;
    Ok(Json(state.store.my_recipes(user).await?))
}

#[handler]
pub(crate) async fn category_counts(depot: &mut Depot) -> Result<Json<BTreeMap<Category, i64>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    Ok(Json(state.store.category_counts().await?))
}

#[handler]
pub(crate) async fn create(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    let author = depot.require_user()?;
    let input = recipe_input(req, &state.config).await?;
    let image = input.image.clone();
    match state.store.create_recipe(author, input).await {
        Ok(recipe) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(recipe));
            Ok(())
        }
        Err(e) => {
            discard_image(&state.config, image.as_deref()).await;
            Err(e.into())
        }
    }
}

#[handler]
pub(crate) async fn show(req: &mut Request, depot: &mut Depot) -> Result<Json<Recipe>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let key = recipe_key(req)?;
    Ok(Json(state.store.recipe(&key, depot.current_user()).await?))
}

/// Serves both PUT and PATCH: only the submitted fields change.
#[handler]
pub(crate) async fn update(req: &mut Request, depot: &mut Depot) -> Result<Json<Recipe>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let actor = depot.require_user()?;
    let key = recipe_key(req)?;
    let input = recipe_input(req, &state.config).await?;
    let image = input.image.clone();
    match state.store.update_recipe(actor, &key, input).await {
        Ok(recipe) => Ok(Json(recipe)),
        Err(e) => {
            discard_image(&state.config, image.as_deref()).await;
            Err(e.into())
        }
    }
}

#[handler]
pub(crate) async fn destroy(req: &mut Request, depot: &mut Depot, res: &mut Response) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    let actor = depot.require_user()?;
    let key = recipe_key(req)?;
    state.store.delete_recipe(actor, &key).await?;
    res.status_code(StatusCode::NO_CONTENT);
    Ok(())
}

#[handler]
pub(crate) async fn like(req: &mut Request, depot: &mut Depot) -> Result<Json<LikeToggle>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let user = depot.require_user()?;
    let key = recipe_key(req)?;
    Ok(Json(state.store.toggle_like(user, &key).await?))
}

/// Files a report. An empty body reports inappropriate content without a description.
#[handler]
pub(crate) async fn report(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    let user = depot.require_user()?;
    let key = recipe_key(req)?;
    let payload = req.payload().await?;
    let new_report = if payload.iter().all(u8::is_ascii_whitespace) {
        NewReport::default()
    } else {
        serde_json::from_slice(payload).map_err(|e| {
            tracing::info!(error = %e, "malformed report body");
            ApiError::bad_request(BAD_REQUEST)
        })?
    };
    let filed = state.store.report_recipe(user, &key, new_report).await?;
    res.status_code(StatusCode::CREATED);
    res.render(Json(filed));
    Ok(())
}

#[cfg(test)]
mod tests {
    use salvo::http::StatusCode;
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::{Value, json};

    use crate::tests::{API, TestApp};

    fn recipe(title: &str) -> Value {
        json!({
            "title": title,
            "description": "Un classico della cucina sarda.",
            "category": "Pasta Dishes",
            "prep_time": 45,
            "is_sardinian": true,
            "ingredients": ["semola", "  ", "acqua"],
            "instructions": ["Impastare", "Cuocere"],
        })
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let app = TestApp::new().await;
        let service = &app.service;
        let (_, token) = app.user("anna@example.com").await;

        let res = TestClient::post(format!("{API}/recipes/"))
            .json(&recipe("Malloreddus"))
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        let mut res = TestClient::post(format!("{API}/recipes/"))
            .bearer_auth(&token)
            .json(&recipe("Malloreddus"))
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        let created: Value = res.take_json().await.unwrap();
        assert_eq!(created["slug"], "malloreddus");
        assert_eq!(created["ingredients"].as_array().unwrap().len(), 2);
        assert_eq!(created["ingredients"][1]["name"], "acqua");
        assert_eq!(created["ingredients"][1]["order"], 2);

        let mut res = TestClient::post(format!("{API}/recipes"))
            .bearer_auth(&token)
            .json(&recipe("Malloreddus"))
            .send(service)
            .await;
        let second: Value = res.take_json().await.unwrap();
        assert_eq!(second["slug"], "malloreddus-1");

        let mut res = TestClient::get(format!("{API}/recipes/malloreddus/"))
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::OK));
        let shown: Value = res.take_json().await.unwrap();
        assert_eq!(shown["id"], created["id"]);
        assert_eq!(shown["is_liked"], false);

        let id = created["id"].as_i64().unwrap();
        let res = TestClient::get(format!("{API}/recipes/{id}"))
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::OK));

        let mut res = TestClient::get(format!("{API}/recipes/category_counts/"))
            .send(service)
            .await;
        let counts: Value = res.take_json().await.unwrap();
        assert_eq!(counts["Pasta Dishes"], 2);
        assert_eq!(counts["Desserts"], 0);
    }

    #[tokio::test]
    async fn test_rejected_content() {
        let app = TestApp::new().await;
        let (_, token) = app.user("anna@example.com").await;
        let mut body = recipe("Fregola");
        body["description"] = json!("che c.a.z.z.o di ricetta");
        let mut res = TestClient::post(format!("{API}/recipes/"))
            .bearer_auth(&token)
            .json(&body)
            .send(&app.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        let error: Value = res.take_json().await.unwrap();
        assert!(error["error"].as_str().unwrap().contains("non consentit"));
    }

    #[tokio::test]
    async fn test_only_the_author_edits() {
        let app = TestApp::new().await;
        let service = &app.service;
        let (_, anna) = app.user("anna@example.com").await;
        let (_, bruno) = app.user("bruno@example.com").await;
        let mut res = TestClient::post(format!("{API}/recipes/"))
            .bearer_auth(&anna)
            .json(&recipe("Culurgiones"))
            .send(service)
            .await;
        let created: Value = res.take_json().await.unwrap();
        let url = format!("{API}/recipes/{}/", created["slug"].as_str().unwrap());

        let mut res = TestClient::patch(&url)
            .bearer_auth(&bruno)
            .json(&json!({"title": "Rubata"}))
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
        let error: Value = res.take_json().await.unwrap();
        assert_eq!(error["error"], "Non hai il permesso di modificare questa ricetta.");

        let mut res = TestClient::put(&url)
            .bearer_auth(&anna)
            .json(&json!({"title": "Culurgiones d'Ogliastra", "ingredients": ["patate"]}))
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::OK));
        let updated: Value = res.take_json().await.unwrap();
        assert_eq!(updated["slug"], "culurgiones");
        assert_eq!(updated["ingredients"].as_array().unwrap().len(), 1);
        assert_eq!(updated["instructions"].as_array().unwrap().len(), 2);

        let res = TestClient::delete(&url).bearer_auth(&bruno).send(service).await;
        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
        let res = TestClient::delete(&url).bearer_auth(&anna).send(service).await;
        assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
        let res = TestClient::get(&url).send(service).await;
        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_likes_reports_and_my_recipes() {
        let app = TestApp::new().await;
        let service = &app.service;
        let (_, anna) = app.user("anna@example.com").await;
        let (_, bruno) = app.user("bruno@example.com").await;
        let mut res = TestClient::post(format!("{API}/recipes/"))
            .bearer_auth(&anna)
            .json(&recipe("Seadas"))
            .send(service)
            .await;
        let created: Value = res.take_json().await.unwrap();
        let id = created["id"].as_i64().unwrap();

        let mut res = TestClient::post(format!("{API}/recipes/{id}/like/"))
            .bearer_auth(&bruno)
            .send(service)
            .await;
        let toggled: Value = res.take_json().await.unwrap();
        assert_eq!(toggled, json!({"liked": true, "likes_count": 1}));
        let mut res = TestClient::post(format!("{API}/recipes/seadas/like"))
            .bearer_auth(&bruno)
            .send(service)
            .await;
        let toggled: Value = res.take_json().await.unwrap();
        assert_eq!(toggled, json!({"liked": false, "likes_count": 0}));

        let res = TestClient::post(format!("{API}/recipes/{id}/report/"))
            .bearer_auth(&bruno)
            .json(&json!({"reason": "spam", "description": "pubblicità"}))
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        let mut res = TestClient::post(format!("{API}/recipes/{id}/report/"))
            .bearer_auth(&bruno)
            .send(service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        let error: Value = res.take_json().await.unwrap();
        assert_eq!(error["error"], "Hai già segnalato questa ricetta.");
        let mut res = TestClient::post(format!("{API}/recipes/{id}/report/"))
            .bearer_auth(&anna)
            .send(service)
            .await;
        let error: Value = res.take_json().await.unwrap();
        assert_eq!(error["error"], "Non puoi segnalare la tua stessa ricetta.");

        let mut res = TestClient::get(format!("{API}/recipes/my/"))
            .bearer_auth(&anna)
            .send(service)
            .await;
        let mine: Vec<Value> = res.take_json().await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["reports_count"], 1);
    }

    #[tokio::test]
    async fn test_listing_filters() {
        let app = TestApp::new().await;
        let service = &app.service;
        let (_, token) = app.user("anna@example.com").await;
        for (title, category, gluten_free) in [
            ("Pane carasau", "Bread & Pizza", false),
            ("Pardulas", "Desserts", true),
        ] {
            let mut body = recipe(title);
            body["category"] = json!(category);
            body["gluten_free"] = json!(gluten_free);
            let res = TestClient::post(format!("{API}/recipes/"))
                .bearer_auth(&token)
                .json(&body)
                .send(service)
                .await;
            assert_eq!(res.status_code, Some(StatusCode::CREATED));
        }

        let titles = |mut res: salvo::Response| async move {
            let recipes: Vec<Value> = res.take_json().await.unwrap();
            recipes
                .into_iter()
                .map(|r| r["title"].as_str().unwrap().to_owned())
                .collect::<Vec<_>>()
        };
        let res = TestClient::get(format!("{API}/recipes/"))
            .query("gluten_free", "yes")
            .send(service)
            .await;
        assert_eq!(titles(res).await, ["Pardulas"]);
        let res = TestClient::get(format!("{API}/recipes/"))
            .query("category", "Bread & Pizza")
            .send(service)
            .await;
        assert_eq!(titles(res).await, ["Pane carasau"]);
        let res = TestClient::get(format!("{API}/recipes/"))
            .query("search", "PARDU")
            .send(service)
            .await;
        assert_eq!(titles(res).await, ["Pardulas"]);
        let res = TestClient::get(format!("{API}/recipes/")).send(service).await;
        assert_eq!(titles(res).await, ["Pardulas", "Pane carasau"]);
    }

    #[tokio::test]
    async fn test_order_by_likes_keeps_featured_first() {
        let app = TestApp::new().await;
        let service = &app.service;
        let (_, anna) = app.user("anna@example.com").await;
        let (_, bruno) = app.user("bruno@example.com").await;
        let (_, carla) = app.user("carla@example.com").await;
        let mut ids = Vec::new();
        for title in ["Pane carasau", "Pardulas", "Seadas"] {
            let mut res = TestClient::post(format!("{API}/recipes/"))
                .bearer_auth(&anna)
                .json(&recipe(title))
                .send(service)
                .await;
            let created: Value = res.take_json().await.unwrap();
            ids.push(created["id"].as_i64().unwrap());
        }
        for (token, id) in [(&bruno, ids[0]), (&carla, ids[0]), (&bruno, ids[1])] {
            let res = TestClient::post(format!("{API}/recipes/{id}/like/"))
                .bearer_auth(token)
                .send(service)
                .await;
            assert_eq!(res.status_code, Some(StatusCode::OK));
        }
        app.state.store.moderate_recipe(ids[2], None, Some(true)).await.unwrap();

        let titles = |mut res: salvo::Response| async move {
            let recipes: Vec<Value> = res.take_json().await.unwrap();
            recipes
                .into_iter()
                .map(|r| r["title"].as_str().unwrap().to_owned())
                .collect::<Vec<_>>()
        };
        for order in ["likes", "most_liked"] {
            let res = TestClient::get(format!("{API}/recipes/"))
                .query("order_by", order)
                .send(service)
                .await;
            assert_eq!(titles(res).await, ["Seadas", "Pane carasau", "Pardulas"], "{order}");
        }
        let res = TestClient::get(format!("{API}/recipes/")).send(service).await;
        assert_eq!(titles(res).await, ["Seadas", "Pardulas", "Pane carasau"]);
    }
}
