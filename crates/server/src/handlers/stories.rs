use ricette_blog::StoryPost;
use salvo::prelude::*;

use super::{id_param, search};
use crate::error::ApiError;
use crate::state::AppState;

#[handler]
pub(crate) async fn list(req: &mut Request, depot: &mut Depot) -> Result<Json<Vec<StoryPost>>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let stories = state.store.list_stories(search(req).as_deref()).await?;
    Ok(Json(stories))
}

#[handler]
pub(crate) async fn show(req: &mut Request, depot: &mut Depot) -> Result<Json<StoryPost>, ApiError> {
    let state = AppState::from_depot(depot)?;
    Ok(Json(state.store.story(id_param(req)?).await?))
}
