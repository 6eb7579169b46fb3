pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod media;
pub(crate) mod recipes;
pub(crate) mod sitemap;
pub(crate) mod stories;

use ricette_blog::RecipeKey;
use salvo::Request;

use crate::error::ApiError;

/// The `{id}` path parameter. A non-numeric id matches nothing.
fn id_param(req: &Request) -> Result<i64, ApiError> {
    req.param::<i64>("id").ok_or_else(ApiError::not_found)
}

/// The `{slug_or_id}` path parameter.
fn recipe_key(req: &Request) -> Result<RecipeKey, ApiError> {
    req.param::<String>("slug_or_id")
        .map(|key| RecipeKey::parse(&key))
        .ok_or_else(ApiError::not_found)
}

/// The `search` query parameter, if not blank.
fn search(req: &Request) -> Option<String> {
    req.query::<String>("search")
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}
