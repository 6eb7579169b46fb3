use ricette_blog::{Credentials, Registration, Session, TokenPair, UserProfile};
use salvo::prelude::*;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

const REGISTERED: &str = "User registered successfully";
const LOGGED_IN: &str = "Login successful";
const REFRESH_REQUIRED: &str = "Questo campo è obbligatorio.";

#[derive(Serialize)]
struct SessionResponse {
    #[serde(flatten)]
    session: Session,
    message: &'static str,
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    refresh: String,
}

#[handler]
pub(crate) async fn register(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    let registration: Registration = req.parse_json().await?;
    let session = state.store.register(&state.tokens, &registration).await?;
    res.status_code(StatusCode::CREATED);
    res.render(Json(SessionResponse {
        session,
        message: REGISTERED,
    }));
    Ok(())
}

#[handler]
pub(crate) async fn login(req: &mut Request, depot: &mut Depot) -> Result<Json<SessionResponse>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let credentials: Credentials = req.parse_json().await?;
    let session = state.store.login(&state.tokens, &credentials).await?;
    Ok(Json(SessionResponse {
        session,
        message: LOGGED_IN,
    }))
}

#[handler]
pub(crate) async fn me(depot: &mut Depot) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(depot.require_user()?.profile()))
}

/// Trades a refresh token for a new pair. The old refresh token stays valid until it expires.
#[handler]
pub(crate) async fn refresh(req: &mut Request, depot: &mut Depot) -> Result<Json<TokenPair>, ApiError> {
    let state = AppState::from_depot(depot)?;
    let body: RefreshRequest = req.parse_json().await?;
    if body.refresh.trim().is_empty() {
        return Err(ApiError::bad_request(REFRESH_REQUIRED));
    }
    let tokens = state.store.refresh_tokens(&state.tokens, body.refresh.trim()).await?;
    Ok(Json(tokens))
}
