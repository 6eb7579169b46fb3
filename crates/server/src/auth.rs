//! Bearer-token authentication.
//!
//! [`jwt_auth`] decodes the `Authorization: Bearer` header without rejecting anything;
//! [`load_user`] then turns a valid access token into the active [`User`] stored in the
//! depot. Handlers read it with [`CurrentUser`].

use ricette_blog::{Claims, TokenKind, User};
use salvo::jwt_auth::{ConstDecoder, HeaderFinder};
use salvo::prelude::*;

use crate::error::{AUTH_REQUIRED, ApiError};
use crate::state::AppState;

const CURRENT_USER_KEY: &str = "ricette::current_user";
const INVALID_TOKEN: &str = "Token non valido o scaduto.";
const WRONG_TOKEN_KIND: &str = "Tipo di token non valido.";

pub(crate) fn jwt_auth(secret: &[u8]) -> JwtAuth<Claims, ConstDecoder> {
    JwtAuth::new(ConstDecoder::from_secret(secret))
        .finders(vec![Box::new(HeaderFinder::new())])
        .force_passed(true)
}

/// Access to the authenticated user of a request.
pub(crate) trait CurrentUser {
    /// The user, if the request carried a valid access token.
    fn current_user(&self) -> Option<&User>;

    /// The user, or a 401 for anonymous requests.
    fn require_user(&self) -> Result<&User, ApiError> {
        self.current_user()
            .ok_or_else(|| ApiError::unauthorized(AUTH_REQUIRED))
    }
}

impl CurrentUser for Depot {
    fn current_user(&self) -> Option<&User> {
        self.get::<User>(CURRENT_USER_KEY).ok()
    }
}

async fn authenticate(depot: &Depot, state: &AppState) -> Result<Option<User>, ApiError> {
    match depot.jwt_auth_state() {
        JwtAuthState::Unauthorized => Ok(None),
        JwtAuthState::Forbidden => Err(ApiError::unauthorized(INVALID_TOKEN)),
        JwtAuthState::Authorized => {
            let Some(data) = depot.jwt_auth_data::<Claims>() else {
                return Err(ApiError::unauthorized(INVALID_TOKEN));
            };
            if data.claims.token_type != TokenKind::Access {
                return Err(ApiError::unauthorized(WRONG_TOKEN_KIND));
            }
            let subject = data.claims.sub.clone();
            Ok(Some(state.store.active_user(&subject).await?))
        }
    }
}

/// Loads the user behind the bearer token. Anonymous requests pass through; a bad
/// token, a refresh token or a disabled account is a 401.
#[handler]
pub(crate) async fn load_user(depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
    let state = match AppState::from_depot(depot) {
        Ok(state) => state,
        Err(e) => {
            res.render(e);
            ctrl.skip_rest();
            return;
        }
    };
    match authenticate(depot, &state).await {
        Ok(Some(user)) => {
            depot.insert(CURRENT_USER_KEY, user);
        }
        Ok(None) => {}
        Err(e) => {
            res.render(e);
            ctrl.skip_rest();
        }
    }
}

/// Lets only staff members through.
#[handler]
pub(crate) async fn require_staff(depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
    let verdict = match depot.current_user() {
        None => Err(ApiError::unauthorized(AUTH_REQUIRED)),
        Some(user) if !user.is_staff => {
            tracing::info!(user_id = user.id, "non-staff user refused from the admin API");
            Err(ApiError::forbidden())
        }
        Some(_) => Ok(()),
    };
    if let Err(e) = verdict {
        res.render(e);
        ctrl.skip_rest();
    }
}
