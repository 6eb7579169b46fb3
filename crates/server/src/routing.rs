use salvo::affix_state;
use salvo::catch_panic::CatchPanic;
use salvo::catcher::Catcher;
use salvo::cors::{AllowHeaders, AllowOrigin, Cors};
use salvo::http::Method;
use salvo::logging::Logger;
use salvo::prelude::*;

use crate::auth::{jwt_auth, load_user};
use crate::error::json_errors;
use crate::handlers::{admin, auth, media, recipes, sitemap, stories};
use crate::state::AppState;

/// All routes. API routes live under `/api/`; trailing slashes are optional.
pub fn router(state: AppState) -> Router {
    let api = api_routes(state.config.jwt_secret.as_bytes());
    Router::new()
        .hoop(affix_state::inject(state))
        .push(Router::with_path("sitemap.xml").get(sitemap::sitemap))
        .push(Router::with_path("media/{**path}").get(media::serve))
        .push(
            Router::with_path("api")
                // Refreshing ignores any stale access token sent along.
                .push(Router::with_path("auth/token/refresh").post(auth::refresh))
                .push(api),
        )
}

fn api_routes(jwt_secret: &[u8]) -> Router {
    Router::new()
        .hoop(jwt_auth(jwt_secret))
        .hoop(load_user)
        .push(
            Router::with_path("auth")
                .push(Router::with_path("register").post(auth::register))
                .push(Router::with_path("login").post(auth::login))
                .push(Router::with_path("me").get(auth::me)),
        )
        .push(
            Router::with_path("recipes")
                .get(recipes::list)
                .post(recipes::create)
                .push(Router::with_path("my").get(recipes::mine))
                .push(Router::with_path("category_counts").get(recipes::category_counts))
                .push(
                    Router::with_path("{slug_or_id}")
                        .get(recipes::show)
                        .put(recipes::update)
                        .patch(recipes::update)
                        .delete(recipes::destroy)
                        .push(Router::with_path("like").post(recipes::like))
                        .push(Router::with_path("report").post(recipes::report)),
                ),
        )
        .push(
            Router::with_path("stories")
                .get(stories::list)
                .push(Router::with_path("{id}").get(stories::show)),
        )
        .push(admin::router())
}

fn cors(state: &AppState) -> Cors {
    let origins = &state.config.cors_origins;
    let origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().cloned())
    };
    Cors::new()
        .allow_origin(origin)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            salvo::http::header::AUTHORIZATION,
            salvo::http::header::CONTENT_TYPE,
        ]))
}

/// The router wrapped with access logging, CORS, panic containment and JSON error pages.
pub fn service(state: AppState) -> Service {
    let cors = cors(&state).into_handler();
    Service::new(router(state))
        .hoop(Logger::new())
        .hoop(CatchPanic::new())
        .hoop(cors)
        .catcher(Catcher::default().hoop(json_errors))
}
