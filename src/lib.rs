pub mod assistant;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Environment;
use state::AppState;

/// 512 MB ceiling on uploaded source documents.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let environment = state.config.environment.clone();

    let router = Router::new()
        .merge(user_routes())
        .merge(set_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Permissive cross-origin access is gated to local development.
    if environment == Environment::Development {
        router.layer(dev_cors_layer())
    } else {
        router
    }
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
}

fn set_routes(state: AppState) -> Router<AppState> {
    use handlers::sets;

    Router::new()
        .route("/sets", get(sets::list_sets).post(sets::create_set))
        .route(
            "/sets/:set_id",
            get(sets::get_set)
                .put(sets::update_set)
                .delete(sets::delete_set),
        )
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::token_auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

fn dev_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://localhost:4173"),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("token"),
        ])
        .allow_credentials(true)
}
