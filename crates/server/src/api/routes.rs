use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::{auth_middleware, metrics_middleware};
use super::{handlers, teams, users};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Health, config and metrics stay reachable without credentials
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics));

    let protected_routes = Router::new()
        // Users
        .route("/users", post(users::register))
        .route("/users/me", get(users::get_me).delete(users::delete_me))
        .route(
            "/users/me/github-repositories",
            get(users::list_github_repositories),
        )
        .route(
            "/users/me/repositories",
            get(users::get_selection).put(users::put_selection),
        )
        .route("/users/me/trigger", post(users::trigger))
        .route("/users/me/progress", get(users::get_progress))
        .route("/users/me/status", get(users::get_status))
        .route("/users/me/reset", post(users::reset))
        // Teams
        .route("/teams", post(teams::create_team).get(teams::list_teams))
        .route(
            "/teams/{name}",
            get(teams::get_team).delete(teams::delete_team),
        )
        .route("/teams/{name}/trigger", post(teams::trigger_team))
        .route("/teams/{name}/status", get(teams::get_team_status))
        .route("/teams/{name}/reset", post(teams::reset_team))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes).with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
