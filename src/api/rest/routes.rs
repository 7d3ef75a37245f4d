use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::rest::{
    handlers, logging_middleware::request_logging_middleware, middleware::auth_middleware,
};
use crate::shared::models::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes
    let public_routes = Router::new().route("/version", get(version));

    // Protected routes
    let protected_routes = Router::new()
        // Projects and members
        .route(
            "/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/projects/{id}/members",
            post(handlers::projects::add_member),
        )
        // Tasks
        .route(
            "/projects/{id}/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/{id}",
            put(handlers::tasks::update_task).delete(handlers::tasks::delete_task),
        )
        // Checklist
        .route(
            "/checklist",
            get(handlers::checklist::list_items).post(handlers::checklist::create_item),
        )
        .route(
            "/checklist/{id}",
            put(handlers::checklist::update_item).delete(handlers::checklist::delete_item),
        )
        // Chats
        .route(
            "/chats",
            get(handlers::chats::list_chats).post(handlers::chats::create_chat),
        )
        .route("/chats/{id}", delete(handlers::chats::delete_chat))
        .route(
            "/chats/{id}/messages",
            get(handlers::chats::list_messages).post(handlers::chats::send_message),
        )
        // AI settings, actions and reports
        .route(
            "/ai/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/ai/test-connection",
            post(handlers::settings::test_connection),
        )
        .route("/ai/actions/parse", post(handlers::actions::parse_action))
        .route(
            "/ai/actions/execute",
            post(handlers::actions::execute_action),
        )
        .route("/ai/reports", post(handlers::reports::create_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes
        .merge(protected_routes)
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn version() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "api": "v1"
    }))
}
