//! Router configuration and route composition.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{process, progress, upload};
use crate::state::AppState;
use crate::timeout::route_timeout;

/// Creates the application router.
///
/// `/api/v1` carries the quick routes; `/api/v2` carries the long-running
/// bulk fetch behind the route timeout.
pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/upload-city-list", post(upload::upload_city_list))
        .route("/get-city-data-process", get(progress::get_city_data_process));

    let v2 = Router::new()
        .route(
            "/process-city-data-in-bulk",
            post(process::process_city_data_in_bulk),
        )
        .layer(middleware::from_fn_with_state(state.clone(), route_timeout));

    Router::new()
        .nest("/api/v1", v1)
        .nest("/api/v2", v2)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
