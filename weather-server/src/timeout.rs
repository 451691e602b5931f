use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Abort the wrapped route once `AppState::route_timeout` has elapsed.
///
/// Dropping the inner future abandons any in-flight upstream calls; windows
/// already persisted by the fetch stage stay in the store.
pub async fn route_timeout(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();

    match tokio::time::timeout(state.route_timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, timeout_secs = state.route_timeout.as_secs_f64(), "request timed out");
            ApiError::RequestTimeout.into_response()
        }
    }
}
