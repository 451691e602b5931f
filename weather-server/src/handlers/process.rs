use axum::{Json, extract::State};

use weather_core::process::PROCESS_FINISHED_MESSAGE;

use crate::dto::{MessageResponse, ProcessRequest};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Fetch weather for every city stored under a process id.
///
/// Runs to completion inside the request; the route timeout bounds it.
pub async fn process_city_data_in_bulk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ProcessRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.fetcher.run(request.process_id).await?;
    Ok(Json(MessageResponse::new(PROCESS_FINISHED_MESSAGE)))
}
