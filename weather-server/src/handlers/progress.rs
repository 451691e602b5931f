use axum::{Json, extract::State};

use weather_core::{ProgressReport, read_progress};

use crate::dto::ProgressQuery;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// Report fetch progress and the results collected so far.
pub async fn get_city_data_process(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProgressQuery>,
) -> Result<Json<ProgressReport>, ApiError> {
    let report = read_progress(state.store.as_ref(), query.process_id).await?;
    Ok(Json(report))
}
