use axum::{Json, extract::State};

use weather_core::process::UPLOADED_MESSAGE;

use crate::dto::{MessageResponse, UploadRequest};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Store a city list under a process id.
pub async fn upload_city_list(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UploadRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.cities_ids.is_empty() {
        return Err(ApiError::Unprocessable(
            "cities_ids must not be empty".to_string(),
        ));
    }

    weather_core::upload_city_list(state.store.as_ref(), request.process_id, request.cities_ids)
        .await?;

    Ok(Json(MessageResponse::new(UPLOADED_MESSAGE)))
}
