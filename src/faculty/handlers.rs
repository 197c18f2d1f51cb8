use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    faculty::{
        dto::UpdateStatusRequest,
        model::{PublicFaculty, Status},
    },
    realtime::STATUS_UPDATED,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_faculty))
        .route("/me", get(get_me))
        .route("/status", put(update_status))
}

/// Public directory of every faculty member. No auth required.
#[instrument(skip(state))]
pub async fn list_faculty(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicFaculty>>, ApiError> {
    let all = state.store.list_all().await?;
    Ok(Json(all.into_iter().map(PublicFaculty::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(faculty_id): AuthUser,
) -> Result<Json<PublicFaculty>, ApiError> {
    let faculty = state
        .store
        .find_by_id(faculty_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Faculty not found".into()))?;
    Ok(Json(faculty.into()))
}

/// Change the caller's own availability. The broadcast happens after the
/// store write succeeds, so viewers only ever see persisted state.
#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(faculty_id): AuthUser,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<PublicFaculty>, ApiError> {
    let status = Status::parse(&payload.status)
        .ok_or_else(|| ApiError::Validation("Invalid status value".into()))?;
    let message = payload.status_message.unwrap_or_default();

    let faculty = state
        .store
        .update_status(faculty_id, status, message)
        .await?;
    let public = PublicFaculty::from(faculty);

    state.notifier.broadcast(STATUS_UPDATED, &public);

    info!(faculty_id = %faculty_id, status = status.as_str(), "status updated");
    Ok(Json(public))
}
