use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{TagListQuery, TagPayload, TagRepr};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route(
            "/tags/:id",
            put(rename_tag)
                .patch(rename_tag)
                .delete(delete_tag),
        )
}

#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<TagListQuery>,
) -> Result<Json<Vec<TagRepr>>, AppError> {
    let tags = state.store.list_tags(user_id, q.assigned_only).await?;
    Ok(Json(tags.into_iter().map(TagRepr::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn rename_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagPayload>,
) -> Result<Json<TagRepr>, AppError> {
    let payload = payload.validated()?;
    let tag = state
        .store
        .rename_tag(user_id, id, &payload.name)
        .await?
        .ok_or(AppError::NotFound("tag"))?;
    info!(tag_id = %tag.id, %user_id, "tag renamed");
    Ok(Json(tag.into()))
}

#[instrument(skip(state))]
pub async fn delete_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_tag(user_id, id).await? {
        return Err(AppError::NotFound("tag"));
    }
    info!(tag_id = %id, %user_id, "tag deleted");
    Ok(StatusCode::NO_CONTENT)
}
