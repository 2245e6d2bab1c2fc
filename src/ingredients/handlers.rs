use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{IngredientPayload, IngredientRepr};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route(
            "/ingredients/:id",
            put(rename_ingredient)
                .patch(rename_ingredient)
                .delete(delete_ingredient),
        )
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<IngredientRepr>>, AppError> {
    let rows = state.store.list_ingredients(user_id).await?;
    Ok(Json(rows.into_iter().map(IngredientRepr::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<IngredientPayload>,
) -> Result<(StatusCode, Json<IngredientRepr>), AppError> {
    let payload = payload.validated()?;
    let row = state.store.create_ingredient(user_id, &payload.name).await?;
    info!(ingredient_id = %row.id, %user_id, "ingredient created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state, payload))]
pub async fn rename_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<IngredientPayload>,
) -> Result<Json<IngredientRepr>, AppError> {
    let payload = payload.validated()?;
    let row = state
        .store
        .rename_ingredient(user_id, id, &payload.name)
        .await?
        .ok_or(AppError::NotFound("ingredient"))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_ingredient(user_id, id).await? {
        return Err(AppError::NotFound("ingredient"));
    }
    Ok(StatusCode::NO_CONTENT)
}
