use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{RecipeCreate, RecipeDetailRepr, RecipeListQuery, RecipePatch, RecipeRepr, RecipeReplace},
    services,
};
use crate::{
    auth::extractors::{AuthUser, Caller},
    error::AppError,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route(
            "/recipes/:id",
            put(replace_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeRepr>>, AppError> {
    let tag_ids = q.tag_ids()?;
    let recipes = services::list_recipes(state.store.as_ref(), &user.into(), &tag_ids).await?;
    Ok(Json(recipes.into_iter().map(RecipeRepr::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetailRepr>, AppError> {
    let recipe = services::get_recipe(state.store.as_ref(), &user.into(), id).await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RecipeCreate>,
) -> Result<(StatusCode, Json<RecipeDetailRepr>), AppError> {
    let payload = payload.validated()?;
    let recipe = services::create_recipe(state.store.as_ref(), &user.into(), payload).await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

/// PUT: every column is overwritten, `tags` only when supplied.
#[instrument(skip(state, payload))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipeReplace>,
) -> Result<Json<RecipeDetailRepr>, AppError> {
    update(state, user.into(), id, RecipePatch::from(payload)).await
}

#[instrument(skip(state, payload))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipePatch>,
) -> Result<Json<RecipeDetailRepr>, AppError> {
    update(state, user.into(), id, payload).await
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_recipe(state.store.as_ref(), &user.into(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update(
    state: AppState,
    caller: Caller,
    id: Uuid,
    changes: RecipePatch,
) -> Result<Json<RecipeDetailRepr>, AppError> {
    let changes = changes.validated()?;
    let recipe = services::update_recipe(state.store.as_ref(), &caller, id, changes).await?;
    Ok(Json(recipe.into()))
}
