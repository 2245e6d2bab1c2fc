//! Persistence boundary for users, recipes, tags and ingredients.
//!
//! Handlers and services only talk to [`RecordStore`]; `PgStore` backs it with
//! PostgreSQL and `MemoryStore` keeps everything in process for tests.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::repo::User,
    ingredients::repo::Ingredient,
    recipes::repo::{NewRecipe, Recipe},
    tags::{dto::TagPayload, repo::Tag},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (user email, per-user tag or ingredient name) is taken.
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Classify a driver error, turning unique violations into `Duplicate`.
    pub(crate) fn classify(err: anyhow::Error, what: &'static str) -> Self {
        let unique = err
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            StoreError::Duplicate(what)
        } else {
            StoreError::Other(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    // users
    async fn create_user(&self, email: &str, name: &str, password_hash: &str) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    // recipes
    async fn insert_recipe(&self, user_id: Uuid, recipe: &NewRecipe) -> StoreResult<Recipe>;
    async fn find_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Option<Recipe>>;
    /// Newest first. A non-empty `tag_ids` keeps recipes carrying any of them.
    async fn list_recipes(&self, user_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<Vec<Recipe>>;
    /// `false` when the recipe was deleted in the meantime.
    async fn save_recipe(&self, recipe: &Recipe) -> StoreResult<bool>;
    async fn delete_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<bool>;

    // tags
    /// Returns the caller's tag matching every attribute of `tag`, creating it
    /// when absent. Never produces two tags with the same (user, name).
    async fn get_or_create_tag(&self, user_id: Uuid, tag: &TagPayload) -> StoreResult<Tag>;
    /// Replaces the whole association set of a recipe.
    async fn set_recipe_tags(&self, recipe_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()>;
    /// `(recipe_id, tag)` pairs for the given recipes, ordered by tag name.
    async fn tags_for_recipes(&self, recipe_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>>;
    async fn list_tags(&self, user_id: Uuid, assigned_only: bool) -> StoreResult<Vec<Tag>>;
    async fn rename_tag(&self, user_id: Uuid, tag_id: Uuid, name: &str) -> StoreResult<Option<Tag>>;
    async fn delete_tag(&self, user_id: Uuid, tag_id: Uuid) -> StoreResult<bool>;

    // ingredients
    async fn list_ingredients(&self, user_id: Uuid) -> StoreResult<Vec<Ingredient>>;
    async fn create_ingredient(&self, user_id: Uuid, name: &str) -> StoreResult<Ingredient>;
    async fn rename_ingredient(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Ingredient>>;
    async fn delete_ingredient(&self, user_id: Uuid, ingredient_id: Uuid) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_keeps_non_database_errors() {
        let err = StoreError::classify(anyhow::anyhow!("connection reset"), "tag");
        assert!(matches!(err, StoreError::Other(_)));
    }

    #[test]
    fn classify_sees_through_context() {
        let err = anyhow::Error::new(sqlx::Error::RowNotFound).context("find tag");
        assert!(matches!(StoreError::classify(err, "tag"), StoreError::Other(_)));
    }
}
