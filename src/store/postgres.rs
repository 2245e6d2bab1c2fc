use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::{
    auth::repo::User,
    ingredients::{self, repo::Ingredient},
    recipes::{
        self,
        repo::{NewRecipe, Recipe},
    },
    tags::{self, dto::TagPayload, repo::Tag},
};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn create_user(&self, email: &str, name: &str, password_hash: &str) -> StoreResult<User> {
        User::create(&self.db, email, name, password_hash)
            .await
            .map_err(|e| StoreError::classify(e, "user"))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.db, email).await?)
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.db, user_id).await?)
    }

    async fn insert_recipe(&self, user_id: Uuid, recipe: &NewRecipe) -> StoreResult<Recipe> {
        Ok(recipes::repo::insert(&self.db, user_id, recipe).await?)
    }

    async fn find_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Option<Recipe>> {
        Ok(recipes::repo::find(&self.db, user_id, recipe_id).await?)
    }

    async fn list_recipes(&self, user_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<Vec<Recipe>> {
        Ok(recipes::repo::list_by_user(&self.db, user_id, tag_ids).await?)
    }

    async fn save_recipe(&self, recipe: &Recipe) -> StoreResult<bool> {
        Ok(recipes::repo::update(&self.db, recipe).await?)
    }

    async fn delete_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        Ok(recipes::repo::delete(&self.db, user_id, recipe_id).await?)
    }

    async fn get_or_create_tag(&self, user_id: Uuid, tag: &TagPayload) -> StoreResult<Tag> {
        Ok(tags::repo::get_or_create(&self.db, user_id, &tag.name).await?)
    }

    async fn set_recipe_tags(&self, recipe_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        Ok(tags::repo::replace_for_recipe(&self.db, recipe_id, tag_ids).await?)
    }

    async fn tags_for_recipes(&self, recipe_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>> {
        Ok(tags::repo::list_for_recipes(&self.db, recipe_ids).await?)
    }

    async fn list_tags(&self, user_id: Uuid, assigned_only: bool) -> StoreResult<Vec<Tag>> {
        Ok(tags::repo::list_by_user(&self.db, user_id, assigned_only).await?)
    }

    async fn rename_tag(&self, user_id: Uuid, tag_id: Uuid, name: &str) -> StoreResult<Option<Tag>> {
        tags::repo::rename(&self.db, user_id, tag_id, name)
            .await
            .map_err(|e| StoreError::classify(e, "tag"))
    }

    async fn delete_tag(&self, user_id: Uuid, tag_id: Uuid) -> StoreResult<bool> {
        Ok(tags::repo::delete(&self.db, user_id, tag_id).await?)
    }

    async fn list_ingredients(&self, user_id: Uuid) -> StoreResult<Vec<Ingredient>> {
        Ok(ingredients::repo::list_by_user(&self.db, user_id).await?)
    }

    async fn create_ingredient(&self, user_id: Uuid, name: &str) -> StoreResult<Ingredient> {
        ingredients::repo::create(&self.db, user_id, name)
            .await
            .map_err(|e| StoreError::classify(e, "ingredient"))
    }

    async fn rename_ingredient(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Ingredient>> {
        ingredients::repo::rename(&self.db, user_id, ingredient_id, name)
            .await
            .map_err(|e| StoreError::classify(e, "ingredient"))
    }

    async fn delete_ingredient(&self, user_id: Uuid, ingredient_id: Uuid) -> StoreResult<bool> {
        Ok(ingredients::repo::delete(&self.db, user_id, ingredient_id).await?)
    }
}
