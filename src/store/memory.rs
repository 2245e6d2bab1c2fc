use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::{
    auth::repo::User,
    ingredients::repo::Ingredient,
    recipes::repo::{NewRecipe, Recipe},
    tags::{dto::TagPayload, repo::Tag},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    recipes: Vec<Recipe>, // insertion order
    tags: Vec<Tag>,
    ingredients: Vec<Ingredient>,
    recipe_tags: Vec<(Uuid, Uuid)>,
}

/// In-process store. Every operation runs under one lock, so get-or-create is
/// atomic with respect to concurrent callers.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Other(anyhow::anyhow!("memory store lock poisoned")))
    }
}

fn by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| name(a).cmp(name(b)));
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_user(&self, email: &str, name: &str, password_hash: &str) -> StoreResult<User> {
        let mut t = self.tables()?;
        if t.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate("user"));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn insert_recipe(&self, user_id: Uuid, recipe: &NewRecipe) -> StoreResult<Recipe> {
        let record = Recipe {
            id: Uuid::new_v4(),
            user_id,
            title: recipe.title.clone(),
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link.clone(),
            description: recipe.description.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables()?.recipes.push(record.clone());
        Ok(record)
    }

    async fn find_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<Option<Recipe>> {
        Ok(self
            .tables()?
            .recipes
            .iter()
            .find(|r| r.id == recipe_id && r.user_id == user_id)
            .cloned())
    }

    async fn list_recipes(&self, user_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<Vec<Recipe>> {
        let t = self.tables()?;
        let tagged = |recipe_id: Uuid| {
            tag_ids.is_empty()
                || t
                    .recipe_tags
                    .iter()
                    .any(|(r, tag)| *r == recipe_id && tag_ids.contains(tag))
        };
        Ok(t.recipes
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id && tagged(r.id))
            .cloned()
            .collect())
    }

    async fn save_recipe(&self, recipe: &Recipe) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let Some(slot) = t
            .recipes
            .iter_mut()
            .find(|r| r.id == recipe.id && r.user_id == recipe.user_id)
        else {
            return Ok(false);
        };
        *slot = recipe.clone();
        Ok(true)
    }

    async fn delete_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let before = t.recipes.len();
        t.recipes.retain(|r| !(r.id == recipe_id && r.user_id == user_id));
        let removed = t.recipes.len() < before;
        if removed {
            t.recipe_tags.retain(|(r, _)| *r != recipe_id);
        }
        Ok(removed)
    }

    async fn get_or_create_tag(&self, user_id: Uuid, tag: &TagPayload) -> StoreResult<Tag> {
        let mut t = self.tables()?;
        if let Some(existing) = t
            .tags
            .iter()
            .find(|existing| existing.user_id == user_id && existing.name == tag.name)
        {
            return Ok(existing.clone());
        }
        let created = Tag {
            id: Uuid::new_v4(),
            user_id,
            name: tag.name.clone(),
        };
        t.tags.push(created.clone());
        Ok(created)
    }

    async fn set_recipe_tags(&self, recipe_id: Uuid, tag_ids: &[Uuid]) -> StoreResult<()> {
        let mut t = self.tables()?;
        t.recipe_tags.retain(|(r, _)| *r != recipe_id);
        for tag_id in tag_ids {
            if !t.recipe_tags.contains(&(recipe_id, *tag_id)) {
                t.recipe_tags.push((recipe_id, *tag_id));
            }
        }
        Ok(())
    }

    async fn tags_for_recipes(&self, recipe_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, Tag)>> {
        let t = self.tables()?;
        let mut pairs: Vec<(Uuid, Tag)> = t
            .recipe_tags
            .iter()
            .filter(|(r, _)| recipe_ids.contains(r))
            .filter_map(|(r, tag_id)| {
                t.tags
                    .iter()
                    .find(|tag| tag.id == *tag_id)
                    .map(|tag| (*r, tag.clone()))
            })
            .collect();
        by_name(&mut pairs, |(_, tag)| tag.name.as_str());
        Ok(pairs)
    }

    async fn list_tags(&self, user_id: Uuid, assigned_only: bool) -> StoreResult<Vec<Tag>> {
        let t = self.tables()?;
        let mut tags: Vec<Tag> = t
            .tags
            .iter()
            .filter(|tag| tag.user_id == user_id)
            .filter(|tag| !assigned_only || t.recipe_tags.iter().any(|(_, id)| *id == tag.id))
            .cloned()
            .collect();
        by_name(&mut tags, |tag| tag.name.as_str());
        Ok(tags)
    }

    async fn rename_tag(&self, user_id: Uuid, tag_id: Uuid, name: &str) -> StoreResult<Option<Tag>> {
        let mut t = self.tables()?;
        if t
            .tags
            .iter()
            .any(|tag| tag.user_id == user_id && tag.id != tag_id && tag.name == name)
        {
            return Err(StoreError::Duplicate("tag"));
        }
        Ok(t
            .tags
            .iter_mut()
            .find(|tag| tag.id == tag_id && tag.user_id == user_id)
            .map(|tag| {
                tag.name = name.to_string();
                tag.clone()
            }))
    }

    async fn delete_tag(&self, user_id: Uuid, tag_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let before = t.tags.len();
        t.tags.retain(|tag| !(tag.id == tag_id && tag.user_id == user_id));
        let removed = t.tags.len() < before;
        if removed {
            t.recipe_tags.retain(|(_, id)| *id != tag_id);
        }
        Ok(removed)
    }

    async fn list_ingredients(&self, user_id: Uuid) -> StoreResult<Vec<Ingredient>> {
        let mut rows: Vec<Ingredient> = self
            .tables()?
            .ingredients
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        by_name(&mut rows, |i| i.name.as_str());
        Ok(rows)
    }

    async fn create_ingredient(&self, user_id: Uuid, name: &str) -> StoreResult<Ingredient> {
        let mut t = self.tables()?;
        if t.ingredients.iter().any(|i| i.user_id == user_id && i.name == name) {
            return Err(StoreError::Duplicate("ingredient"));
        }
        let row = Ingredient {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
        };
        t.ingredients.push(row.clone());
        Ok(row)
    }

    async fn rename_ingredient(
        &self,
        user_id: Uuid,
        ingredient_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Ingredient>> {
        let mut t = self.tables()?;
        if t
            .ingredients
            .iter()
            .any(|i| i.user_id == user_id && i.id != ingredient_id && i.name == name)
        {
            return Err(StoreError::Duplicate("ingredient"));
        }
        Ok(t
            .ingredients
            .iter_mut()
            .find(|i| i.id == ingredient_id && i.user_id == user_id)
            .map(|i| {
                i.name = name.to_string();
                i.clone()
            }))
    }

    async fn delete_ingredient(&self, user_id: Uuid, ingredient_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let before = t.ingredients.len();
        t.ingredients
            .retain(|i| !(i.id == ingredient_id && i.user_id == user_id));
        Ok(t.ingredients.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> TagPayload {
        TagPayload { name: name.into() }
    }

    #[tokio::test]
    async fn get_or_create_tag_reuses_existing_per_user() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = store.get_or_create_tag(alice, &tag("vegan")).await.unwrap();
        let again = store.get_or_create_tag(alice, &tag("vegan")).await.unwrap();
        let other = store.get_or_create_tag(bob, &tag("vegan")).await.unwrap();

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, other.id);
        assert_eq!(store.list_tags(alice, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn set_recipe_tags_replaces_and_dedups() {
        let store = MemoryStore::new();
        let recipe = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.set_recipe_tags(recipe, &[a, b]).await.unwrap();
        store.set_recipe_tags(recipe, &[c, c]).await.unwrap();

        let t = store.tables().unwrap();
        assert_eq!(t.recipe_tags, vec![(recipe, c)]);
    }

    #[tokio::test]
    async fn deleting_a_tag_drops_its_associations() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let spicy = store.get_or_create_tag(user, &tag("spicy")).await.unwrap();
        let recipe = Uuid::new_v4();
        store.set_recipe_tags(recipe, &[spicy.id]).await.unwrap();

        assert!(store.delete_tag(user, spicy.id).await.unwrap());
        assert!(store.tags_for_recipes(&[recipe]).await.unwrap().is_empty());
        assert!(!store.delete_tag(user, spicy.id).await.unwrap());
    }

    #[tokio::test]
    async fn assigned_only_filters_unused_tags() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let used = store.get_or_create_tag(user, &tag("used")).await.unwrap();
        store.get_or_create_tag(user, &tag("idle")).await.unwrap();
        store.set_recipe_tags(Uuid::new_v4(), &[used.id]).await.unwrap();

        let all = store.list_tags(user, false).await.unwrap();
        let assigned = store.list_tags(user, true).await.unwrap();
        assert_eq!(all.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), ["idle", "used"]);
        assert_eq!(assigned, vec![used]);
    }

    #[tokio::test]
    async fn saving_a_deleted_recipe_reports_a_miss() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let new = NewRecipe {
            title: "Toast".into(),
            time_minutes: 3,
            price: rust_decimal::Decimal::ONE,
            link: String::new(),
            description: String::new(),
        };
        let mut recipe = store.insert_recipe(user, &new).await.unwrap();

        recipe.title = "French toast".into();
        assert!(store.save_recipe(&recipe).await.unwrap());
        assert!(store.delete_recipe(user, recipe.id).await.unwrap());
        assert!(!store.save_recipe(&recipe).await.unwrap());
        assert!(store.find_recipe(user, recipe.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn renaming_onto_an_existing_name_is_a_duplicate() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.create_ingredient(user, "salt").await.unwrap();
        let pepper = store.create_ingredient(user, "pepper").await.unwrap();

        let err = store.rename_ingredient(user, pepper.id, "salt").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("ingredient")));
        let err = store.create_ingredient(user, "salt").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("ingredient")));
    }

    #[tokio::test]
    async fn other_users_records_are_invisible() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let ingredient = store.create_ingredient(owner, "flour").await.unwrap();

        assert!(store.list_ingredients(stranger).await.unwrap().is_empty());
        assert!(store
            .rename_ingredient(stranger, ingredient.id, "sugar")
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_ingredient(stranger, ingredient.id).await.unwrap());
    }
}
