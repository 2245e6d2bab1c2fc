use std::collections::HashMap;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::Caller,
    error::AppError,
    recipes::dto::{RecipeCreate, RecipePatch, TaggedRecipe},
    store::RecordStore,
    tags::{dto::TagPayload, repo::Tag},
};

/// Resolves every tag payload to the caller's existing tag (or a new one) and
/// makes that set the recipe's complete association list.
///
/// Duplicate payloads collapse to one association. Tags created before a
/// failure are kept.
#[instrument(skip(store, tags), fields(count = tags.len()))]
pub async fn reconcile_tags(
    store: &dyn RecordStore,
    caller: &Caller,
    recipe_id: Uuid,
    tags: &[TagPayload],
) -> Result<Vec<Tag>, AppError> {
    let user_id = caller.require()?;

    let mut resolved: Vec<Tag> = Vec::with_capacity(tags.len());
    for payload in tags {
        let tag = store.get_or_create_tag(user_id, payload).await?;
        if !resolved.iter().any(|t| t.id == tag.id) {
            resolved.push(tag);
        }
    }

    let tag_ids: Vec<Uuid> = resolved.iter().map(|t| t.id).collect();
    store.set_recipe_tags(recipe_id, &tag_ids).await?;

    resolved.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(resolved)
}

#[instrument(skip(store, input))]
pub async fn create_recipe(
    store: &dyn RecordStore,
    caller: &Caller,
    input: RecipeCreate,
) -> Result<TaggedRecipe, AppError> {
    let user_id = caller.require()?;
    let (new, tags) = input.into_parts();

    let recipe = store.insert_recipe(user_id, &new).await?;
    let tags = reconcile_tags(store, caller, recipe.id, &tags).await?;

    info!(recipe_id = %recipe.id, %user_id, tags = tags.len(), "recipe created");
    Ok(TaggedRecipe { recipe, tags })
}

#[instrument(skip(store, changes))]
pub async fn update_recipe(
    store: &dyn RecordStore,
    caller: &Caller,
    recipe_id: Uuid,
    mut changes: RecipePatch,
) -> Result<TaggedRecipe, AppError> {
    let user_id = caller.require()?;
    let mut recipe = store
        .find_recipe(user_id, recipe_id)
        .await?
        .ok_or(AppError::NotFound("recipe"))?;

    let tags = match changes.take_tags() {
        Some(list) => reconcile_tags(store, caller, recipe.id, &list).await?,
        None => current_tags(store, recipe.id).await?,
    };

    changes.apply_to(&mut recipe);
    if !store.save_recipe(&recipe).await? {
        return Err(AppError::NotFound("recipe"));
    }

    info!(recipe_id = %recipe.id, %user_id, tags = tags.len(), "recipe updated");
    Ok(TaggedRecipe { recipe, tags })
}

pub async fn get_recipe(
    store: &dyn RecordStore,
    caller: &Caller,
    recipe_id: Uuid,
) -> Result<TaggedRecipe, AppError> {
    let user_id = caller.require()?;
    let recipe = store
        .find_recipe(user_id, recipe_id)
        .await?
        .ok_or(AppError::NotFound("recipe"))?;
    let tags = current_tags(store, recipe.id).await?;
    Ok(TaggedRecipe { recipe, tags })
}

pub async fn list_recipes(
    store: &dyn RecordStore,
    caller: &Caller,
    tag_filter: &[Uuid],
) -> Result<Vec<TaggedRecipe>, AppError> {
    let user_id = caller.require()?;
    let recipes = store.list_recipes(user_id, tag_filter).await?;

    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for (recipe_id, tag) in store.tags_for_recipes(&ids).await? {
        by_recipe.entry(recipe_id).or_default().push(tag);
    }

    Ok(recipes
        .into_iter()
        .map(|recipe| {
            let tags = by_recipe.remove(&recipe.id).unwrap_or_default();
            TaggedRecipe { recipe, tags }
        })
        .collect())
}

#[instrument(skip(store))]
pub async fn delete_recipe(
    store: &dyn RecordStore,
    caller: &Caller,
    recipe_id: Uuid,
) -> Result<(), AppError> {
    let user_id = caller.require()?;
    if !store.delete_recipe(user_id, recipe_id).await? {
        return Err(AppError::NotFound("recipe"));
    }
    info!(%recipe_id, %user_id, "recipe deleted");
    Ok(())
}

async fn current_tags(store: &dyn RecordStore, recipe_id: Uuid) -> Result<Vec<Tag>, AppError> {
    Ok(store
        .tags_for_recipes(&[recipe_id])
        .await?
        .into_iter()
        .map(|(_, tag)| tag)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    fn tag(name: &str) -> TagPayload {
        TagPayload { name: name.into() }
    }

    fn chili(tags: Vec<TagPayload>) -> RecipeCreate {
        RecipeCreate {
            title: "Chili".into(),
            time_minutes: 30,
            price: Decimal::new(550, 2),
            link: String::new(),
            description: String::new(),
            tags,
        }
    }

    fn names(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn duplicate_tags_collapse_on_create() {
        let store = MemoryStore::new();
        let caller = Caller::user(Uuid::new_v4());

        let created = create_recipe(&store, &caller, chili(vec![tag("spicy"), tag("spicy")]))
            .await
            .unwrap();
        assert_eq!(names(&created.tags), ["spicy"]);

        let read = get_recipe(&store, &caller, created.recipe.id).await.unwrap();
        assert_eq!(read.tags, created.tags);
    }

    #[tokio::test]
    async fn created_tag_names_match_the_request() {
        let store = MemoryStore::new();
        let caller = Caller::user(Uuid::new_v4());

        let created = create_recipe(
            &store,
            &caller,
            chili(vec![tag("vegan"), tag("dinner"), tag("vegan"), tag("quick")]),
        )
        .await
        .unwrap();
        let read = get_recipe(&store, &caller, created.recipe.id).await.unwrap();
        assert_eq!(names(&read.tags), ["dinner", "quick", "vegan"]);
    }

    #[tokio::test]
    async fn same_tag_name_resolves_to_same_record_across_recipes() {
        let store = MemoryStore::new();
        let caller = Caller::user(Uuid::new_v4());

        let first = create_recipe(&store, &caller, chili(vec![tag("vegan")])).await.unwrap();
        let second = create_recipe(&store, &caller, chili(vec![tag("vegan")])).await.unwrap();

        assert_eq!(first.tags[0].id, second.tags[0].id);
    }

    #[tokio::test]
    async fn tags_are_not_shared_between_users() {
        let store = MemoryStore::new();
        let alice = Caller::user(Uuid::new_v4());
        let bob = Caller::user(Uuid::new_v4());

        let a = create_recipe(&store, &alice, chili(vec![tag("vegan")])).await.unwrap();
        let b = create_recipe(&store, &bob, chili(vec![tag("vegan")])).await.unwrap();

        assert_ne!(a.tags[0].id, b.tags[0].id);
    }

    #[tokio::test]
    async fn update_with_tags_replaces_instead_of_merging() {
        let store = MemoryStore::new();
        let caller = Caller::user(Uuid::new_v4());
        let created = create_recipe(&store, &caller, chili(vec![tag("spicy"), tag("spicy")]))
            .await
            .unwrap();

        let patch = RecipePatch {
            tags: Some(Some(vec![tag("mild")])),
            ..Default::default()
        };
        let updated = update_recipe(&store, &caller, created.recipe.id, patch).await.unwrap();
        assert_eq!(names(&updated.tags), ["mild"]);

        let read = get_recipe(&store, &caller, created.recipe.id).await.unwrap();
        assert_eq!(names(&read.tags), ["mild"]);
    }

    #[tokio::test]
    async fn update_with_empty_tags_clears_them() {
        let store = MemoryStore::new();
        let caller = Caller::user(Uuid::new_v4());
        let created = create_recipe(&store, &caller, chili(vec![tag("a"), tag("b")]))
            .await
            .unwrap();

        let patch = RecipePatch {
            tags: Some(Some(vec![])),
            ..Default::default()
        };
        let updated = update_recipe(&store, &caller, created.recipe.id, patch).await.unwrap();
        assert!(updated.tags.is_empty());
        assert!(get_recipe(&store, &caller, created.recipe.id)
            .await
            .unwrap()
            .tags
            .is_empty());
    }

    #[tokio::test]
    async fn update_without_tags_key_keeps_associations() {
        let store = MemoryStore::new();
        let caller = Caller::user(Uuid::new_v4());
        let created = create_recipe(&store, &caller, chili(vec![tag("spicy")])).await.unwrap();

        let patch = RecipePatch {
            title: Some("Chili con carne".into()),
            price: Some(Decimal::new(725, 2)),
            ..Default::default()
        };
        let updated = update_recipe(&store, &caller, created.recipe.id, patch).await.unwrap();

        assert_eq!(updated.recipe.title, "Chili con carne");
        assert_eq!(updated.recipe.price, Decimal::new(725, 2));
        assert_eq!(updated.recipe.time_minutes, 30);
        assert_eq!(names(&updated.tags), ["spicy"]);

        let read = get_recipe(&store, &caller, created.recipe.id).await.unwrap();
        assert_eq!(read.recipe.title, "Chili con carne");
        assert_eq!(names(&read.tags), ["spicy"]);
    }

    #[tokio::test]
    async fn anonymous_caller_is_rejected() {
        let store = MemoryStore::new();
        let anon = Caller::anonymous();

        let err = create_recipe(&store, &anon, chili(vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = reconcile_tags(&store, &anon, Uuid::new_v4(), &[tag("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(store.list_tags(Uuid::new_v4(), false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_users_recipe_is_not_found() {
        let store = MemoryStore::new();
        let owner = Caller::user(Uuid::new_v4());
        let stranger = Caller::user(Uuid::new_v4());
        let created = create_recipe(&store, &owner, chili(vec![])).await.unwrap();
        let id = created.recipe.id;

        assert!(matches!(
            get_recipe(&store, &stranger, id).await,
            Err(AppError::NotFound("recipe"))
        ));
        assert!(matches!(
            update_recipe(&store, &stranger, id, RecipePatch::default()).await,
            Err(AppError::NotFound("recipe"))
        ));
        assert!(matches!(
            delete_recipe(&store, &stranger, id).await,
            Err(AppError::NotFound("recipe"))
        ));
        assert!(get_recipe(&store, &owner, id).await.is_ok());
    }

    #[tokio::test]
    async fn list_filters_by_tag_and_attaches_tags() {
        let store = MemoryStore::new();
        let caller = Caller::user(Uuid::new_v4());
        let plain = create_recipe(&store, &caller, chili(vec![])).await.unwrap();
        let vegan = create_recipe(&store, &caller, chili(vec![tag("vegan")])).await.unwrap();

        let all = list_recipes(&store, &caller, &[]).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].recipe.id, vegan.recipe.id);
        assert_eq!(all[1].recipe.id, plain.recipe.id);
        assert_eq!(names(&all[0].tags), ["vegan"]);

        let filtered = list_recipes(&store, &caller, &[vegan.tags[0].id]).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].recipe.id, vegan.recipe.id);
    }

    #[tokio::test]
    async fn deleting_a_recipe_keeps_its_tags() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let caller = Caller::user(user_id);
        let created = create_recipe(&store, &caller, chili(vec![tag("spicy")])).await.unwrap();

        delete_recipe(&store, &caller, created.recipe.id).await.unwrap();
        assert!(list_recipes(&store, &caller, &[]).await.unwrap().is_empty());
        assert_eq!(store.list_tags(user_id, false).await.unwrap().len(), 1);
    }
}
