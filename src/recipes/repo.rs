use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,
    pub created_at: OffsetDateTime,
}

/// Column values for a recipe that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,
}

pub async fn insert(db: &PgPool, user_id: Uuid, new: &NewRecipe) -> anyhow::Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (user_id, title, time_minutes, price, link, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, title, time_minutes, price, link, description, created_at
        "#,
    )
    .bind(user_id)
    .bind(&new.title)
    .bind(new.time_minutes)
    .bind(new.price)
    .bind(&new.link)
    .bind(&new.description)
    .fetch_one(db)
    .await
    .context("insert recipe")?;
    Ok(recipe)
}

pub async fn find(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, time_minutes, price, link, description, created_at
          FROM recipes
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find recipe")?;
    Ok(recipe)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid, tag_ids: &[Uuid]) -> anyhow::Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT r.id, r.user_id, r.title, r.time_minutes, r.price, r.link, r.description, r.created_at
          FROM recipes r
         WHERE r.user_id = $1
           AND (cardinality($2::uuid[]) = 0 OR EXISTS (
                SELECT 1 FROM recipe_tags rt
                 WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)
           ))
         ORDER BY r.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(tag_ids)
    .fetch_all(db)
    .await
    .context("list recipes")?;
    Ok(rows)
}

/// `false` when the row no longer exists.
pub async fn update(db: &PgPool, recipe: &Recipe) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE recipes
           SET title = $3, time_minutes = $4, price = $5, link = $6, description = $7
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(recipe.id)
    .bind(recipe.user_id)
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.link)
    .bind(&recipe.description)
    .execute(db)
    .await
    .context("update recipe")?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(recipe_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(res.rows_affected() > 0)
}
