use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Ingredient>> {
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, user_id, name
          FROM ingredients
         WHERE user_id = $1
         ORDER BY name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list ingredients")?;
    Ok(rows)
}

pub async fn create(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Ingredient> {
    let row = sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await
    .context("insert ingredient")?;
    Ok(row)
}

pub async fn rename(
    db: &PgPool,
    user_id: Uuid,
    ingredient_id: Uuid,
    name: &str,
) -> anyhow::Result<Option<Ingredient>> {
    let row = sqlx::query_as::<_, Ingredient>(
        r#"
        UPDATE ingredients SET name = $3
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, name
        "#,
    )
    .bind(ingredient_id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(db)
    .await
    .context("rename ingredient")?;
    Ok(row)
}

pub async fn delete(db: &PgPool, user_id: Uuid, ingredient_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM ingredients WHERE id = $1 AND user_id = $2")
        .bind(ingredient_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete ingredient")?;
    Ok(res.rows_affected() > 0)
}
