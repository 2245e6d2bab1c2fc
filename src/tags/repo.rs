use anyhow::Context;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

/// Tag record, unique per (user_id, name).
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, FromRow)]
struct RecipeTagRow {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

// Another request may delete the row between our conflicting insert and the
// re-select, so the pair is retried a few times before giving up.
const GET_OR_CREATE_ATTEMPTS: usize = 3;

pub async fn get_or_create(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Tag> {
    for _ in 0..GET_OR_CREATE_ATTEMPTS {
        let inserted = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (user_id, name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, name) DO NOTHING
            RETURNING id, user_id, name
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(db)
        .await
        .context("insert tag")?;

        if let Some(tag) = inserted {
            debug!(tag_id = %tag.id, %user_id, name, "tag created");
            return Ok(tag);
        }

        let existing = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, user_id, name
              FROM tags
             WHERE user_id = $1 AND name = $2
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(db)
        .await
        .context("select tag")?;

        if let Some(tag) = existing {
            return Ok(tag);
        }
    }
    anyhow::bail!("tag {name:?} vanished during get-or-create")
}

/// Swap the association set of a recipe in one transaction.
pub async fn replace_for_recipe(db: &PgPool, recipe_id: Uuid, tag_ids: &[Uuid]) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("clear recipe tags")?;

    if !tag_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO recipe_tags (recipe_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS t(tag_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(recipe_id)
        .bind(tag_ids)
        .execute(&mut *tx)
        .await
        .context("insert recipe tags")?;
    }

    tx.commit().await.context("commit tx")?;
    Ok(())
}

pub async fn list_for_recipes(db: &PgPool, recipe_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, Tag)>> {
    let rows = sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.user_id, t.name
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ANY($1)
         ORDER BY t.name ASC
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("list tags for recipes")?;

    Ok(rows.into_iter().map(|r| (r.recipe_id, r.tag)).collect())
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid, assigned_only: bool) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.user_id, t.name
          FROM tags t
         WHERE t.user_id = $1
           AND (NOT $2 OR EXISTS (SELECT 1 FROM recipe_tags rt WHERE rt.tag_id = t.id))
         ORDER BY t.name ASC
        "#,
    )
    .bind(user_id)
    .bind(assigned_only)
    .fetch_all(db)
    .await
    .context("list tags")?;
    Ok(rows)
}

pub async fn rename(db: &PgPool, user_id: Uuid, tag_id: Uuid, name: &str) -> anyhow::Result<Option<Tag>> {
    let row = sqlx::query_as::<_, Tag>(
        r#"
        UPDATE tags SET name = $3
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, name
        "#,
    )
    .bind(tag_id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(db)
    .await
    .context("rename tag")?;
    Ok(row)
}

/// Associations go with the tag through `ON DELETE CASCADE`.
pub async fn delete(db: &PgPool, user_id: Uuid, tag_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
        .bind(tag_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete tag")?;
    Ok(res.rows_affected() > 0)
}
