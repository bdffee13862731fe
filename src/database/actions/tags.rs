use crate::{
    error::ApiError,
    schema::{Tag, Uuid},
};

use sqlx::{Pool, Postgres};

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id DESC")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_recipe_tags(recipe_id: Uuid, pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id DESC
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Returns the ids from `tag_ids` that do not exist.
pub async fn find_missing_tags(
    tag_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<Uuid>, ApiError> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tag_ids)
        .fetch_all(pool)
        .await?;

    Ok(tag_ids
        .iter()
        .filter(|id| !found.iter().any(|(found_id,)| found_id == *id))
        .copied()
        .collect())
}
