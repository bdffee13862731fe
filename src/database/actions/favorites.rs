use crate::{
    actions::{ensure_added, ensure_removed, recipes::get_recipe_short},
    error::ApiError,
    schema::{RecipeShort, Uuid},
};

use sqlx::{Pool, Postgres};

pub async fn add_to_favorites(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, ApiError> {
    let recipe = get_recipe_short(recipe_id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No recipe exists with specified id")))?;

    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    ensure_added(result.rows_affected(), "Recipe is already in favorites")?;
    log::trace!("> User {user_id} favorited recipe {recipe_id}");

    Ok(recipe)
}

pub async fn remove_from_favorites(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    ensure_removed(result.rows_affected(), "Recipe already removed!")
}
