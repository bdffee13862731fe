use crate::{
    actions::{ensure_added, ensure_removed, recipes::get_recipe_short},
    error::ApiError,
    schema::{CartIngredient, RecipeShort, Uuid},
};

use sqlx::{Pool, Postgres};

pub async fn add_to_shopping_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, ApiError> {
    let recipe = get_recipe_short(recipe_id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No recipe exists with specified id")))?;

    let result = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    ensure_added(result.rows_affected(), "Recipe is already in the shopping cart")?;
    log::trace!("> User {user_id} added recipe {recipe_id} to the shopping cart");

    Ok(recipe)
}

pub async fn remove_from_shopping_cart(
    recipe_id: Uuid,
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    ensure_removed(result.rows_affected(), "Recipe already removed!")
}

pub async fn count_cart_entries(user_id: Uuid, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shopping_cart WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Ingredient lines of every recipe in the cart, in cart order and then in
/// each recipe's ingredient order.
pub async fn list_cart_ingredients(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredient>, ApiError> {
    let rows: Vec<CartIngredient> = sqlx::query_as(
        "
        SELECT c.recipe_id AS recipe_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        ORDER BY c.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
