use crate::{
    actions::like_prefix,
    error::ApiError,
    schema::{Ingredient, RecipeIngredient, Uuid},
};

use sqlx::{Pool, Postgres};

/// Ingredients ordered by name, optionally restricted to a case-insensitive
/// name prefix.
pub async fn list_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let list: Vec<Ingredient> = match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name")
                .bind(like_prefix(prefix))
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(list)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn list_recipe_ingredients(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, ApiError> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the ids from `ingredient_ids` that do not exist.
pub async fn find_missing_ingredients(
    ingredient_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<Uuid>, ApiError> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ingredient_ids)
        .fetch_all(pool)
        .await?;

    Ok(ingredient_ids
        .iter()
        .filter(|id| !found.iter().any(|(found_id,)| found_id == *id))
        .copied()
        .collect())
}
