use crate::{
    actions::{
        ingredients::{find_missing_ingredients, list_recipe_ingredients},
        tags::{find_missing_tags, list_recipe_tags},
        users::get_profile,
    },
    authentication::permissions::ActionType,
    error::ApiError,
    form::{RecipeQuery, ValidatedRecipe},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    schema::{Recipe, RecipeDetail, RecipeRow, RecipeShort, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

/// Recipe columns plus the viewer-relative membership flags. Both flags are
/// `false` when `viewer` is `None`.
fn recipe_select<'a>(viewer: Option<Uuid>) -> QueryBuilder<'a, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.*, EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    builder
        .push_bind(viewer)
        .push(") AS is_favorited, EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
        .push_bind(viewer)
        .push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    builder
}

async fn expand_recipe(
    row: RecipeRow,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ApiError> {
    let author = get_profile(row.author_id, viewer, pool)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Recipe {} has no author", row.id)))?;
    let tags = list_recipe_tags(row.id, pool).await?;
    let ingredients = list_recipe_ingredients(row.id, pool).await?;

    Ok(RecipeDetail {
        id: row.id,
        tags,
        author,
        ingredients,
        name: row.name,
        image: row.image,
        text: row.text,
        cooking_time: row.cooking_time,
        pub_date: row.pub_date,
        is_favorited: row.is_favorited,
        is_in_shopping_cart: row.is_in_shopping_cart,
    })
}

/// Newest first. `is_favorited` and `is_in_shopping_cart` only filter for
/// authenticated viewers.
pub async fn fetch_recipes(
    query: &RecipeQuery,
    viewer: Option<Uuid>,
    request: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeDetail>, ApiError> {
    let mut builder = recipe_select(viewer);

    if let Some(author) = query.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !query.tags.is_empty() {
        builder
            .push(" AND EXISTS(SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(query.tags.clone())
            .push("))");
    }
    if let Some(viewer) = viewer {
        if query.is_favorited {
            builder
                .push(" AND EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if query.is_in_shopping_cart {
            builder
                .push(" AND EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(request.limit())
        .push(" OFFSET ")
        .push_bind(request.offset());

    let rows: Vec<RecipeRow> = builder.build_query_as::<RecipeRow>().fetch_all(pool).await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let page = Page::from_rows(rows, total_count, request)?;

    let mut results = Vec::with_capacity(page.results.len());
    for row in page.results {
        results.push(expand_recipe(row, viewer, pool).await?);
    }

    Ok(Page {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    })
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_recipe_detail(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, ApiError> {
    let mut builder = recipe_select(viewer);
    builder.push(" AND r.id = ").push_bind(id);

    let row: Option<RecipeRow> = builder.build_query_as::<RecipeRow>().fetch_optional(pool).await?;

    match row {
        Some(row) => Ok(Some(expand_recipe(row, viewer, pool).await?)),
        None => Ok(None),
    }
}

/// Loads a recipe the session is allowed to modify.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No recipe exists with specified id")))?;

    session.authenticate_owner(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    Ok(recipe)
}

pub async fn get_recipe_short(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<RecipeShort>, ApiError> {
    let row: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

/// An author's recipes, newest first, truncated to `limit` when given.
pub async fn list_author_recipes(
    author_id: Uuid,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeShort>, ApiError> {
    let rows: Vec<RecipeShort> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time FROM recipes
        WHERE author_id = $1
        ORDER BY pub_date DESC, id DESC
        LIMIT $2
    ",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Rejects ingredient and tag ids that do not exist.
async fn check_references(recipe: &ValidatedRecipe, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let ingredient_ids: Vec<Uuid> = recipe.ingredients.iter().map(|i| i.id).collect();
    let mut errors: Vec<String> = find_missing_ingredients(&ingredient_ids, pool)
        .await?
        .into_iter()
        .map(|id| format!("Ingredient with id - {id} does not exist."))
        .collect();

    errors.extend(
        find_missing_tags(&recipe.tags, pool)
            .await?
            .into_iter()
            .map(|id| format!("Tag with id - {id} does not exist.")),
    );

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(())
}

async fn insert_recipe_relations(
    recipe_id: Uuid,
    recipe: &ValidatedRecipe,
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    if !recipe.tags.is_empty() {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        builder.push_values(recipe.tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        builder.build().execute(&mut *conn).await?;
    }

    if !recipe.ingredients.is_empty() {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
        builder.push_values(recipe.ingredients.iter(), |mut b, ingredient| {
            b.push_bind(recipe_id)
                .push_bind(ingredient.id)
                .push_bind(ingredient.amount);
        });
        builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}

/// Persists an already validated recipe.
pub async fn create_recipe(
    author_id: Uuid,
    recipe: &ValidatedRecipe,
    image: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<Uuid, ApiError> {
    check_references(recipe, pool).await?;

    let mut tx = pool.begin().await?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    insert_recipe_relations(id.0, recipe, &mut tx).await?;
    tx.commit().await?;

    log::info!("User {author_id} created recipe {}", id.0);

    Ok(id.0)
}

/// Replaces name, text, cooking time, tags and ingredients. The image is only
/// replaced when a new one is given.
pub async fn update_recipe(
    id: Uuid,
    recipe: &ValidatedRecipe,
    image: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    check_references(recipe, pool).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    insert_recipe_relations(id, recipe, &mut tx).await?;
    tx.commit().await?;

    log::info!("Updated recipe {id}");

    Ok(())
}

/// Favorites, cart entries and recipe relations go with it.
pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    log::info!("Deleted recipe {id}");

    Ok(())
}
