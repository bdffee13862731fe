use std::sync::Arc;

use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

use super::{json_body, json_reply, no_content, query_pairs, with_state};
use crate::{
    actions::{
        cart::{add_to_shopping_cart, count_cart_entries, list_cart_ingredients, remove_from_shopping_cart},
        favorites::{add_to_favorites, remove_from_favorites},
        recipes::{create_recipe, delete_recipe, fetch_recipes, get_recipe_detail, get_recipe_mut, update_recipe},
    },
    authentication::permissions::ActionType,
    constants::SHOPPING_CART_FILENAME,
    error::ApiError,
    form::{QueryPairs, RecipeForm, RecipeQuery, ValidatedRecipe},
    image::{discard_image, store_image},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    schema::{RecipeDetail, Uuid},
    shopping_list::{aggregate, render},
    state::State,
    validation::{validate_recipe, RecipeRules},
};

pub fn routes(state: Arc<State>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let keys = state.keys.clone();

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(handle_list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_state(state.clone()))
        .and_then(handle_create_recipe);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_download_shopping_cart);

    let detail = warp::path!("recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_get_recipe);

    let update = warp::path!("recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(keys.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_state(state.clone()))
        .and_then(handle_update_recipe);

    let delete = warp::path!("recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_delete_recipe);

    let favorite = warp::path!("recipes" / Uuid / "favorite")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_add_favorite);

    let unfavorite = warp::path!("recipes" / Uuid / "favorite")
        .and(warp::delete())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_remove_favorite);

    let add_to_cart = warp::path!("recipes" / Uuid / "shopping_cart")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_add_to_cart);

    let remove_from_cart = warp::path!("recipes" / Uuid / "shopping_cart")
        .and(warp::delete())
        .and(with_session(keys))
        .and(with_state(state))
        .and_then(handle_remove_from_cart);

    list.or(create)
        .or(download)
        .or(detail)
        .or(update)
        .or(delete)
        .or(favorite)
        .or(unfavorite)
        .or(add_to_cart)
        .or(remove_from_cart)
}

/// Validates a create payload. An image is mandatory on create only; its
/// absence is reported together with the other violations.
pub fn validate_new_recipe(form: RecipeForm) -> Result<ValidatedRecipe, ApiError> {
    let mut errors = vec![];
    if form.image.as_deref().map_or(true, |image| image.trim().is_empty()) {
        errors.push(String::from("Image is required."));
    }

    match validate_recipe(form, &RecipeRules::default()) {
        Ok(recipe) if errors.is_empty() => Ok(recipe),
        Ok(_) => Err(ApiError::Validation(errors)),
        Err(e) => {
            errors.extend(e.messages);
            Err(ApiError::Validation(errors))
        }
    }
}

async fn load_detail(id: Uuid, viewer: Uuid, state: &State) -> Result<RecipeDetail, ApiError> {
    get_recipe_detail(id, Some(viewer), &state.pool)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Recipe {id} missing after write")))
}

async fn handle_list_recipes(
    session: Option<SessionData>,
    pairs: QueryPairs,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    let query = RecipeQuery::from_pairs(pairs)?;
    let request = PageRequest::resolve(query.page, state.config.page_size)?;
    let viewer = session.map(|s| s.user_id);

    let page = fetch_recipes(&query, viewer, request, &state.pool).await?;
    Ok(json_reply(&page, StatusCode::OK))
}

async fn handle_create_recipe(
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = validate_new_recipe(form)?;

    let image = match &recipe.image {
        Some(data) => Some(store_image(&state.config.media_root, data).await?),
        None => None,
    };
    let created = create_recipe(session.user_id, &recipe, image.clone(), &state.pool).await;
    let id = discard_on_error(created, image.as_deref(), &state).await?;

    let detail = load_detail(id, session.user_id, &state).await?;
    Ok(json_reply(&detail, StatusCode::CREATED))
}

/// Drops a freshly stored image when the write it belonged to failed.
async fn discard_on_error<T>(
    result: Result<T, ApiError>,
    image: Option<&str>,
    state: &State,
) -> Result<T, ApiError> {
    if result.is_err() {
        if let Some(url) = image {
            discard_image(&state.config.media_root, url).await;
        }
    }
    result
}

async fn handle_get_recipe(
    id: Uuid,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let recipe = get_recipe_detail(id, viewer, &state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No recipe exists with specified id")))?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

async fn handle_update_recipe(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    get_recipe_mut(id, &session, &state.pool).await?;
    let recipe = validate_recipe(form, &RecipeRules::default()).map_err(ApiError::from)?;

    let image = match recipe.image.as_deref().filter(|data| !data.trim().is_empty()) {
        Some(data) => Some(store_image(&state.config.media_root, data).await?),
        None => None,
    };
    let updated = update_recipe(id, &recipe, image.clone(), &state.pool).await;
    discard_on_error(updated, image.as_deref(), &state).await?;

    let detail = load_detail(id, session.user_id, &state).await?;
    Ok(json_reply(&detail, StatusCode::OK))
}

async fn handle_delete_recipe(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    get_recipe_mut(id, &session, &state.pool).await?;
    delete_recipe(id, &state.pool).await?;

    Ok(no_content())
}

async fn handle_add_favorite(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let recipe = add_to_favorites(id, session.user_id, &state.pool).await?;
    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn handle_remove_favorite(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;

    remove_from_favorites(id, session.user_id, &state.pool).await?;
    Ok(no_content())
}

async fn handle_add_to_cart(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let recipe = add_to_shopping_cart(id, session.user_id, &state.pool).await?;
    Ok(json_reply(&recipe, StatusCode::CREATED))
}

async fn handle_remove_from_cart(
    id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;

    remove_from_shopping_cart(id, session.user_id, &state.pool).await?;
    Ok(no_content())
}

async fn handle_download_shopping_cart(
    session: SessionData,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnLists)?;

    if count_cart_entries(session.user_id, &state.pool).await? == 0 {
        return Err(ApiError::InvalidRequest(String::from("Shopping cart is empty.")).into());
    }

    let entries = list_cart_ingredients(session.user_id, &state.pool).await?;
    let body = render(&aggregate(&entries));
    log::trace!("> User {} downloaded {} shopping list lines", session.user_id, entries.len());

    Ok(warp::reply::with_header(
        body,
        "content-disposition",
        format!("attachment; filename={SHOPPING_CART_FILENAME}"),
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::IngredientAmountForm;

    fn form(image: Option<&str>) -> RecipeForm {
        RecipeForm {
            ingredients: vec![IngredientAmountForm {
                id: 1,
                amount: 3_i64.into(),
            }],
            tags: vec![1],
            image: image.map(String::from),
            name: String::from("Soup"),
            text: String::from("Boil."),
            cooking_time: 20_i64.into(),
        }
    }

    #[test]
    fn create_requires_an_image() {
        let error = validate_new_recipe(form(None)).unwrap_err();
        assert_eq!(error, ApiError::Validation(vec![String::from("Image is required.")]));

        assert!(validate_new_recipe(form(Some("data:image/png;base64,AAAA"))).is_ok());
    }

    #[test]
    fn missing_image_is_reported_with_other_violations() {
        let mut payload = form(Some(" "));
        payload.cooking_time = 0_i64.into();

        let error = validate_new_recipe(payload).unwrap_err();
        assert_eq!(
            error,
            ApiError::Validation(vec![
                String::from("Image is required."),
                String::from("Cooking time must be ≥1 minute."),
            ])
        );
    }
}
