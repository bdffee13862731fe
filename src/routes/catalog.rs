//! Read-only tag and ingredient listings, served through the cache when one
//! is configured.

use std::sync::Arc;

use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

use super::{json_reply, with_state};
use crate::{
    actions::{
        ingredients::{get_ingredient, list_ingredients},
        tags::{get_tag, list_tags},
    },
    cache::cache::CacheKey,
    error::ApiError,
    form::IngredientQuery,
    schema::Uuid,
    state::State,
};

pub fn routes(state: Arc<State>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let tags = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_list_tags);

    let tag = warp::path!("tags" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_get_tag);

    let ingredients = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_state(state.clone()))
        .and_then(handle_list_ingredients);

    let ingredient = warp::path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_get_ingredient);

    tags.or(tag).or(ingredients).or(ingredient)
}

async fn handle_list_tags(state: Arc<State>) -> Result<warp::reply::Response, Rejection> {
    let tags = state
        .cache
        .get_or(CacheKey::Tags, || list_tags(&state.pool))
        .await?;

    Ok(json_reply(&tags, StatusCode::OK))
}

async fn handle_get_tag(id: Uuid, state: Arc<State>) -> Result<warp::reply::Response, Rejection> {
    let tag = state
        .cache
        .get_or(CacheKey::Tag(id), || get_tag(id, &state.pool))
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No tag exists with specified id")))?;

    Ok(json_reply(&tag, StatusCode::OK))
}

async fn handle_list_ingredients(
    query: IngredientQuery,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    let prefix = query
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let key = CacheKey::Ingredients(prefix.clone().unwrap_or_default());

    let ingredients = state
        .cache
        .get_or(key, || list_ingredients(prefix.as_deref(), &state.pool))
        .await?;

    Ok(json_reply(&ingredients, StatusCode::OK))
}

async fn handle_get_ingredient(id: Uuid, state: Arc<State>) -> Result<warp::reply::Response, Rejection> {
    let ingredient = state
        .cache
        .get_or(CacheKey::Ingredient(id), || get_ingredient(id, &state.pool))
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No ingredient exists with specified id")))?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}
