//! HTTP surface. Every endpoint lives under `/api`; uploaded media is served
//! from `/media`.

pub mod catalog;
pub mod recipes;
pub mod users;

use std::{convert::Infallible, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

use crate::{
    constants::MAX_BODY_BYTES,
    error::ApiError,
    form::QueryPairs,
    state::State,
};

pub fn with_state(
    state: Arc<State>,
) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Raw pairs, so that repeated keys survive.
pub fn query_pairs() -> impl Filter<Extract = (QueryPairs,), Error = Rejection> + Clone {
    warp::query::<QueryPairs>()
}

pub fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub fn no_content() -> warp::reply::Response {
    StatusCode::NO_CONTENT.into_response()
}

pub fn api(state: Arc<State>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let routes = users::routes(state.clone())
        .or(catalog::routes(state.clone()))
        .or(recipes::routes(state));

    warp::path("api").and(routes)
}

pub fn media(state: &State) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.config.media_root.clone()))
}

/// The complete application with request logging and error recovery.
pub fn app(state: Arc<State>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = media(&state);

    api(state)
        .or(media)
        .with(warp::log("foodgram::api"))
        .recover(handle_rejection)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = err.find::<ApiError>() {
        if e.status().is_server_error() {
            log::error!("{e}");
        }
        (e.status(), e.body())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "errors": "Not found." }))
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "errors": e.to_string() }))
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, json!({ "errors": "Invalid query string." }))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "errors": "Request body is too large." }),
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json!({ "errors": "Unsupported media type." }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "errors": "Method not allowed." }),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "errors": "Internal server error" }),
        )
    };

    Ok(json_reply(&body, status))
}
