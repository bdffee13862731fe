use std::sync::Arc;

use serde_json::json;
use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

use super::{json_body, json_reply, no_content, query_pairs, with_state};
use crate::{
    actions::{
        subscriptions::{list_subscriptions, subscribe, unsubscribe},
        users::{fetch_users, get_profile, login_user, register_user, set_password},
    },
    authentication::permissions::ActionType,
    error::ApiError,
    form::{LoginForm, QueryPairs, RegisterForm, SetPasswordForm, SubscriptionQuery, UserQuery},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageRequest,
    schema::Uuid,
    state::State,
};

pub fn routes(state: Arc<State>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let keys = state.keys.clone();

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body::<RegisterForm>())
        .and(with_state(state.clone()))
        .and_then(handle_register);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(handle_list_users);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_me);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(json_body::<SetPasswordForm>())
        .and(with_state(state.clone()))
        .and_then(handle_set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(keys.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(handle_list_subscriptions);

    let profile = warp::path!("users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_profile);

    let subscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_session(keys.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(handle_subscribe);

    let unsubscribe = warp::path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(keys.clone()))
        .and(with_state(state.clone()))
        .and_then(handle_unsubscribe);

    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<LoginForm>())
        .and(with_state(state))
        .and_then(handle_login);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(keys))
        .and_then(handle_logout);

    register
        .or(list)
        .or(me)
        .or(set_password)
        .or(subscriptions)
        .or(profile)
        .or(subscribe)
        .or(unsubscribe)
        .or(login)
        .or(logout)
}

async fn handle_register(form: RegisterForm, state: Arc<State>) -> Result<warp::reply::Response, Rejection> {
    let user = register_user(form, &state.pool).await?;
    Ok(json_reply(&user, StatusCode::CREATED))
}

async fn handle_list_users(
    session: Option<SessionData>,
    pairs: QueryPairs,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    let query = UserQuery::from_pairs(pairs)?;
    let request = PageRequest::resolve(query.page, state.config.page_size)?;
    let viewer = session.map(|s| s.user_id);

    let page = fetch_users(&query.search, viewer, request, &state.pool).await?;
    Ok(json_reply(&page, StatusCode::OK))
}

async fn handle_me(session: SessionData, state: Arc<State>) -> Result<warp::reply::Response, Rejection> {
    let profile = get_profile(session.user_id, Some(session.user_id), &state.pool)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(json_reply(&profile, StatusCode::OK))
}

async fn handle_profile(
    user_id: Uuid,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    let viewer = session.map(|s| s.user_id);
    let profile = get_profile(user_id, viewer, &state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No user exists with specified id")))?;

    Ok(json_reply(&profile, StatusCode::OK))
}

async fn handle_set_password(
    session: SessionData,
    form: SetPasswordForm,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    set_password(session.user_id, form, &state.pool).await?;
    Ok(no_content())
}

async fn handle_list_subscriptions(
    session: SessionData,
    pairs: QueryPairs,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let query = SubscriptionQuery::from_pairs(pairs)?;
    let request = PageRequest::resolve(query.page, state.config.page_size)?;

    let page = list_subscriptions(session.user_id, query.recipes_limit, request, &state.pool).await?;
    Ok(json_reply(&page, StatusCode::OK))
}

async fn handle_subscribe(
    author_id: Uuid,
    session: SessionData,
    pairs: QueryPairs,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let query = SubscriptionQuery::from_pairs(pairs)?;
    let view = subscribe(session.user_id, author_id, query.recipes_limit, &state.pool).await?;

    Ok(json_reply(&view, StatusCode::CREATED))
}

async fn handle_unsubscribe(
    author_id: Uuid,
    session: SessionData,
    state: Arc<State>,
) -> Result<warp::reply::Response, Rejection> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    unsubscribe(session.user_id, author_id, &state.pool).await?;
    Ok(no_content())
}

async fn handle_login(form: LoginForm, state: Arc<State>) -> Result<warp::reply::Response, Rejection> {
    let token = login_user(&form.email, &form.password, &state.keys, &state.pool).await?;
    Ok(json_reply(&json!({ "auth_token": token }), StatusCode::OK))
}

/// Tokens are stateless; logging out only confirms the token was valid.
async fn handle_logout(session: SessionData) -> Result<warp::reply::Response, Rejection> {
    log::trace!("> User {} logged out", session.user_id);
    Ok(no_content())
}
