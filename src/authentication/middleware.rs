use warp::{reject::Rejection, Filter};

use super::jwt::{SessionData, SessionKeys};
use crate::error::ApiError;

/// Accepts `Token <jwt>` as well as `Bearer <jwt>`.
pub fn extract_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    match scheme {
        "Token" | "Bearer" if !token.is_empty() => Some(token),
        _ => None,
    }
}

fn resolve_session(keys: &SessionKeys, header: Option<String>) -> Result<SessionData, ApiError> {
    let header = header.ok_or(ApiError::Unauthenticated)?;
    let token = extract_token(&header).ok_or(ApiError::Unauthenticated)?;

    keys.verify_session(token).map(SessionData::from)
}

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move { resolve_session(&keys, header).map_err(warp::reject::custom) }
    })
}

/// Anonymous and invalid credentials both resolve to `None`.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .map(move |header: Option<String>| resolve_session(&keys, header).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_schemes() {
        assert_eq!(extract_token("Token abc.def"), Some("abc.def"));
        assert_eq!(extract_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_token("Basic abc"), None);
        assert_eq!(extract_token("Token "), None);
        assert_eq!(extract_token("abc.def"), None);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let keys = SessionKeys::new(b"secret", 1).unwrap();
        let result = warp::test::request()
            .filter(&with_session(keys))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn anonymous_is_allowed_through_possible_session() {
        let keys = SessionKeys::new(b"secret", 1).unwrap();
        let session = warp::test::request()
            .header("authorization", "Token garbage")
            .filter(&with_possible_session(keys))
            .await
            .unwrap();

        assert!(session.is_none());
    }
}
