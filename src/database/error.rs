use serde_json::json;
use thiserror::Error;
use warp::{http::StatusCode, reject::Reject};

/// Terminal outcome of a failed request. Every variant is reported to the
/// caller as a JSON body of the form `{"errors": ...}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFoundForRemoval(String),

    #[error("Cannot subscribe to yourself.")]
    SelfReference,

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("You don't have permission to perform this action.")]
    Forbidden,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Cache failed: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::NotFoundForRemoval(_)
            | ApiError::SelfReference
            | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Query(_) | ApiError::Cache(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Internal failures are logged in full and reported with a generic message.
    pub fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation(messages) => json!({ "errors": messages }),
            ApiError::Query(_) | ApiError::Cache(_) | ApiError::Internal(_) => {
                json!({ "errors": "Internal server error" })
            }
            other => json!({ "errors": other.to_string() }),
        }
    }
}

impl Reject for ApiError {}

pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                unique_violation: e.is_unique_violation(),
                info: format!("{e}"),
            },
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        if value.unique_violation {
            return ApiError::Conflict(String::from("Entry already exists"));
        }
        log::error!("{}", value.info);
        ApiError::Query(value.info)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(value: CacheError) -> Self {
        ApiError::Cache(value.info)
    }
}

/// Maps a unique-constraint rejection to the given conflict message, leaving
/// every other failure as is.
pub fn conflict_on_duplicate(error: sqlx::Error, message: &str) -> ApiError {
    match ApiError::from(error) {
        ApiError::Conflict(_) => ApiError::Conflict(message.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::Validation(vec![]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::SelfReference.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Query("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_body_lists_every_message() {
        let error = ApiError::Validation(vec!["first".into(), "second".into()]);
        assert_eq!(error.body(), json!({ "errors": ["first", "second"] }));
    }

    #[test]
    fn internal_details_stay_out_of_body() {
        let error = ApiError::Query("relation \"users\" does not exist".into());
        assert_eq!(error.body(), json!({ "errors": "Internal server error" }));
    }

    #[test]
    fn converts_into_a_rejection() {
        let rejection: warp::Rejection = ApiError::Forbidden.into();
        assert_eq!(rejection.find::<ApiError>(), Some(&ApiError::Forbidden));
    }
}
