pub mod cart;
pub mod favorites;
pub mod ingredients;
pub mod recipes;
pub mod subscriptions;
pub mod tags;
pub mod users;

use super::error::ApiError;

fn escape_like(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

/// `LIKE` pattern matching values that start with `prefix` literally.
pub fn like_prefix(prefix: &str) -> String {
    format!("{}%", escape_like(prefix))
}

/// `LIKE` pattern matching values that contain `needle` literally.
pub fn like_contains(needle: &str) -> String {
    format!("%{}%", escape_like(needle))
}

/// Outcome of an `INSERT ... ON CONFLICT DO NOTHING` on a (user, recipe)
/// list. No inserted row means the pair was already present, whether it was
/// there before or a concurrent request won the race.
pub fn ensure_added(rows_affected: u64, conflict: &str) -> Result<(), ApiError> {
    if rows_affected == 0 {
        return Err(ApiError::Conflict(conflict.to_string()));
    }
    Ok(())
}

pub fn ensure_removed(rows_affected: u64, missing: &str) -> Result<(), ApiError> {
    if rows_affected == 0 {
        return Err(ApiError::NotFoundForRemoval(missing.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_prefix("sa"), "sa%");
        assert_eq!(like_prefix("50%_off"), "50\\%\\_off%");
        assert_eq!(like_prefix("a\\b"), "a\\\\b%");
        assert_eq!(like_contains("ali_"), "%ali\\_%");
    }

    #[test]
    fn adding_twice_conflicts() {
        assert!(ensure_added(1, "Recipe is already in favorites").is_ok());
        assert_eq!(
            ensure_added(0, "Recipe is already in favorites").unwrap_err(),
            ApiError::Conflict(String::from("Recipe is already in favorites"))
        );
    }

    #[test]
    fn removing_twice_reports_missing_entry() {
        assert!(ensure_removed(1, "Recipe already removed!").is_ok());
        assert_eq!(
            ensure_removed(0, "Recipe already removed!").unwrap_err(),
            ApiError::NotFoundForRemoval(String::from("Recipe already removed!"))
        );
    }
}
