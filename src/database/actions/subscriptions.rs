use crate::{
    actions::{ensure_added, ensure_removed, recipes::list_author_recipes, users::get_user_by_id},
    error::ApiError,
    pagination::{Page, PageRequest},
    schema::{SubscriptionRow, SubscriptionView, Uuid},
};

use sqlx::{Pool, Postgres};

const SUBSCRIPTION_COLUMNS: &str = "
    u.id, u.email, u.username, u.first_name, u.last_name,
    (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
    COUNT(*) OVER() AS count
";

pub fn check_not_self(follower_id: Uuid, author_id: Uuid) -> Result<(), ApiError> {
    if follower_id == author_id {
        return Err(ApiError::SelfReference);
    }
    Ok(())
}

async fn require_author(author_id: Uuid, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    get_user_by_id(pool, author_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(String::from("No user exists with specified id")))?;

    Ok(())
}

async fn get_subscription(
    follower_id: Uuid,
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Option<SubscriptionView>, ApiError> {
    let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
        "
        SELECT {SUBSCRIPTION_COLUMNS}
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1 AND s.author_id = $2
    "
    ))
    .bind(follower_id)
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let recipes = list_author_recipes(row.id, recipes_limit, pool).await?;
            Ok(Some(SubscriptionView::from_row(row, recipes)))
        }
        None => Ok(None),
    }
}

pub async fn subscribe(
    follower_id: Uuid,
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, ApiError> {
    check_not_self(follower_id, author_id)?;
    require_author(author_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(follower_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    ensure_added(result.rows_affected(), "Cannot subscribe again.")?;
    log::trace!("> User {follower_id} subscribed to {author_id}");

    get_subscription(follower_id, author_id, recipes_limit, pool)
        .await?
        .ok_or_else(|| ApiError::Internal(String::from("Subscription vanished after insert")))
}

pub async fn unsubscribe(
    follower_id: Uuid,
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    require_author(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(follower_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    ensure_removed(result.rows_affected(), "Cannot unsubscribe (no subscription).")
}

/// Authors followed by `follower_id`, newest subscription first. Each entry
/// embeds at most `recipes_limit` of the author's recipes.
pub async fn list_subscriptions(
    follower_id: Uuid,
    recipes_limit: Option<i64>,
    request: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<SubscriptionView>, ApiError> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
        "
        SELECT {SUBSCRIPTION_COLUMNS}
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id DESC
        LIMIT $2 OFFSET $3
    "
    ))
    .bind(follower_id)
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let page = Page::from_rows(rows, total_count, request)?;

    let mut results = Vec::with_capacity(page.results.len());
    for row in page.results {
        let recipes = list_author_recipes(row.id, recipes_limit, pool).await?;
        results.push(SubscriptionView::from_row(row, recipes));
    }

    Ok(Page {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_subscription_is_refused() {
        assert_eq!(check_not_self(4, 4).unwrap_err(), ApiError::SelfReference);
        assert!(check_not_self(4, 5).is_ok());
    }
}
