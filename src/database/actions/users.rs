use crate::{
    actions::like_contains,
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::SessionKeys,
    },
    error::{conflict_on_duplicate, ApiError},
    form::{RegisterForm, SetPasswordForm},
    pagination::{Page, PageRequest},
    schema::{User, UserProfile, UserProfileRow, Uuid},
    validation::{validate_new_password, validate_registration},
};

use sqlx::{Pool, Postgres, QueryBuilder};

const PROFILE_COLUMNS: &str = "
    u.id, u.email, u.username, u.first_name, u.last_name,
    EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed
";

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Profile of `user_id` as seen by `viewer`.
pub async fn get_profile(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<UserProfile>, ApiError> {
    let row: Option<UserProfile> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Users ordered by id. Every whitespace-separated `search` term must occur,
/// case-insensitively, in the username or the email.
pub async fn fetch_users(
    search: &[String],
    viewer: Option<Uuid>,
    request: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<UserProfile>, ApiError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT u.id, u.email, u.username, u.first_name, u.last_name, EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = ",
    );
    builder
        .push_bind(viewer)
        .push(" AND s.author_id = u.id) AS is_subscribed, COUNT(*) OVER() AS count FROM users u WHERE TRUE");

    for term in search {
        let pattern = like_contains(term);
        builder
            .push(" AND (u.username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    builder
        .push(" ORDER BY u.id LIMIT ")
        .push_bind(request.limit())
        .push(" OFFSET ")
        .push_bind(request.offset());

    let rows: Vec<UserProfileRow> = builder.build_query_as::<UserProfileRow>().fetch_all(pool).await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let page = Page::from_rows(rows, total_count, request)?;

    Ok(page.map(UserProfile::from))
}

/// Creates a user; the stored password is the argon2 hash of the given one.
pub async fn register_user(form: RegisterForm, pool: &Pool<Postgres>) -> Result<UserProfile, ApiError> {
    validate_registration(&form)?;
    let password = hash_password(&form.password)?;

    let user: UserProfile = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, username, first_name, last_name, FALSE AS is_subscribed
    ",
    )
    .bind(form.email.trim())
    .bind(&form.username)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_duplicate(e, "A user with that email or username already exists."))?;

    log::info!("Registered user {} ({})", user.id, user.username);

    Ok(user)
}

pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let invalid = || ApiError::InvalidRequest(String::from("Unable to log in with provided credentials."));

    let user = get_user(pool, email).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password)? {
        return Err(invalid());
    }

    keys.generate_session(&user)
}

pub async fn set_password(
    user_id: Uuid,
    form: SetPasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let user = get_user_by_id(pool, user_id)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !verify_password(&form.current_password, &user.password)? {
        return Err(ApiError::Validation(vec![String::from(
            "Unable to log in with provided credentials.",
        )]));
    }
    validate_new_password(&form.new_password)?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hash_password(&form.new_password)?)
        .bind(user_id)
        .execute(pool)
        .await?;

    log::info!("Password changed for user {user_id}");

    Ok(())
}
