use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
}

/// Public view of a user. `is_subscribed` is relative to the viewer and is
/// always `false` for anonymous requests.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct UserProfileRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,

    pub count: i64,
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed: row.is_subscribed,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// Ingredient as it appears inside a recipe.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,

    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,

    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredient>,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Compact recipe view returned by favorite/cart toggles and embedded in
/// subscription listings.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub recipes_count: i64,

    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

impl SubscriptionView {
    pub fn from_row(row: SubscriptionRow, recipes: Vec<RecipeShort>) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed: true,
            recipes,
            recipes_count: row.recipes_count,
        }
    }
}

/// One ingredient line of a recipe sitting in a user's shopping cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct CartIngredient {
    pub recipe_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}
