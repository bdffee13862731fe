use std::{collections::HashMap, str::FromStr};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{error::ApiError, schema::Uuid};

/// A whole number sent as a JSON number or as a numeric string. Anything else
/// (fractions, booleans, garbage) is kept as `None` so the validator can
/// report it alongside every other violation instead of failing the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormInteger(pub Option<i64>);

impl FormInteger {
    pub fn get(self) -> Option<i64> {
        self.0
    }
}

impl From<i64> for FormInteger {
    fn from(value: i64) -> Self {
        Self(Some(value))
    }
}

impl<'de> Deserialize<'de> for FormInteger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };

        Ok(Self(value))
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IngredientAmountForm {
    pub id: Uuid,
    #[serde(default)]
    pub amount: FormInteger,
}

/// Recipe payload accepted by create and update.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RecipeForm {
    #[serde(default)]
    pub ingredients: Vec<IngredientAmountForm>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub cooking_time: FormInteger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// A recipe payload that passed validation, with every number in range.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecipe {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetPasswordForm {
    pub new_password: String,
    pub current_password: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

/// Raw query string pairs. Keys may repeat (`?tags=a&tags=b`), which the
/// plain serde query extractor cannot express.
pub type QueryPairs = Vec<(String, String)>;

pub struct QueryParams {
    inner: HashMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn from_pairs(pairs: QueryPairs) -> Self {
        let mut inner: HashMap<String, Vec<String>> = HashMap::new();
        pairs.into_iter().for_each(|(key, value)| {
            inner.entry(key).or_default().push(value);
        });
        Self { inner }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(|value| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner.get(key).cloned().unwrap_or_default()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| ApiError::InvalidRequest(format!("Invalid value for '{key}'"))),
            None => Ok(None),
        }
    }

    pub fn get_flag(&self, key: &str) -> bool {
        matches!(
            self.get_str(key),
            Some("1") | Some("true") | Some("True") | Some("yes")
        )
    }
}

/// `?page=N&limit=M`; both default when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn from_params(params: &QueryParams) -> Result<Self, ApiError> {
        Ok(Self {
            page: params.get_number("page")?,
            limit: params.get_number("limit")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserQuery {
    pub page: PageQuery,
    pub search: Vec<String>,
}

impl UserQuery {
    pub fn from_pairs(pairs: QueryPairs) -> Result<Self, ApiError> {
        let params = QueryParams::from_pairs(pairs);

        Ok(Self {
            page: PageQuery::from_params(&params)?,
            search: params
                .get_str("search")
                .map(|raw| {
                    raw.split(|c: char| c.is_whitespace() || c == ',')
                        .filter(|term| !term.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeQuery {
    pub page: PageQuery,
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeQuery {
    pub fn from_pairs(pairs: QueryPairs) -> Result<Self, ApiError> {
        let params = QueryParams::from_pairs(pairs);

        Ok(Self {
            page: PageQuery::from_params(&params)?,
            author: params.get_number("author")?,
            tags: params
                .get_all("tags")
                .into_iter()
                .filter(|slug| !slug.is_empty())
                .collect(),
            is_favorited: params.get_flag("is_favorited"),
            is_in_shopping_cart: params.get_flag("is_in_shopping_cart"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionQuery {
    pub page: PageQuery,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    /// A `recipes_limit` that is not a positive integer is ignored.
    pub fn from_pairs(pairs: QueryPairs) -> Result<Self, ApiError> {
        let params = QueryParams::from_pairs(pairs);
        let recipes_limit = params
            .get_str("recipes_limit")
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0);

        Ok(Self {
            page: PageQuery::from_params(&params)?,
            recipes_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> QueryPairs {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn recipe_query_collects_repeated_tags() {
        let query = RecipeQuery::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("is_favorited", "1"),
            ("author", "3"),
            ("limit", "10"),
        ]))
        .unwrap();

        assert_eq!(query.tags, vec!["breakfast", "lunch"]);
        assert!(query.is_favorited);
        assert!(!query.is_in_shopping_cart);
        assert_eq!(query.author, Some(3));
        assert_eq!(query.page.limit, Some(10));
        assert_eq!(query.page.page, None);
    }

    #[test]
    fn recipe_query_rejects_non_numeric_author() {
        let result = RecipeQuery::from_pairs(pairs(&[("author", "bob")]));
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn false_flags_do_not_filter() {
        let query = RecipeQuery::from_pairs(pairs(&[("is_in_shopping_cart", "0")])).unwrap();
        assert!(!query.is_in_shopping_cart);
    }

    #[test]
    fn recipes_limit_ignores_unusable_values() {
        for raw in ["0", "-3", "abc", ""] {
            let query = SubscriptionQuery::from_pairs(pairs(&[("recipes_limit", raw)])).unwrap();
            assert_eq!(query.recipes_limit, None, "value {raw:?}");
        }

        let query = SubscriptionQuery::from_pairs(pairs(&[("recipes_limit", "2")])).unwrap();
        assert_eq!(query.recipes_limit, Some(2));
    }

    #[test]
    fn recipe_form_defaults_missing_lists() {
        let form: RecipeForm = serde_json::from_value(serde_json::json!({
            "name": "Soup",
            "text": "Boil",
            "cooking_time": 10
        }))
        .unwrap();

        assert!(form.ingredients.is_empty());
        assert!(form.tags.is_empty());
        assert_eq!(form.image, None);
    }

    #[test]
    fn form_integers_accept_numbers_and_numeric_strings() {
        let form: RecipeForm = serde_json::from_value(serde_json::json!({
            "ingredients": [
                { "id": 1, "amount": "5" },
                { "id": 2, "amount": 1.5 },
                { "id": 3, "amount": 2.0 },
                { "id": 4, "amount": true },
                { "id": 5 }
            ],
            "name": "Soup",
            "text": "Boil",
            "cooking_time": " 15 "
        }))
        .unwrap();

        let amounts: Vec<Option<i64>> = form.ingredients.iter().map(|i| i.amount.get()).collect();
        assert_eq!(amounts, vec![Some(5), None, Some(2), None, None]);
        assert_eq!(form.cooking_time, FormInteger(Some(15)));
    }

    #[test]
    fn user_search_splits_terms() {
        let query = UserQuery::from_pairs(pairs(&[("search", " ali  example.com,x "), ("page", "2")])).unwrap();
        assert_eq!(query.search, vec!["ali", "example.com", "x"]);
        assert_eq!(query.page.page, Some(2));

        let query = UserQuery::from_pairs(pairs(&[])).unwrap();
        assert!(query.search.is_empty());
    }
}
