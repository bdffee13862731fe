//! Payload checks that run before anything touches storage.
//!
//! Every rule is evaluated and all violations are reported together, so a
//! client can fix a payload in a single round trip.

use std::collections::HashSet;

use super::{
    error::ApiError,
    form::{IngredientAmount, RecipeForm, RegisterForm, ValidatedRecipe},
};
use crate::constants::{
    MAX_COOKING_TIME, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MAX_USERNAME_LENGTH, MIN_COOKING_TIME,
    MIN_INGREDIENT_AMOUNT, MIN_PASSWORD_LENGTH, RECIPE_NAME_LENGTH,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        ApiError::Validation(value.messages)
    }
}

/// Bounds applied by [`validate_recipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeRules {
    pub min_amount: i64,
    pub min_cooking_time: i64,
    pub max_cooking_time: i64,
}

impl Default for RecipeRules {
    fn default() -> Self {
        Self {
            min_amount: MIN_INGREDIENT_AMOUNT.into(),
            min_cooking_time: MIN_COOKING_TIME.into(),
            max_cooking_time: MAX_COOKING_TIME.into(),
        }
    }
}

/// Checks a recipe payload and returns it with every number narrowed to
/// its storage type.
pub fn validate_recipe(form: RecipeForm, rules: &RecipeRules) -> Result<ValidatedRecipe, ValidationError> {
    let mut errors = vec![];

    if form.ingredients.is_empty() {
        errors.push(String::from("Add at least one ingredient for the recipe."));
    }

    let mut ingredients = Vec::with_capacity(form.ingredients.len());
    let mut seen_ingredients = HashSet::new();
    for ingredient in form.ingredients.iter() {
        match ingredient.amount.get() {
            Some(amount) if amount < rules.min_amount => errors.push(format!(
                "Ingredient with id - {} must be integer and ≥{}.",
                ingredient.id, rules.min_amount
            )),
            Some(amount) => match i32::try_from(amount) {
                Ok(amount) => ingredients.push(IngredientAmount {
                    id: ingredient.id,
                    amount,
                }),
                Err(_) => errors.push(format!(
                    "Ingredient with id - {} has too large an amount.",
                    ingredient.id
                )),
            },
            None => errors.push(format!(
                "Ingredient with id - {} must be integer and ≥{}.",
                ingredient.id, rules.min_amount
            )),
        }
        if !seen_ingredients.insert(ingredient.id) {
            errors.push(String::from("Cannot add the same ingredient"));
        }
    }

    let unique_tags: HashSet<_> = form.tags.iter().collect();
    if unique_tags.len() < form.tags.len() {
        errors.push(String::from("Cannot use the same tag more than once."));
    }

    let cooking_time = match form.cooking_time.get() {
        Some(minutes) if minutes < rules.min_cooking_time => {
            errors.push(format!(
                "Cooking time must be ≥{} minute.",
                rules.min_cooking_time
            ));
            None
        }
        Some(minutes) if minutes > rules.max_cooking_time => {
            errors.push(format!(
                "Cooking time must be ≤ {} minutes.",
                rules.max_cooking_time
            ));
            None
        }
        Some(minutes) => match i32::try_from(minutes) {
            Ok(minutes) => Some(minutes),
            Err(_) => {
                errors.push(String::from("Cooking time is too large."));
                None
            }
        },
        None => {
            errors.push(String::from("Cooking time must be a whole number of minutes."));
            None
        }
    };

    if form.name.trim().is_empty() {
        errors.push(String::from("Recipe name may not be blank."));
    }
    if form.name.chars().count() > RECIPE_NAME_LENGTH {
        errors.push(format!(
            "Recipe name must be at most {RECIPE_NAME_LENGTH} characters."
        ));
    }
    if form.text.trim().is_empty() {
        errors.push(String::from("Recipe description may not be blank."));
    }

    match cooking_time {
        Some(cooking_time) if errors.is_empty() => Ok(ValidatedRecipe {
            ingredients,
            tags: form.tags,
            image: form.image,
            name: form.name,
            text: form.text,
            cooking_time,
        }),
        _ => Err(ValidationError { messages: errors }),
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

pub fn validate_registration(form: &RegisterForm) -> Result<(), ValidationError> {
    let mut errors = vec![];

    if form.username.is_empty() || !form.username.chars().all(is_username_char) {
        errors.push(String::from("Invalid value for \"username\" field."));
    }
    if form.username.chars().count() > MAX_USERNAME_LENGTH {
        errors.push(format!(
            "Username must be at most {MAX_USERNAME_LENGTH} characters."
        ));
    }

    let email = form.email.trim();
    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.contains('@'))
        .unwrap_or(false);
    if !well_formed {
        errors.push(String::from("Enter a valid email address."));
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        errors.push(format!(
            "Email must be at most {MAX_EMAIL_LENGTH} characters."
        ));
    }

    for (field, value) in [("first_name", &form.first_name), ("last_name", &form.last_name)] {
        if value.trim().is_empty() {
            errors.push(format!("Field \"{field}\" may not be blank."));
        }
        if value.chars().count() > MAX_NAME_LENGTH {
            errors.push(format!(
                "Field \"{field}\" must be at most {MAX_NAME_LENGTH} characters."
            ));
        }
    }

    if let Err(e) = validate_new_password(&form.password) {
        errors.extend(e.messages);
    }

    if !errors.is_empty() {
        return Err(ValidationError { messages: errors });
    }

    Ok(())
}

pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    let mut errors = vec![];

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push(String::from("This password is entirely numeric."));
    }

    if !errors.is_empty() {
        return Err(ValidationError { messages: errors });
    }

    Ok(())
}
