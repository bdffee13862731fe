pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 1440;

pub const RECIPE_NAME_LENGTH: usize = 255;

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const SHOPPING_CART_FILENAME: &str = "product_cart.txt";

// Base64 images inflate request bodies.
pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
