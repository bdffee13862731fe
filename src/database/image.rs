use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};

use super::error::ApiError;
use crate::constants::IMAGE_EXTENSIONS;

const MEDIA_URL: &str = "/media";
const RECIPE_IMAGE_DIR: &str = "recipes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decodes `data:image/<ext>;base64,<payload>`.
pub fn decode_data_uri(data: &str) -> Result<DecodedImage, ApiError> {
    let invalid = || ApiError::Validation(vec![String::from("Upload a valid image.")]);

    let (header, payload) = data
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .ok_or_else(invalid)?;

    let extension = header.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(invalid());
    }

    let bytes = STANDARD.decode(payload.trim()).map_err(|_e| invalid())?;
    if bytes.is_empty() {
        return Err(invalid());
    }

    Ok(DecodedImage { extension, bytes })
}

/// Writes a decoded image under `media_root` and returns its public URL.
pub async fn store_image(media_root: &Path, data: &str) -> Result<String, ApiError> {
    let image = decode_data_uri(data)?;
    let file_name = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);

    let directory: PathBuf = media_root.join(RECIPE_IMAGE_DIR);
    tokio::fs::create_dir_all(&directory)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create media directory: {e}")))?;
    tokio::fs::write(directory.join(&file_name), &image.bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store image: {e}")))?;

    log::trace!("> Stored image {file_name} ({} bytes)", image.bytes.len());

    Ok(format!("{MEDIA_URL}/{RECIPE_IMAGE_DIR}/{file_name}"))
}

/// Removes an image written by [`store_image`] whose recipe was never saved.
/// URLs outside the recipe image directory are left alone.
pub async fn discard_image(media_root: &Path, url: &str) {
    let prefix = format!("{MEDIA_URL}/{RECIPE_IMAGE_DIR}/");
    let file_name = match url.strip_prefix(&prefix) {
        Some(name) if !name.is_empty() && !name.contains('/') && !name.contains("..") => name,
        _ => {
            log::warn!("Refusing to discard image outside the media directory: {url}");
            return;
        }
    };

    let path = media_root.join(RECIPE_IMAGE_DIR).join(file_name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => log::trace!("> Discarded image {file_name}"),
        Err(e) => log::error!("Failed to discard image {}: {e}", path.display()),
    }
}
