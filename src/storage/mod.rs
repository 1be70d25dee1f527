// Photo storage for reported items

pub mod r2;

pub use r2::R2Backend;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Object storage that holds item photos.
#[async_trait::async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store `data` under `key` and return a URL referencing it.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    fn bucket(&self) -> &str;
}

/// Upload an item photo under `photos/<uuid>.<ext>` and return its URL.
///
/// The URL is stored on the item as an opaque string.
pub async fn upload_photo(
    store: &dyn PhotoStore,
    data: &[u8],
    content_type: &str,
) -> AppResult<String> {
    if data.is_empty() {
        return Err(AppError::InvalidInput("photo is empty".to_string()));
    }
    let ext = extension_for(content_type).ok_or_else(|| {
        AppError::InvalidInput(format!("unsupported photo type '{}'", content_type))
    })?;
    let key = format!("photos/{}.{}", Uuid::new_v4(), ext);
    let url = store.upload(&key, data, content_type).await?;
    tracing::info!("Photo uploaded: key={}, size={}", key, data.len());
    Ok(url)
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::testing::MemoryPhotos;

    #[tokio::test]
    async fn test_upload_photo_key_layout() {
        let store = MemoryPhotos::default();
        let url = upload_photo(&store, b"\x89PNG", "image/png").await.unwrap();
        let keys = store.keys().await;
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("photos/"));
        assert!(keys[0].ends_with(".png"));
        assert_eq!(url, format!("https://photos.test/{}", keys[0]));
    }

    #[tokio::test]
    async fn test_upload_photo_rejects_non_images() {
        let store = MemoryPhotos::default();
        assert!(upload_photo(&store, b"%PDF", "application/pdf").await.is_err());
        assert!(upload_photo(&store, b"", "image/png").await.is_err());
        assert!(store.keys().await.is_empty());
    }
}
