/// Image storage seam
///
/// Recipe images and avatars are handed to an [`ImageStore`], which returns
/// a key to keep in the database. Stores never decode image data: the
/// payload submitted by the client (typically a `data:image/...;base64,`
/// URL) is persisted as-is and keyed by its SHA-256, so resubmitting the same
/// picture maps to the same key.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Mutex,
};

use crate::error::{ServiceError, ServiceResult};

/// Where an image belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageNamespace {
    Recipes,
    Avatars,
}

impl ImageNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageNamespace::Recipes => "recipes",
            ImageNamespace::Avatars => "users",
        }
    }

    /// Request field the image arrives in
    pub fn field(&self) -> &'static str {
        match self {
            ImageNamespace::Recipes => "image",
            ImageNamespace::Avatars => "avatar",
        }
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists the payload and returns its key (`<namespace>/<digest>`)
    async fn store(&self, namespace: ImageNamespace, payload: &str) -> ServiceResult<String>;

    /// True when `key` names an image held by this store
    async fn contains(&self, key: &str) -> ServiceResult<bool>;

    /// Removes the image; deleting an unknown key is not an error
    async fn delete(&self, key: &str) -> ServiceResult<()>;
}

/// Content-addressed key for a payload
pub fn image_key(namespace: ImageNamespace, payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    format!("{}/{}", namespace.as_str(), hex::encode(digest))
}

/// Namespace part of a well-formed key
fn key_namespace(key: &str) -> Option<&str> {
    let (ns, digest) = key.split_once('/')?;
    let well_formed = matches!(ns, "recipes" | "users")
        && digest.len() == 64
        && digest.bytes().all(|b| b.is_ascii_hexdigit());
    well_formed.then_some(ns)
}

/// Keys are `<namespace>/<64 hex chars>`; anything else is never a path
fn is_valid_key(key: &str) -> bool {
    key_namespace(key).is_some()
}

/// Resolves a submitted image field: an existing key of the same namespace
/// is reused, anything else is stored as a new payload
///
/// Keys of the other namespace are rejected: recipes and users each release
/// images after checking only their own table.
pub async fn resolve_image(
    store: &dyn ImageStore,
    namespace: ImageNamespace,
    submitted: &str,
) -> ServiceResult<String> {
    let submitted = submitted.trim();
    if submitted.is_empty() {
        return Err(ServiceError::validation(namespace.field(), "Image is required"));
    }

    match key_namespace(submitted) {
        Some(ns) if ns != namespace.as_str() => {
            return Err(ServiceError::validation(
                namespace.field(),
                "Image belongs to another resource",
            ));
        }
        Some(_) if store.contains(submitted).await? => return Ok(submitted.to_string()),
        _ => {}
    }

    store.store(namespace, submitted).await
}

/// Stores images below a media root directory
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        is_valid_key(key).then(|| self.root.join(key))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn store(&self, namespace: ImageNamespace, payload: &str) -> ServiceResult<String> {
        let key = image_key(namespace, payload);
        let path = self.root.join(&key);

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(key = %key, "Image already stored");
            return Ok(key);
        }

        tokio::fs::create_dir_all(self.root.join(namespace.as_str())).await?;
        tokio::fs::write(&path, payload.as_bytes()).await?;

        tracing::info!(key = %key, bytes = payload.len(), "Stored image");
        Ok(key)
    }

    async fn contains(&self, key: &str) -> ServiceResult<bool> {
        match self.path_for(key) {
            Some(path) => Ok(tokio::fs::try_exists(path).await?),
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        let Some(path) = self.path_for(key) else {
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store for tests and local experiments
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: Mutex<HashMap<String, String>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> ServiceResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.images
            .lock()
            .map_err(|_| ServiceError::Storage("image map poisoned".to_string()))
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(&self, namespace: ImageNamespace, payload: &str) -> ServiceResult<String> {
        let key = image_key(namespace, payload);
        self.lock()?.insert(key.clone(), payload.to_string());
        Ok(key)
    }

    async fn contains(&self, key: &str) -> ServiceResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    async fn delete(&self, key: &str) -> ServiceResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_image_key_is_content_addressed() {
        let a = image_key(ImageNamespace::Recipes, PNG);
        let b = image_key(ImageNamespace::Recipes, PNG);
        assert_eq!(a, b);
        assert!(a.starts_with("recipes/"));
        assert_eq!(a.len(), "recipes/".len() + 64);
        assert_ne!(a, image_key(ImageNamespace::Avatars, PNG));
    }

    #[test]
    fn test_key_validation_blocks_traversal() {
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key("recipes/../../x"));
        assert!(!is_valid_key("recipes"));
        assert!(is_valid_key(&image_key(ImageNamespace::Avatars, "x")));
    }

    #[tokio::test]
    async fn test_resolve_reuses_existing_key() {
        let store = MemoryImageStore::new();
        let key = resolve_image(&store, ImageNamespace::Recipes, PNG).await.unwrap();
        let again = resolve_image(&store, ImageNamespace::Recipes, &key).await.unwrap();
        assert_eq!(key, again);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_rejects_blank() {
        let store = MemoryImageStore::new();
        let err = resolve_image(&store, ImageNamespace::Recipes, "  ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_rejects_key_of_other_namespace() {
        let store = MemoryImageStore::new();
        let avatar = resolve_image(&store, ImageNamespace::Avatars, PNG).await.unwrap();

        let err = resolve_image(&store, ImageNamespace::Recipes, &avatar)
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation { field, .. } => assert_eq!(field, "image"),
            other => panic!("unexpected error: {other:?}"),
        }

        let recipe = resolve_image(&store, ImageNamespace::Recipes, PNG).await.unwrap();
        let err = resolve_image(&store, ImageNamespace::Avatars, &recipe)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field, .. } if field == "avatar"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let root = std::env::temp_dir().join(format!("foodgram-media-{}", std::process::id()));
        let store = FsImageStore::new(&root);

        let key = store.store(ImageNamespace::Recipes, PNG).await.unwrap();
        assert!(store.contains(&key).await.unwrap());
        assert_eq!(store.store(ImageNamespace::Recipes, PNG).await.unwrap(), key);

        store.delete(&key).await.unwrap();
        assert!(!store.contains(&key).await.unwrap());
        store.delete(&key).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
