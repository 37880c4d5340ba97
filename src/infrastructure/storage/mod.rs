//! Avatar file storage.
//!
//! Files are written to `{uploads.dir}/avatars/` and served by the static
//! file layer under `{uploads.public_path}/avatars/`.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::UploadSettings;
use crate::shared::error::AppError;

const AVATAR_DIR: &str = "avatars";

/// Accepted image types and the extension they are stored with.
const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

fn extension_for(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.trim().to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

#[derive(Debug, Clone)]
pub struct AvatarStorage {
    root: PathBuf,
    public_path: String,
    max_bytes: usize,
}

impl AvatarStorage {
    pub fn new(settings: &UploadSettings) -> Self {
        Self {
            root: PathBuf::from(&settings.dir),
            public_path: settings.public_path.trim_end_matches('/').to_string(),
            max_bytes: settings.max_avatar_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and write an avatar, returning its public URL.
    pub async fn save(&self, user_id: i64, content_type: &str, bytes: &[u8]) -> Result<String, AppError> {
        let ext = extension_for(content_type).ok_or_else(|| {
            AppError::BadRequest("Only JPEG, PNG, GIF and WebP images are allowed".to_string())
        })?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Avatar file is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "Avatar must be at most {} bytes",
                self.max_bytes
            )));
        }

        let dir = self.root.join(AVATAR_DIR);
        fs::create_dir_all(&dir).await.map_err(io_error)?;

        let file_name = format!("{}-{}.{}", user_id, Uuid::new_v4().simple(), ext);
        fs::write(dir.join(&file_name), bytes).await.map_err(io_error)?;
        debug!(user_id, file = %file_name, "Avatar stored");

        Ok(format!("{}/{}/{}", self.public_path, AVATAR_DIR, file_name))
    }

    /// Delete a previously stored avatar. URLs outside the avatar directory
    /// are ignored; a missing file is not an error.
    pub async fn remove(&self, url: &str) {
        let Some(path) = self.local_path(url) else {
            return;
        };
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to delete old avatar");
            }
        }
    }

    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let prefix = format!("{}/{}/", self.public_path, AVATAR_DIR);
        let name = url.strip_prefix(&prefix)?;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(self.root.join(AVATAR_DIR).join(Path::new(name)))
    }
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal(format!("Avatar storage failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn storage(dir: &Path) -> AvatarStorage {
        AvatarStorage::new(&UploadSettings {
            dir: dir.to_string_lossy().into_owned(),
            public_path: "/uploads/".into(),
            max_avatar_bytes: 16,
        })
    }

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("petcare-storage-{}", Uuid::new_v4().simple()))
    }

    #[test_case("image/jpeg", Some("jpg"))]
    #[test_case("IMAGE/PNG", Some("png"))]
    #[test_case("image/webp", Some("webp"))]
    #[test_case("image/svg+xml", None ; "svg rejected")]
    #[test_case("application/pdf", None ; "pdf rejected")]
    fn test_extension_for(content_type: &str, expected: Option<&str>) {
        assert_eq!(extension_for(content_type), expected);
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let root = temp_root();
        let storage = storage(&root);

        let url = storage.save(42, "image/png", b"png-bytes").await.unwrap();
        assert!(url.starts_with("/uploads/avatars/42-"));
        assert!(url.ends_with(".png"));

        let path = storage.local_path(&url).unwrap();
        assert!(path.exists());

        storage.remove(&url).await;
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_wrong_type() {
        let root = temp_root();
        let storage = storage(&root);

        let err = storage.save(1, "image/png", &[0u8; 17]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = storage.save(1, "text/plain", b"hi").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_local_path_rejects_foreign_urls() {
        let storage = storage(Path::new("/tmp/x"));
        assert!(storage.local_path("https://cdn.example.com/a.png").is_none());
        assert!(storage.local_path("/uploads/avatars/../secret").is_none());
        assert!(storage.local_path("/uploads/avatars/1-a.png").is_some());
    }
}
