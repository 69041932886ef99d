use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::Uploads;
use crate::error::{ApiError, ApiResult};

/// Upload directory on disk plus the policy applied to incoming files.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    public_path: String,
    max_bytes: usize,
    allowed_mime_types: Vec<String>,
}

impl MediaStorage {
    pub fn new(settings: &Uploads) -> Self {
        MediaStorage {
            root: settings.dir.clone(),
            public_path: settings.public_path.trim_end_matches('/').to_string(),
            max_bytes: settings.max_bytes,
            allowed_mime_types: settings
                .allowed_mime_types
                .iter()
                .map(|m| m.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn check_mime(&self, mime_type: &str) -> ApiResult<()> {
        if self.allowed_mime_types.iter().any(|m| m == mime_type) {
            Ok(())
        } else {
            Err(ApiError::UnsupportedMediaType(mime_type.to_string()))
        }
    }

    pub fn check_size(&self, len: usize) -> ApiResult<()> {
        if len == 0 {
            return Err(ApiError::bad_request("uploaded file is empty"));
        }
        if len > self.max_bytes {
            return Err(ApiError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    pub fn public_url(&self, stored_name: &str) -> String {
        format!("{}/{}", self.public_path, stored_name)
    }

    fn path_for(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    pub async fn write(&self, stored_name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create upload dir {}", self.root.display()))?;
        let path = self.path_for(stored_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write upload {}", path.display()))?;
        Ok(())
    }

    /// Remove a stored file. Returns `Ok(false)` when it was already gone.
    pub async fn remove(&self, stored_name: &str) -> std::io::Result<bool> {
        match tokio::fs::remove_file(self.path_for(stored_name)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Lowercased MIME essence without parameters, e.g. `image/png`.
pub fn normalize_mime(raw: Option<&str>) -> String {
    raw.and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Final path component of a client-supplied file name.
pub fn clean_original_name(raw: Option<&str>) -> String {
    let name = raw
        .unwrap_or_default()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.chars().take(255).collect()
    }
}

fn extension_from_name(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!ext.is_empty() && ext.len() <= 10).then_some(ext)
}

/// Extensions that serve back as `mime_type`; the first is the canonical one.
fn extensions_for_mime(mime_type: &str) -> &'static [&'static str] {
    match mime_type {
        "image/jpeg" => &["jpg", "jpeg"],
        "image/png" => &["png"],
        "image/webp" => &["webp"],
        "image/gif" => &["gif"],
        "image/avif" => &["avif"],
        "image/svg+xml" => &["svg"],
        "application/pdf" => &["pdf"],
        "video/mp4" => &["mp4"],
        "video/webm" => &["webm"],
        _ => &["bin"],
    }
}

/// `<cuid>.<ext>`. Static serving infers the content type from the
/// extension, so the file name's extension is kept only when it agrees
/// with the checked MIME type.
pub fn stored_name_for(original_name: &str, mime_type: &str) -> String {
    let allowed = extensions_for_mime(mime_type);
    let ext = extension_from_name(original_name)
        .filter(|ext| allowed.contains(&ext.as_str()))
        .unwrap_or_else(|| allowed[0].to_string());
    format!("{}.{}", cuid2::create_id(), ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime(Some("Image/PNG; charset=binary")), "image/png");
        assert_eq!(normalize_mime(None), "application/octet-stream");
    }

    #[test]
    fn test_clean_original_name() {
        assert_eq!(clean_original_name(Some("../../etc/passwd")), "passwd");
        assert_eq!(clean_original_name(Some("C:\\photos\\beach.JPG")), "beach.JPG");
        assert_eq!(clean_original_name(Some("")), "upload");
    }

    #[test]
    fn test_stored_name_extension() {
        assert!(stored_name_for("Beach.JPG", "image/jpeg").ends_with(".jpg"));
        assert!(stored_name_for("beach.jpeg", "image/jpeg").ends_with(".jpeg"));
        assert!(stored_name_for("map.we$bp", "image/webp").ends_with(".webp"));
        assert!(stored_name_for("noext", "image/png").ends_with(".png"));
        assert!(stored_name_for("noext", "text/plain").ends_with(".bin"));
        assert_ne!(
            stored_name_for("a.png", "image/png"),
            stored_name_for("a.png", "image/png")
        );
    }

    #[test]
    fn test_stored_extension_follows_mime() {
        assert!(stored_name_for("pic.html", "image/png").ends_with(".png"));
        assert!(stored_name_for("doc.svg", "application/pdf").ends_with(".pdf"));
        assert!(stored_name_for("clip.exe", "application/zip").ends_with(".bin"));
    }

    #[test]
    fn test_size_and_mime_policy() {
        let storage = MediaStorage::new(&Uploads {
            max_bytes: 10,
            ..Uploads::default()
        });
        assert!(matches!(storage.check_size(0), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            storage.check_size(11),
            Err(ApiError::PayloadTooLarge { limit: 10 })
        ));
        assert!(storage.check_size(10).is_ok());
        assert!(storage.check_mime("image/png").is_ok());
        assert!(matches!(
            storage.check_mime("text/html"),
            Err(ApiError::UnsupportedMediaType(_))
        ));
        assert_eq!(storage.public_url("x.png"), "/uploads/x.png");
    }

    #[tokio::test]
    async fn test_write_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(&Uploads {
            dir: dir.path().join("nested"),
            ..Uploads::default()
        });
        storage.write("a.txt", b"hello").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("nested/a.txt")).unwrap(), b"hello");
        assert!(storage.remove("a.txt").await.unwrap());
        assert!(!storage.remove("a.txt").await.unwrap());
    }
}
