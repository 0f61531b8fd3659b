//! Blob store capability.

use async_trait::async_trait;
use url::Url;

use crate::error::{StorageError, StorageResult};

/// Object store the orchestrator writes generated images to.
///
/// Writes are upserts: uploading to an existing key replaces its content.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `key`, replacing any existing object.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Publicly resolvable URL for `key`.
    fn public_url(&self, key: &str) -> StorageResult<String>;

    /// Check that the store is reachable.
    async fn check_connectivity(&self) -> StorageResult<()>;

    /// Short backend name for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}

/// Reject keys that would escape the bucket prefix or address nothing.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Parse a public base URL, normalizing it to end with a slash so that
/// joining keeps the last path segment.
pub fn parse_public_base(base: &str) -> StorageResult<Url> {
    let mut normalized = base.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized)
        .map_err(|e| StorageError::config_error(format!("Invalid public URL '{}': {}", base, e)))
}

/// Resolve `key` against a public base URL.
///
/// Each key segment is appended as one percent-encoded path segment, so
/// characters such as `#` or `?` in a project id stay part of the path.
pub fn join_public_url(base: &Url, key: &str) -> StorageResult<String> {
    validate_key(key)?;
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StorageError::public_url(key, "public base cannot carry a path"))?
        .pop_if_empty()
        .extend(key.split('/'));
    if !url.as_str().starts_with(base.as_str()) {
        return Err(StorageError::public_url(key, "key resolves outside the public base"));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("projects/p1/image_1.png").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/abs.png").is_err());
        assert!(validate_key("a//b.png").is_err());
        assert!(validate_key("a/../b.png").is_err());
    }

    #[test]
    fn test_join_keeps_base_path() {
        let base = parse_public_base("https://x.supabase.co/storage/v1/object/public/images").unwrap();
        assert_eq!(
            join_public_url(&base, "projects/p1/image_1.png").unwrap(),
            "https://x.supabase.co/storage/v1/object/public/images/projects/p1/image_1.png"
        );
    }

    #[test]
    fn test_join_keeps_scheme_like_keys_under_base() {
        let base = parse_public_base("https://cdn.example.com/images/").unwrap();
        let url = join_public_url(&base, "javascript:alert.png").unwrap();
        assert!(url.starts_with("https://cdn.example.com/images/"));
    }

    #[test]
    fn test_join_encodes_reserved_characters() {
        let base = parse_public_base("https://cdn.example.com/files").unwrap();

        let url = join_public_url(&base, "projects/ep#3/image_1.png").unwrap();
        assert_eq!(url, "https://cdn.example.com/files/projects/ep%233/image_1.png");
        assert_eq!(Url::parse(&url).unwrap().path(), "/files/projects/ep%233/image_1.png");

        let url = join_public_url(&base, "projects/a?b/image_1.png").unwrap();
        assert_eq!(Url::parse(&url).unwrap().query(), None);
    }

    #[test]
    fn test_bad_public_base() {
        assert!(parse_public_base("not a url").is_err());
    }
}
