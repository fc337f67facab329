//! Photo and logo storage.
//!
//! Uploading an asset is never allowed to block saving the team or player it belongs to: when an
//! upload fails the record is saved with a placeholder reference instead.

use crate::errors::{Error, Result};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Somewhere uploaded files can be written and later served from.
pub trait AssetStore {
    /// Stores `bytes` at the relative `path` and returns the public reference to it.
    fn upload(&self, bytes: &[u8], path: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Writes assets under a local directory served at `base_url`.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    fn target(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(Error::validation(format!("Invalid asset path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetStore for LocalAssetStore {
    fn upload(&self, bytes: &[u8], path: &str) -> impl Future<Output = Result<String>> + Send {
        let target = self.target(path);
        let bytes = bytes.to_vec();
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        async move {
            let target = target?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, bytes).await?;
            debug!("Stored asset at {}", target.display());
            Ok(url)
        }
    }
}

/// Relative upload path for a player's photo.
#[must_use]
pub fn player_photo_path(phone: &str, extension: &str) -> String {
    format!("players/{phone}.{}", extension.trim_start_matches('.'))
}

/// Relative upload path for a team's logo.
#[must_use]
pub fn team_logo_path(team_name: &str, extension: &str) -> String {
    let slug: String = team_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '-' })
        .collect();
    format!("teams/{slug}.{}", extension.trim_start_matches('.'))
}

/// Picks the reference to store for an asset.
///
/// Prefers a successful upload, then an explicit URL, then `placeholder`. Upload failures are
/// logged and fall through.
pub async fn resolve_asset<S: AssetStore>(
    store: &S,
    upload: Option<(&[u8], &str)>,
    explicit_url: Option<&str>,
    placeholder: &str,
) -> String {
    if let Some((bytes, path)) = upload {
        match store.upload(bytes, path).await {
            Ok(url) => return url,
            Err(e) => warn!(path, "Asset upload failed, keeping fallback: {e}"),
        }
    }

    explicit_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map_or_else(|| placeholder.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    struct FailingStore;

    impl AssetStore for FailingStore {
        fn upload(&self, _bytes: &[u8], path: &str) -> impl Future<Output = Result<String>> + Send {
            let path = path.to_string();
            async move { Err(Error::validation(format!("storage offline for {path}"))) }
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("auction-desk-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_upload_paths() {
        assert_eq!(player_photo_path("9845012345", ".jpg"), "players/9845012345.jpg");
        assert_eq!(team_logo_path("Bellandur Sharks", "jpeg"), "teams/BELLANDUR-SHARKS.jpeg");
    }

    #[tokio::test]
    async fn test_local_store_writes_file() -> Result<()> {
        let root = scratch_dir("write");
        let store = LocalAssetStore::new(&root, "/assets/");

        let url = store.upload(b"png", "players/1.png").await?;
        assert_eq!(url, "/assets/players/1.png");
        assert_eq!(tokio::fs::read(root.join("players/1.png")).await?, b"png");

        tokio::fs::remove_dir_all(&root).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_local_store_rejects_escaping_paths() {
        let store = LocalAssetStore::new(scratch_dir("escape"), "/assets");
        assert!(store.upload(b"x", "../secret").await.is_err());
        assert!(store.upload(b"x", "/etc/passwd").await.is_err());
        assert!(store.upload(b"x", "").await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_asset_fallbacks() {
        let placeholder = "/assets/player-template.png";

        let url = resolve_asset(&FailingStore, Some((b"x", "players/1.png")), None, placeholder).await;
        assert_eq!(url, placeholder);

        let url = resolve_asset(
            &FailingStore,
            Some((b"x", "players/1.png")),
            Some("https://cdn.example/p.png"),
            placeholder,
        )
        .await;
        assert_eq!(url, "https://cdn.example/p.png");

        let url = resolve_asset(&FailingStore, None, Some("  "), placeholder).await;
        assert_eq!(url, placeholder);
    }

    #[tokio::test]
    async fn test_resolve_asset_prefers_upload() -> Result<()> {
        let root = scratch_dir("resolve");
        let store = LocalAssetStore::new(&root, "/assets");

        let url = resolve_asset(
            &store,
            Some((b"logo", "teams/SHARKS.png")),
            Some("https://cdn.example/old.png"),
            "/assets/team-placeholder.png",
        )
        .await;
        assert_eq!(url, "/assets/teams/SHARKS.png");

        tokio::fs::remove_dir_all(&root).await?;
        Ok(())
    }
}
