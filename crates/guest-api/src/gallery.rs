//! Typed adapter for the gallery endpoints.
//!
//! The gallery serves signed URLs into token-protected file storage; this
//! adapter only fetches those URLs, it never streams the bytes itself.

use crate::client::ApiClient;
use crate::error::ApiResult;
use serde::Deserialize;
use std::sync::Arc;
use url::form_urlencoded;

/// Downloadable archive kinds the backend offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    AllPhotos,
    Video,
    BestMoments,
}

impl ArchiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::AllPhotos => "wedding_day_all_photos",
            ArchiveKind::Video => "wedding_day_video",
            ArchiveKind::BestMoments => "wedding_best_moments",
        }
    }
}

/// Whether gallery content is published yet.
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryStatus {
    #[serde(default = "default_enabled")]
    pub content_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Relative file paths inside one gallery folder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderListing {
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SignedUrl {
    url: String,
}

#[derive(Clone)]
pub struct GalleryApi {
    client: Arc<ApiClient>,
}

impl GalleryApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    fn query(key: &str, value: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(key, value)
            .finish()
    }

    pub async fn status(&self) -> ApiResult<GalleryStatus> {
        let response = self.client.get("gallery/status").await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to load gallery status"));
        }
        response.json()
    }

    /// Signed URL for viewing one file (image or video).
    pub async fn stream_url(&self, path: &str) -> ApiResult<String> {
        let endpoint = format!("gallery/stream-url?{}", Self::query("path", path));
        let response = self.client.get(&endpoint).await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to get stream URL"));
        }
        Ok(response.json::<SignedUrl>()?.url)
    }

    /// List file paths inside a folder (e.g. `couple_photo`, `dress_code`).
    pub async fn list(&self, folder: &str) -> ApiResult<FolderListing> {
        let endpoint = format!("gallery/list?{}", Self::query("folder", folder));
        let response = self.client.get(&endpoint).await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to list gallery folder"));
        }
        response.json()
    }

    /// Signed URL for downloading one file.
    pub async fn download_url(&self, path: &str) -> ApiResult<String> {
        let endpoint = format!("gallery/download-url?{}", Self::query("path", path));
        let response = self.client.get(&endpoint).await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to get download URL"));
        }
        Ok(response.json::<SignedUrl>()?.url)
    }

    /// Signed URL for one of the prepared archives.
    pub async fn archive_url(&self, kind: ArchiveKind) -> ApiResult<String> {
        let endpoint = format!("gallery/archive-url?{}", Self::query("type", kind.as_str()));
        let response = self.client.get(&endpoint).await?;
        if !response.is_success() {
            return Err(response.status_error("Failed to get archive URL"));
        }
        Ok(response.json::<SignedUrl>()?.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_encodes_path() {
        assert_eq!(
            GalleryApi::query("path", "couple photo/bride.jpg"),
            "path=couple+photo%2Fbride.jpg"
        );
    }

    #[test]
    fn test_archive_kind_wire_names() {
        assert_eq!(ArchiveKind::AllPhotos.as_str(), "wedding_day_all_photos");
        assert_eq!(ArchiveKind::Video.as_str(), "wedding_day_video");
        assert_eq!(ArchiveKind::BestMoments.as_str(), "wedding_best_moments");
    }

    #[test]
    fn test_status_defaults_to_enabled() {
        let status: GalleryStatus = serde_json::from_str("{}").unwrap();
        assert!(status.content_enabled);
    }
}
