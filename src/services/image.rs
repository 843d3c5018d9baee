use crate::config::Config;
use crate::domain::AdId;
use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

/// Public prefix the router serves `general.images_path` under.
pub const PUBLIC_PREFIX: &str = "/static/images";

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

/// Downloads generated images and keeps them under the images directory.
#[derive(Clone)]
pub struct ImageService {
    client: Client,
    images_path: PathBuf,
    download_timeout: Duration,
}

impl ImageService {
    #[must_use]
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            images_path: PathBuf::from(&config.general.images_path),
            download_timeout: Duration::from_secs(config.ai.download_timeout_seconds),
        }
    }

    fn ad_dir(&self, ad_id: AdId) -> PathBuf {
        self.images_path.join("ads").join(ad_id.to_string())
    }

    /// Fetches `source` (http(s) URL or `data:` URI), stores it for `ad_id`
    /// and returns the public URL.
    pub async fn save_ad_image(&self, source: &str, ad_id: AdId) -> Result<String> {
        let (bytes, extension) = if source.starts_with("data:") {
            decode_data_uri(source)?
        } else {
            self.download(source).await?
        };

        if bytes.is_empty() {
            bail!("Image source returned an empty body");
        }

        let digest = hex::encode(Sha256::digest(&bytes));
        let filename = format!("{}.{extension}", &digest[..16]);

        let dir = self.ad_dir(ad_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let file_path = dir.join(&filename);
        fs::write(&file_path, &bytes)
            .await
            .with_context(|| format!("Failed to write image to {}", file_path.display()))?;

        info!(ad_id = %ad_id, path = %file_path.display(), size = bytes.len(), "Stored ad image");

        Ok(format!("{PUBLIC_PREFIX}/ads/{ad_id}/{filename}"))
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, String)> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("Unsupported image source scheme");
        }

        info!(url = %url, "Downloading image");

        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .context("Image download failed")?;

        if !response.status().is_success() {
            bail!("Image download returned status {}", response.status());
        }

        let from_header = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(extension_for_mime);

        let bytes = response.bytes().await.context("Failed to read image body")?;
        let extension = from_header
            .or_else(|| extension_from_url(url))
            .unwrap_or_else(|| "png".to_string());

        Ok((bytes.to_vec(), extension))
    }

    /// Removes every stored image of `ad_id`. A missing directory is fine.
    pub async fn delete_ad_images(&self, ad_id: AdId) -> Result<()> {
        let dir = self.ad_dir(ad_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", dir.display())),
        }
    }

    /// Fire-and-forget variant used after the ad row is gone.
    pub fn spawn_delete_ad_images(&self, ad_id: AdId) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.delete_ad_images(ad_id).await {
                warn!(ad_id = %ad_id, error = %e, "Failed to delete ad images");
            }
        });
    }
}

fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, String)> {
    let rest = uri.strip_prefix("data:").unwrap_or(uri);
    let Some((meta, payload)) = rest.split_once(',') else {
        bail!("Malformed data URI");
    };
    let Some(mime) = meta.strip_suffix(";base64") else {
        bail!("Only base64 data URIs are supported");
    };

    let bytes = BASE64
        .decode(payload.trim())
        .context("Invalid base64 image payload")?;
    let extension = extension_for_mime(mime).unwrap_or_else(|| "png".to_string());

    Ok((bytes, extension))
}

fn extension_for_mime(mime: &str) -> Option<String> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    if essence.eq_ignore_ascii_case("image/jpeg") {
        return Some("jpg".to_string());
    }

    mime_guess::get_mime_extensions_str(essence)?
        .iter()
        .find(|ext| ALLOWED_EXTENSIONS.contains(ext))
        .map(|ext| (*ext).to_string())
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url::Url::parse(url).ok()?.path().to_string();
    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &Path) -> ImageService {
        let mut config = Config::default();
        config.general.images_path = dir.to_string_lossy().to_string();
        ImageService::new(Client::new(), &config)
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(extension_for_mime("image/png").as_deref(), Some("png"));
        assert_eq!(extension_for_mime("image/jpeg; charset=binary").as_deref(), Some("jpg"));
        assert_eq!(extension_for_mime("text/html"), None);
        assert_eq!(
            extension_from_url("https://cdn.test/a/b/pic.WEBP?sig=1").as_deref(),
            Some("webp")
        );
        assert_eq!(extension_from_url("https://cdn.test/file"), None);
    }

    #[tokio::test]
    async fn test_saves_data_uri_and_deletes_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let images = service(dir);
        let payload = BASE64.encode(b"fake-png-bytes");

        let url = images
            .save_ad_image(&format!("data:image/png;base64,{payload}"), AdId::new(3))
            .await
            .unwrap();

        assert!(url.starts_with("/static/images/ads/3/"));
        assert!(url.ends_with(".png"));
        let stored = dir.join("ads/3").join(url.rsplit('/').next().unwrap());
        assert_eq!(std::fs::read(&stored).unwrap(), b"fake-png-bytes");

        images.delete_ad_images(AdId::new(3)).await.unwrap();
        assert!(!dir.join("ads/3").exists());
        images.delete_ad_images(AdId::new(3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_empty_and_unsupported_sources() {
        let tmp = TempDir::new().unwrap();
        let images = service(tmp.path());

        assert!(images.save_ad_image("data:image/png;base64,", AdId::new(1)).await.is_err());
        assert!(images.save_ad_image("ftp://host/x.png", AdId::new(1)).await.is_err());
        assert!(images.save_ad_image("data:image/png,raw", AdId::new(1)).await.is_err());
    }
}
