//! Photo download over HTTP.

use async_trait::async_trait;
use photopick_core::PhotoCandidate;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: reqwest::StatusCode },
    #[error("cannot decode image from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
}

/// Retrieves and decodes one photo.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PhotoCandidate, FetchError>;
}

/// `reqwest`-backed fetcher. Image URLs are fetched without the browser's
/// session cookies.
pub struct HttpPhotoFetcher {
    client: reqwest::Client,
}

impl HttpPhotoFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("photopick/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PhotoFetcher for HttpPhotoFetcher {
    async fn fetch(&self, url: &str) -> Result<PhotoCandidate, FetchError> {
        let transport = |source| FetchError::Transport { url: url.to_string(), source };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        let bytes = response.bytes().await.map_err(transport)?;
        tracing::debug!(url, bytes = bytes.len(), "photo downloaded");

        decode_photo(url, &bytes)
    }
}

/// Decode raw image bytes (any format `image` recognizes) into a candidate.
pub fn decode_photo(url: &str, bytes: &[u8]) -> Result<PhotoCandidate, FetchError> {
    let image = image::load_from_memory(bytes)
        .map_err(|source| FetchError::Decode { url: url.to_string(), source })?
        .to_rgb8();
    Ok(PhotoCandidate { source_url: url.to_string(), image })
}
