use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{sync::LazyLock, time::Duration};
use url::Url;

static ICON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\.(svg|ico)$|favicon)").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum ImageDiscoveryError {
    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),
    #[error("Image discovery request failed: {0}")]
    RequestError(String),
    #[error("Image discovery is not configured")]
    NotConfigured,
}

/// Finds candidate images on a supplier's web page.
#[async_trait]
pub trait ImageDiscovery: Send + Sync {
    async fn discover(&self, page_url: &str) -> Result<Vec<String>, ImageDiscoveryError>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DiscoveryResponse {
    Wrapped { images: Vec<String> },
    Bare(Vec<String>),
}

impl DiscoveryResponse {
    fn into_images(self) -> Vec<String> {
        match self {
            DiscoveryResponse::Wrapped { images } => images,
            DiscoveryResponse::Bare(images) => images,
        }
    }
}

pub fn parse_page_url(page_url: &str) -> Result<Url, ImageDiscoveryError> {
    let url = Url::parse(page_url.trim())
        .map_err(|e| ImageDiscoveryError::InvalidUrl(format!("{}: {}", page_url, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ImageDiscoveryError::InvalidUrl(format!(
            "unsupported scheme {}",
            other
        ))),
    }
}

/// Keep absolute http(s) image URLs, dropping icons and duplicates.
pub fn clean_image_urls(urls: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for raw in urls {
        let Ok(url) = Url::parse(raw.trim()) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") || ICON_RE.is_match(url.path()) {
            continue;
        }
        let url = url.to_string();
        if !cleaned.contains(&url) {
            cleaned.push(url);
        }
    }
    cleaned
}

pub struct HttpImageDiscovery {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpImageDiscovery {
    pub fn new(endpoint: &str) -> Result<Self, ImageDiscoveryError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| ImageDiscoveryError::RequestError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl ImageDiscovery for HttpImageDiscovery {
    async fn discover(&self, page_url: &str) -> Result<Vec<String>, ImageDiscoveryError> {
        let page = parse_page_url(page_url)?;

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("url", page.as_str())])
            .send()
            .await
            .map_err(|e| ImageDiscoveryError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ImageDiscoveryError::RequestError(format!(
                "service returned {}",
                response.status()
            )));
        }

        let body: DiscoveryResponse = response
            .json()
            .await
            .map_err(|e| ImageDiscoveryError::RequestError(e.to_string()))?;

        Ok(clean_image_urls(body.into_images()))
    }
}

/// Used when no discovery endpoint is configured.
pub struct NoImageDiscovery;

#[async_trait]
impl ImageDiscovery for NoImageDiscovery {
    async fn discover(&self, page_url: &str) -> Result<Vec<String>, ImageDiscoveryError> {
        parse_page_url(page_url)?;
        Err(ImageDiscoveryError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_must_be_http() {
        assert!(parse_page_url("https://lodge.example.com/rooms").is_ok());
        assert!(matches!(
            parse_page_url("ftp://lodge.example.com"),
            Err(ImageDiscoveryError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_page_url("not a url"),
            Err(ImageDiscoveryError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_clean_image_urls() {
        let cleaned = clean_image_urls(vec![
            "https://cdn.example.com/room-1.jpg".to_string(),
            "https://cdn.example.com/room-1.jpg".to_string(),
            "https://cdn.example.com/favicon.png".to_string(),
            "https://cdn.example.com/logo.svg".to_string(),
            "/relative/pool.jpg".to_string(),
            "data:image/png;base64,AAAA".to_string(),
            "https://cdn.example.com/images/pool?w=800".to_string(),
        ]);

        assert_eq!(
            cleaned,
            vec![
                "https://cdn.example.com/room-1.jpg".to_string(),
                "https://cdn.example.com/images/pool?w=800".to_string(),
            ]
        );
    }

    #[test]
    fn test_response_shapes() {
        let wrapped: DiscoveryResponse =
            serde_json::from_str(r#"{"images": ["https://a.example/1.jpg"]}"#).unwrap();
        let bare: DiscoveryResponse =
            serde_json::from_str(r#"["https://a.example/1.jpg"]"#).unwrap();

        assert_eq!(wrapped.into_images(), bare.into_images());
    }
}
