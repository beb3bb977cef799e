use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use propquote_core::config::DocumentsConfig;
use propquote_core::documents::QuoteDocument;

use super::DocumentError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl FetchedImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Object-storage lookup for floor plans and photos.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<FetchedImage, DocumentError>;
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
    base_url: Option<String>,
    auth_token: Option<SecretString>,
}

impl HttpImageFetcher {
    pub fn from_config(config: &DocumentsConfig) -> Result<Self, DocumentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.image_fetch_timeout_secs))
            .build()
            .map_err(|e| DocumentError::ImageFetch(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.image_base_url.clone(),
            auth_token: config.image_auth_token.clone(),
        })
    }

    fn url_for(&self, reference: &str) -> Result<String, DocumentError> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(reference.to_string());
        }
        let base = self.base_url.as_deref().ok_or_else(|| {
            DocumentError::ImageFetch(format!(
                "`{reference}` is relative and no image base URL is configured"
            ))
        })?;
        Ok(format!("{}/{}", base.trim_end_matches('/'), reference.trim_start_matches('/')))
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, reference: &str) -> Result<FetchedImage, DocumentError> {
        let url = self.url_for(reference)?;
        let mut request = self.client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DocumentError::ImageFetch(e.to_string()))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(reference).to_string());
        let bytes =
            response.bytes().await.map_err(|e| DocumentError::ImageFetch(e.to_string()))?;

        Ok(FetchedImage { bytes: bytes.to_vec(), content_type })
    }
}

pub fn guess_content_type(reference: &str) -> &'static str {
    let lowered = reference.to_ascii_lowercase();
    let path = lowered.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Fetches every image slot in document order and embeds it as a data URI.
///
/// A failed fetch leaves an `Unavailable` placeholder; it never fails the document.
/// Repeated references are fetched once.
pub async fn embed_document_images(
    document: &mut QuoteDocument,
    fetcher: &dyn ImageFetcher,
    correlation_id: &str,
) {
    let mut fetched: HashMap<String, Option<String>> = HashMap::new();

    for reference in document.image_references() {
        if fetched.contains_key(&reference) {
            continue;
        }
        let data_uri = match fetcher.fetch(&reference).await {
            Ok(image) => {
                debug!(
                    event_name = "document.image.fetched",
                    correlation_id,
                    reference = %reference,
                    size = image.bytes.len(),
                    "document image fetched"
                );
                Some(image.data_uri())
            }
            Err(error) => {
                warn!(
                    event_name = "document.image.fetch_failed",
                    correlation_id,
                    reference = %reference,
                    error = %error,
                    "document image unavailable, rendering placeholder"
                );
                None
            }
        };
        fetched.insert(reference, data_uri);
    }

    document.embed_images(|reference| fetched.get(reference).cloned().flatten());
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use propquote_core::documents::ImageContent;

    use super::{guess_content_type, DocumentError, FetchedImage, ImageFetcher};

    /// Serves fixed bytes for known references and records every call.
    #[derive(Default)]
    pub(crate) struct StubImageFetcher {
        pub images: HashMap<String, Vec<u8>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubImageFetcher {
        pub(crate) fn with_image(mut self, reference: &str, bytes: &[u8]) -> Self {
            self.images.insert(reference.to_string(), bytes.to_vec());
            self
        }
    }

    #[async_trait]
    impl ImageFetcher for StubImageFetcher {
        async fn fetch(&self, reference: &str) -> Result<FetchedImage, DocumentError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(reference.to_string());
            }
            self.images
                .get(reference)
                .map(|bytes| FetchedImage {
                    bytes: bytes.clone(),
                    content_type: guess_content_type(reference).to_string(),
                })
                .ok_or_else(|| DocumentError::ImageFetch(format!("{reference} not found")))
        }
    }

    #[test]
    fn data_uri_is_base64_with_content_type() {
        let image = FetchedImage { bytes: b"png!".to_vec(), content_type: "image/png".into() };
        assert_eq!(image.data_uri(), "data:image/png;base64,cG5nIQ==");
    }

    #[test]
    fn content_type_is_guessed_from_extension() {
        assert_eq!(guess_content_type("plans/level-1.PNG"), "image/png");
        assert_eq!(guess_content_type("photos/a.jpeg?sig=abc"), "image/jpeg");
        assert_eq!(guess_content_type("blob"), "application/octet-stream");
    }

    #[tokio::test]
    async fn failed_fetches_become_placeholders_and_duplicates_fetch_once() {
        use chrono::{TimeZone, Utc};
        use propquote_core::documents::QuoteDocument;
        use propquote_core::domain::quote::{
            CustomerInfo, FloorPlan, PhotoPair, Quote, QuoteId,
        };

        let quote = Quote {
            id: QuoteId("q-1".to_string()),
            quote_number: "PQ-1001".to_string(),
            customer: CustomerInfo { name: "Lena Ortiz".to_string(), ..CustomerInfo::default() },
            property: None,
            billing_period: Default::default(),
            line_items: Vec::new(),
            device_placements: Vec::new(),
            floor_plans: vec![FloorPlan {
                title: "Level 1".to_string(),
                image_ref: "plans/l1.png".to_string(),
            }],
            scans: Vec::new(),
            photo_pairs: vec![PhotoPair {
                caption: "Entry".to_string(),
                before_ref: "plans/l1.png".to_string(),
                after_ref: "photos/missing.jpg".to_string(),
            }],
            notes: None,
            created_at: Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).single().expect("valid time"),
            valid_until: None,
        };
        let mut document = QuoteDocument::from_quote(&quote, &[]).expect("document");
        let fetcher = StubImageFetcher::default().with_image("plans/l1.png", b"png!");

        super::embed_document_images(&mut document, &fetcher, "req-7").await;

        let plans = document.floor_plans.as_ref().expect("floor plans");
        assert!(plans[0].image.is_available());
        let pairs = document.photo_pairs.as_ref().expect("photo pairs");
        assert!(pairs[0].before.is_available());
        assert_eq!(pairs[0].after.content, ImageContent::Unavailable);

        let calls = fetcher.calls.lock().expect("calls").clone();
        assert_eq!(calls, vec!["plans/l1.png".to_string(), "photos/missing.jpg".to_string()]);
    }
}
