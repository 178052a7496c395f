use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final url after redirects.
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `text/html`, ignoring case and parameters.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("text/html"))
            .unwrap_or(false)
    }
}

/// Opaque HTTP transport used by url enrichment.
/// The adapter injects the configured user agent and accept headers.
#[async_trait]
pub trait HttpTransportPort: Send + Sync {
    async fn head(&self, url: &str) -> Result<HttpResponse>;
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}
