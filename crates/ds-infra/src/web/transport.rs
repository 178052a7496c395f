use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;

use ds_core::ports::{HttpResponse, HttpTransportPort};
use ds_core::PipelineConfig;

const MAX_REDIRECTS: usize = 4;
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/*;q=0.8,*/*;q=0.5";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// `reqwest` backed transport with the enrichment header set.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(user_agent).context("invalid user agent header")?,
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .context("build http client")?;

        Ok(Self { client })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(&config.user_agent, Duration::from_secs(config.http_timeout_secs))
    }

    async fn send(&self, request: reqwest::RequestBuilder, with_body: bool) -> Result<HttpResponse> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = if with_body {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };
        Ok(HttpResponse {
            status,
            url,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl HttpTransportPort for ReqwestTransport {
    async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.send(self.client.head(url), false)
            .await
            .with_context(|| format!("HEAD {url}"))
    }

    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.send(self.client.get(url), true)
            .await
            .with_context(|| format!("GET {url}"))
    }
}
