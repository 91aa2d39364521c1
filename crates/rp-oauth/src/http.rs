//! HTTP capability for the token exchange
//!
//! The only HTTP the flow performs itself is the single form-encoded token
//! POST; everything else goes through the browser. The trait keeps that
//! POST mockable.

use async_trait::async_trait;
use rp_types::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `application/x-www-form-urlencoded` parameters and return the
    /// raw response. Non-2xx statuses are returned, not raised; the caller
    /// decides what they mean.
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> AppResult<HttpResponse>;
}

/// reqwest-backed implementation.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> AppResult<HttpResponse> {
        let response = self
            .client
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Http(format!("failed to send token request: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Http(format!("failed to read token response: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}
