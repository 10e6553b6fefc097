// src/api/client.rs
//! Pure HTTP client wrapper for the Notion API.
//!
//! Handles authentication headers, the per-request timeout, and turning
//! non-2xx responses into classified [`ApiError`]s. No retries and no
//! knowledge of pages or blocks live here.

use super::responses::ErrorBody;
use crate::constants::{
    DEFAULT_REQUEST_TIMEOUT, ERROR_BODY_PREVIEW_LENGTH, NOTION_API_BASE_URL, NOTION_API_VERSION,
};
use crate::error::{ApiError, AppError, NotionErrorCode};
use crate::types::ApiKey;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// A thin wrapper around reqwest Client for Notion API requests.
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
    base_url: String,
}

impl NotionHttpClient {
    /// Creates a client for the public Notion API.
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        Self::with_base_url(api_key, NOTION_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client against another base URL (a proxy, or a mock server).
    pub fn with_base_url(
        api_key: &ApiKey,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        let mut auth_value = header::HeaderValue::from_str(&auth_header).map_err(|e| {
            AppError::InvalidConfiguration(format!("Invalid API token format: {}", e))
        })?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_API_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    pub async fn get<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<R, ApiError> {
        let builder = self.request(Method::GET, endpoint).query(query);
        send(builder).await
    }

    pub async fn post<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<R, ApiError> {
        send(self.request(Method::POST, endpoint).json(body)).await
    }

    pub async fn patch<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<R, ApiError> {
        send(self.request(Method::PATCH, endpoint).json(body)).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        send(self.request(Method::DELETE, endpoint)).await
    }
}

async fn send<R: DeserializeOwned>(builder: RequestBuilder) -> Result<R, ApiError> {
    let response = builder
        .send()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;
    let text = into_body(response).await?;
    serde_json::from_str(&text).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

/// Body of a successful response, or the classified failure.
async fn into_body(response: Response) -> Result<String, ApiError> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    if status.is_success() {
        return response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e));
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status.as_u16(), retry_after, &body))
}

/// Maps a non-2xx status and its body into an [`ApiError`].
pub(crate) fn classify_failure(status: u16, retry_after: Option<Duration>, body: &str) -> ApiError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let code = parsed
        .as_ref()
        .map(|b| NotionErrorCode::from_api_response(&b.code))
        .unwrap_or_else(|| NotionErrorCode::from_http_status(status));
    let message = match parsed {
        Some(b) if !b.message.is_empty() => b.message,
        _ => body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect(),
    };

    if status == 429 || code == NotionErrorCode::RateLimited {
        return ApiError::RateLimited { retry_after };
    }
    if matches!(status, 500 | 502 | 503 | 504) {
        return ApiError::Transient {
            status: Some(status),
            message,
        };
    }
    ApiError::Notion {
        code,
        status,
        message,
    }
}
