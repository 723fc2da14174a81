//! HTTP transport seam
//!
//! Everything above this module speaks in [`ApiRequest`] / [`ApiResponse`].
//! [`HttpTransport`] is the `reqwest` implementation used by the binary;
//! tests substitute a scripted implementation.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Failure to obtain any response at all
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// GET request without query parameters
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// POST of a GraphQL document with its variables
    pub fn graphql(url: impl Into<String>, query: &str, variables: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(serde_json::json!({ "query": query, "variables": variables })),
        }
    }

    /// Append a query-string parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Value of a query-string parameter, if set
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// The subset of response headers the harvester cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub rate_limit_remaining: Option<u32>,
    pub rate_limit_limit: Option<u32>,
    /// Unix timestamp (seconds)
    pub rate_limit_reset: Option<i64>,
    /// Quota bucket the request was charged to: `core`, `search`, `graphql`
    pub rate_limit_resource: Option<String>,
    pub link: Option<String>,
}

impl ResponseHeaders {
    fn from_header_map(map: &HeaderMap) -> Self {
        let text = |name: &str| map.get(name).and_then(|v| v.to_str().ok());
        Self {
            rate_limit_remaining: text("x-ratelimit-remaining").and_then(|v| v.parse().ok()),
            rate_limit_limit: text("x-ratelimit-limit").and_then(|v| v.parse().ok()),
            rate_limit_reset: text("x-ratelimit-reset").and_then(|v| v.parse().ok()),
            rate_limit_resource: text("x-ratelimit-resource").map(str::to_string),
            link: text("link").map(str::to_string),
        }
    }
}

/// A response with its body fully read
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: ResponseHeaders,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Body size in bytes
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Sends requests and reads whole responses.
pub trait Transport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport with bearer authentication
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    token: String,
}

impl HttpTransport {
    pub fn new(
        token: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let mut builder = builder
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = ResponseHeaders::from_header_map(response.headers());
        let body = response.text().await.map_err(classify)?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
