// SPDX-License-Identifier: MIT

//! HTTP capability
//!
//! Operators reach upstream reasoners exclusively through this trait, so
//! tests can substitute canned responses and the router can memoise calls.

use crate::ops::error::EngineError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json(&self) -> Result<Value, EngineError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[async_trait]
pub trait Http: Send + Sync {
    async fn get(&self, url: &str, headers: &[(String, String)])
        -> Result<HttpResponse, EngineError>;

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, EngineError>;
}

/// reqwest-backed client: follows redirects, enforces a request timeout
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn map_error(e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::upstream(-1, "timeout")
        } else {
            e.into()
        }
    }

    async fn finish(response: reqwest::Response) -> Result<HttpResponse, EngineError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(Self::map_error)?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Http for ReqwestHttp {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, EngineError> {
        let mut request = self.client.get(url).header("accept", "application/json");
        for (k, v) in headers {
            request = request.header(k, v);
        }
        let response = request.send().await.map_err(Self::map_error)?;
        Self::finish(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, EngineError> {
        let mut request = self
            .client
            .post(url)
            .header("accept", "application/json")
            .json(body);
        for (k, v) in headers {
            request = request.header(k, v);
        }
        let response = request.send().await.map_err(Self::map_error)?;
        Self::finish(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_json() {
        let response = HttpResponse {
            status: 200,
            body: r#"{"a": 1}"#.to_string(),
        };
        assert_eq!(response.json().unwrap()["a"], 1);

        let bad = HttpResponse {
            status: 200,
            body: "not json".to_string(),
        };
        assert!(bad.json().is_err());
    }
}
