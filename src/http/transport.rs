use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;

use super::error::TransportError;
use super::method::HttpMethod;
use super::request::{ApiRequest, ApiResponse};

/// A single network round trip. Retries live above this seam.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        url: &Url,
        request: &ApiRequest,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("api-tester/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        method: HttpMethod,
        url: &Url,
        request: &ApiRequest,
        timeout: Duration,
    ) -> Result<ApiResponse, TransportError> {
        let mut req = self
            .client
            .request(method.into(), url.clone())
            .timeout(timeout);

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest(format!("header name `{name}`: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("value of header `{name}`: {e}"))
            })?;
            req = req.header(name, value);
        }

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status().as_u16();
        let body = res.text().await?;

        Ok(ApiResponse::new(status, body))
    }
}
