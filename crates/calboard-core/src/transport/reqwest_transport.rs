//! reqwest-backed transport with a hard timeout and a capped body buffer.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::debug;

use super::{HttpResponse, HttpTransport};
use crate::error::TransportError;

/// HTTPS client used on the device.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
    max_body: usize,
}

impl ReqwestTransport {
    /// Build a client with the given per-request timeout and body cap.
    pub fn new(timeout: Duration, max_body: usize) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self {
            client,
            timeout,
            max_body,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }

    /// Accumulate the body until it ends or the cap is reached. Whatever
    /// does not fit is dropped without error.
    async fn read_capped(&self, mut resp: Response) -> Result<HttpResponse, TransportError> {
        let status = resp.status().as_u16();
        let mut body: Vec<u8> = Vec::new();

        while let Some(chunk) = resp.chunk().await.map_err(|e| self.map_error(e))? {
            let room = self.max_body.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_body {
                debug!(cap = self.max_body, "response body truncated at capacity");
                break;
            }
        }

        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, TransportError> {
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.read_capped(resp).await
    }

    async fn get_authorized(
        &self,
        url: &str,
        bearer: &str,
    ) -> Result<HttpResponse, TransportError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        self.read_capped(resp).await
    }
}
