//! HTTP seam between the sync pipeline and the network.
//!
//! The token cache and event fetcher only ever issue two request shapes, a
//! form POST and an authenticated GET, so the trait is exactly that. The
//! production implementation is [`ReqwestTransport`]; tests substitute an
//! in-memory transport.

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

pub mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

/// Upper bound on any single HTTP operation.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Response bodies beyond this many bytes are dropped.
pub const MAX_RESPONSE_BYTES: usize = 32 * 1024;

/// Status and (possibly truncated) body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub trait HttpTransport: Send + Sync {
    /// POST `body` as `application/x-www-form-urlencoded`.
    fn post_form(
        &self,
        url: &str,
        body: String,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// GET `url` with `Authorization: Bearer <bearer>`.
    fn get_authorized(
        &self,
        url: &str,
        bearer: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}
