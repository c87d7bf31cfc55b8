//! Access-token cache for the JWT-bearer grant.
//!
//! The cache is either *Valid* (a token exists and `now < safe_until`) or
//! *Invalid*. Only a successful exchange moves it to *Valid*; the record is
//! always replaced wholesale.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::signer::CredentialSigner;
use crate::codec::percent_encode;
use crate::error::AuthError;
use crate::transport::HttpTransport;

/// A token is treated as expired this many seconds before the server says so.
pub const REFRESH_MARGIN_SECS: i64 = 30;

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// A bearer token and its freshness boundary.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
    safe_until: DateTime<Utc>,
}

impl AccessToken {
    /// `None` when `issued_at + expires_in_secs` is not a representable instant.
    pub fn new(token: String, issued_at: DateTime<Utc>, expires_in_secs: i64) -> Option<Self> {
        let expires_at = issued_at.checked_add_signed(Duration::try_seconds(expires_in_secs)?)?;
        let safe_until = expires_at.checked_sub_signed(Duration::seconds(REFRESH_MARGIN_SECS))?;
        Some(Self {
            token,
            expires_at,
            safe_until,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.safe_until
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn safe_until(&self) -> DateTime<Utc> {
        self.safe_until
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("safe_until", &self.safe_until)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Owns the single cached token and performs exchanges when it goes stale.
///
/// The lock is held across the exchange, so concurrent callers queue up
/// behind the one in flight and then reuse its result.
pub struct TokenCache<T> {
    signer: CredentialSigner,
    transport: Arc<T>,
    token_uri: String,
    state: Mutex<Option<AccessToken>>,
    exchanges: AtomicU64,
}

impl<T: HttpTransport> TokenCache<T> {
    /// Exchanges go to the signer's audience, which is the token endpoint.
    pub fn new(signer: CredentialSigner, transport: Arc<T>) -> Self {
        let token_uri = signer.audience().to_string();
        Self {
            signer,
            transport,
            token_uri,
            state: Mutex::new(None),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return a token that is valid at `now`, exchanging a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns the exchange failure; the cache is left empty in that case.
    pub async fn get_token(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let mut cached = self.state.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(now)) {
            debug!(safe_until = %token.safe_until(), "using cached access token");
            return Ok(token.as_str().to_string());
        }

        *cached = None;
        let fresh = self.exchange(now).await?;
        let value = fresh.as_str().to_string();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Snapshot of the cached record, if any.
    pub async fn current(&self) -> Option<AccessToken> {
        self.state.lock().await.clone()
    }

    /// Drop the cached token so the next call exchanges a new one.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    /// Number of exchanges attempted since construction.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<AccessToken, AuthError> {
        self.exchanges.fetch_add(1, Ordering::Relaxed);

        let assertion = self.signer.sign(now)?;
        let body = format!(
            "grant_type={}&assertion={}",
            percent_encode(JWT_BEARER_GRANT),
            percent_encode(&assertion)
        );

        let resp = self.transport.post_form(&self.token_uri, body).await.map_err(|e| {
            warn!(error = %e, "token exchange transport failure");
            AuthError::from(e)
        })?;

        if !resp.is_ok() {
            warn!(status = resp.status, "token endpoint rejected assertion");
            return Err(AuthError::HttpStatus(resp.status));
        }

        let parsed: TokenResponse = serde_json::from_slice(&resp.body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if parsed.access_token.is_empty() {
            return Err(AuthError::MalformedResponse("empty access_token".into()));
        }
        let expires_in = parsed.expires_in;
        let token = AccessToken::new(parsed.access_token, now, expires_in).ok_or_else(|| {
            AuthError::MalformedResponse(format!("expires_in out of range: {expires_in}"))
        })?;
        if expires_in <= REFRESH_MARGIN_SECS {
            warn!(
                expires_in,
                "token lifetime is inside the refresh margin; it will be refreshed on next use"
            );
        }

        info!(
            issuer = self.signer.issuer(),
            expires_in,
            "access token refreshed"
        );
        Ok(token)
    }
}
