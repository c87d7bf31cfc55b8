//! RS256 JWT assertions for the service-account (JWT-bearer) grant.
//!
//! An assertion is `base64url(header).base64url(claims).base64url(signature)`
//! where the signature is RSASSA-PKCS1-v1_5 over the SHA-256 digest of the
//! first two segments. Every token exchange mints a fresh one.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::base64url;
use crate::config::DEFAULT_TOKEN_URI;
use crate::error::CredentialError;

/// Fixed lifetime of a minted assertion. It only has to cover one exchange.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

const HEADER: JwtHeader = JwtHeader {
    alg: "RS256",
    typ: "JWT",
};

/// Claim set carried in the assertion payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Build claims issued at `now` and expiring one hour later.
    pub fn new(issuer: &str, scope: &str, audience: &str, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: issuer.to_string(),
            scope: scope.to_string(),
            aud: audience.to_string(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Parse an RSA private key from PEM, PKCS#8 first, then PKCS#1.
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, CredentialError> {
    // Keys pasted through env vars or TOML often keep their "\n" escapes.
    let pem = if pem.contains("\\n") {
        pem.replace("\\n", "\n")
    } else {
        pem.to_string()
    };
    let pem = pem.trim();

    RsaPrivateKey::from_pkcs8_pem(pem).or_else(|pkcs8_err| {
        RsaPrivateKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
            CredentialError::KeyParse(format!("not PKCS#8 ({pkcs8_err}) nor PKCS#1 ({pkcs1_err})"))
        })
    })
}

/// Sign an already-built claim set with `key`.
pub fn sign_claims(key: &RsaPrivateKey, claims: &Claims) -> Result<String, CredentialError> {
    let header = serde_json::to_string(&HEADER)?;
    let payload = serde_json::to_string(claims)?;

    let signing_input = format!(
        "{}.{}",
        base64url(header.as_bytes()),
        base64url(payload.as_bytes())
    );
    let digest = Sha256::digest(signing_input.as_bytes());

    let signature = key
        .sign_with_rng(&mut OsRng, Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(CredentialError::Signing)?;

    Ok(format!("{signing_input}.{}", base64url(&signature)))
}

/// One-shot form: parse `private_key_pem` and sign a fresh claim set.
pub fn sign_assertion(
    private_key_pem: &str,
    issuer: &str,
    scope: &str,
    audience: &str,
    now: DateTime<Utc>,
) -> Result<String, CredentialError> {
    let key = parse_private_key(private_key_pem)?;
    sign_claims(&key, &Claims::new(issuer, scope, audience, now))
}

/// A parsed key plus the identity strings it signs for.
pub struct CredentialSigner {
    key: RsaPrivateKey,
    issuer: String,
    scope: String,
    audience: String,
}

impl CredentialSigner {
    pub fn from_pem(
        private_key_pem: &str,
        issuer: &str,
        scope: &str,
        audience: &str,
    ) -> Result<Self, CredentialError> {
        Ok(Self {
            key: parse_private_key(private_key_pem)?,
            issuer: issuer.to_string(),
            scope: scope.to_string(),
            audience: audience.to_string(),
        })
    }

    /// Mint a new assertion issued at `now`.
    pub fn sign(&self, now: DateTime<Utc>) -> Result<String, CredentialError> {
        sign_claims(&self.key, &Claims::new(&self.issuer, &self.scope, &self.audience, now))
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The audience doubles as the token endpoint URL.
    pub fn audience(&self) -> &str {
        &self.audience
    }
}

impl fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("issuer", &self.issuer)
            .field("scope", &self.scope)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The subset of a Google service-account JSON key file we need.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and parse a key file downloaded from the cloud console.
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let content = std::fs::read_to_string(path).map_err(|e| CredentialError::KeyFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| CredentialError::KeyFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
