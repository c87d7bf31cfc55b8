//! Service-account authentication: assertion signing and token caching.

pub mod signer;
pub mod token_cache;


pub use signer::{parse_private_key, sign_assertion, Claims, CredentialSigner, ServiceAccountKey};
pub use token_cache::{AccessToken, TokenCache, REFRESH_MARGIN_SECS};
