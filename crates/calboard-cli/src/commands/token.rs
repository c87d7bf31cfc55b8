use std::path::Path;
use std::sync::Arc;

use calboard_core::TokenCache;
use chrono::Utc;

/// Check the service-account credentials end to end. The token itself is
/// never printed.
pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let (_, config) = super::load_config(explicit)?;
    let creds = config.resolve_credentials()?;
    let transport = Arc::new(super::build_transport(&config)?);
    let cache = TokenCache::new(creds.signer()?, transport);

    cache.get_token(Utc::now()).await?;
    let Some(token) = cache.current().await else {
        return Err("token exchange succeeded but nothing was cached".into());
    };

    println!("issuer:      {}", creds.issuer);
    println!("scope:       {}", creds.scope);
    println!("token_uri:   {}", creds.token_uri);
    println!("expires_at:  {}", token.expires_at().to_rfc3339());
    println!("refresh_at:  {}", token.safe_until().to_rfc3339());
    Ok(())
}
