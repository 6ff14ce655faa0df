use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

struct JwksCache {
    keys: HashMap<String, DecodingKey>,
    last_fetched: Instant,
}

/// Fetches and caches the RS256 signing keys published by the token issuer
pub struct JwksClient {
    jwks_url: String,
    client: reqwest::Client,
    cache: Arc<RwLock<Option<JwksCache>>>,
    cache_ttl: Duration,
}

impl JwksClient {
    const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(issuer_url: &str, cache_ttl: Duration) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(Self::FETCH_TIMEOUT)
            .build()
            .map_err(|e| JwksError::FetchError(e.to_string()))?;

        Ok(Self {
            jwks_url: format!("{}/jwks", issuer_url.trim_end_matches('/')),
            client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        })
    }

    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.last_fetched.elapsed() < self.cache_ttl {
                    if let Some(key) = cached.keys.get(kid) {
                        return Ok(key.clone());
                    }
                }
            }
        }

        // Cache miss or expired; an unknown kid also forces a refetch to pick up rotated keys
        let keys = self.fetch_jwks().await?;
        let key = keys
            .get(kid)
            .cloned()
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()));

        let mut cache = self.cache.write().await;
        *cache = Some(JwksCache {
            keys,
            last_fetched: Instant::now(),
        });

        key
    }

    async fn fetch_jwks(&self) -> Result<HashMap<String, DecodingKey>, JwksError> {
        tracing::debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::FetchError(format!(
                "Failed to fetch JWKS: HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| JwksError::FetchError(e.to_string()))?;

        let keys = parse_jwks(&body)?;
        tracing::info!("Loaded {} signing key(s) from JWKS", keys.len());
        Ok(keys)
    }
}

/// Build the kid -> key map from a JWKS document, keeping only RSA keys with a kid
fn parse_jwks(body: &str) -> Result<HashMap<String, DecodingKey>, JwksError> {
    let jwks: JwksResponse =
        serde_json::from_str(body).map_err(|e| JwksError::ParseError(e.to_string()))?;

    let mut keys = HashMap::new();
    for jwk in jwks.keys {
        let Some(kid) = jwk.kid else { continue };
        if jwk.kty != "RSA" {
            continue;
        }
        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| JwksError::KeyConversionError(e.to_string()))?;
        keys.insert(kid, decoding_key);
    }

    Ok(keys)
}

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("Failed to fetch JWKS: {0}")]
    FetchError(String),

    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to convert key: {0}")]
    KeyConversionError(String),
}
