use super::model::AuthenticatedUser;
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::jwks::{JwksClient, JwksError};

/// Where verification keys come from
enum KeySource {
    /// HS256 tokens signed with a secret shared with the token issuer
    SharedSecret(DecodingKey),
    /// RS256 tokens whose keys are published on the issuer's JWKS endpoint
    Jwks(Arc<JwksClient>),
}

pub struct JwtValidator {
    keys: KeySource,
    issuer: Option<String>,
    audience: Option<String>,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl JwtValidator {
    pub fn with_secret(
        secret: &str,
        issuer: Option<String>,
        audience: Option<String>,
        leeway: Duration,
    ) -> Self {
        Self {
            keys: KeySource::SharedSecret(DecodingKey::from_secret(secret.as_bytes())),
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    pub fn with_jwks(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        leeway: Duration,
    ) -> Self {
        Self {
            keys: KeySource::Jwks(jwks_client),
            issuer: Some(issuer),
            audience: Some(audience),
            leeway: leeway.as_secs(),
        }
    }

    /// Pick the key source from configuration; a shared secret takes precedence
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwksError> {
        if let Some(secret) = &config.jwt_secret {
            return Ok(Self::with_secret(
                secret,
                config.issuer.clone(),
                config.audience.clone(),
                config.jwt_leeway,
            ));
        }

        match (&config.issuer, &config.audience) {
            (Some(issuer), Some(audience)) => {
                let jwks_client = Arc::new(JwksClient::new(issuer, config.jwks_cache_ttl)?);
                Ok(Self::with_jwks(
                    jwks_client,
                    issuer.clone(),
                    audience.clone(),
                    config.jwt_leeway,
                ))
            }
            _ => Err(JwksError::FetchError(
                "No token issuer configured".to_string(),
            )),
        }
    }

    pub fn uses_shared_secret(&self) -> bool {
        matches!(self.keys, KeySource::SharedSecret(_))
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        let (decoding_key, algorithm) = match &self.keys {
            KeySource::SharedSecret(key) => (key.clone(), Algorithm::HS256),
            KeySource::Jwks(client) => {
                let kid = header
                    .kid
                    .as_deref()
                    .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;
                let key = client
                    .get_key(kid)
                    .await
                    .map_err(|e| AppError::Auth(e.to_string()))?;
                (key, Algorithm::RS256)
            }
        };

        if header.alg != algorithm {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only {:?} is allowed",
                header.alg, algorithm
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?
            .claims;

        let mut roles = claims.roles;
        if let Some(role) = claims.role {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }

        Ok(AuthenticatedUser {
            sub: claims.sub,
            roles,
        })
    }
}
