//! Bearer token issue and validation (HS256).

use crate::error::AppError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        TokenManager {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Signed token for `user_id` and its expiry timestamp.
    pub fn issue(&self, user_id: i64) -> Result<(String, i64), AppError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let exp = Utc::now().timestamp().saturating_add(ttl);
        self.encode(&Claims { user_id, exp }).map(|t| (t, exp))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Unexpected(format!("token encoding: {}", e)))
    }

    /// Signature and expiry checked; any failure is `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!(error = %e, "rejected bearer token");
                AppError::Unauthorized
            })
    }
}
