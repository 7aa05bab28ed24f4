use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Session token lifetime: roughly 91 days.
pub const TOKEN_TTL_HOURS: i64 = 2190;

/// Identity claims embedded in a session token.
///
/// Claim names match the wire format issued at login (`userId`, `email`,
/// `name`, `exp`), so tokens are interchangeable across revisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("not authorized: {0}")]
    Unauthorized(&'static str),
    #[error("token processing failed: {0}")]
    Internal(String),
}

/// Creates and validates signed session tokens (HS256).
///
/// Holds the derived signing keys; constructed once from the configured
/// secret and shared through application state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for the given identity, expiring TOKEN_TTL_HOURS from now.
    pub fn issue(&self, user_id: &str, email: &str, name: &str) -> Result<String, TokenError> {
        let exp = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            exp,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Internal(e.to_string()))
    }

    /// Parse and verify a token, returning its claims.
    ///
    /// Rejects with `Unauthorized`: malformed tokens, bad signatures, an empty
    /// claims object, and a missing/non-string/empty `userId` claim. Any other
    /// decode failure is `Internal`.
    ///
    /// KNOWN DEFECT (kept intentionally): `exp` is NOT checked against the
    /// current time, so expired tokens continue to validate. Enforcing expiry
    /// is a product decision pending; do not "fix" without revisiting clients
    /// that rely on long-lived tokens.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => TokenError::Unauthorized("invalid token"),
                _ => TokenError::Internal(e.to_string()),
            },
        )?;

        let claims = data.claims;
        if claims.is_empty() {
            return Err(TokenError::Unauthorized("empty claims"));
        }

        let user_id = match claims.get("userId") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::String(_)) => return Err(TokenError::Unauthorized("empty subject")),
            _ => return Err(TokenError::Unauthorized("missing subject claim")),
        };

        Ok(Claims {
            user_id,
            email: string_claim(&claims, "email"),
            name: string_claim(&claims, "name"),
            exp: claims.get("exp").and_then(Value::as_i64).unwrap_or_default(),
        })
    }
}

fn string_claim(claims: &Map<String, Value>, key: &str) -> String {
    claims
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
