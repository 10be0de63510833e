//! Signing and verification of extension tokens.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::{AuthError, Claims};

/// Default lifetime of outbound tokens: two days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 24 * 2;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: i64 = 60 * 60 * 24 * 365;

/// Shared-secret credentials for the extension.
///
/// The extension secret is distributed base64 encoded; the decoded bytes are
/// the HMAC key for both directions.
#[derive(Clone)]
pub struct ExtensionAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: i64,
}

impl std::fmt::Debug for ExtensionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionAuth")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl ExtensionAuth {
    /// Build from the base64 encoded extension secret.
    pub fn from_base64_secret(secret: &str, token_ttl_secs: i64) -> Result<Self, AuthError> {
        let bytes = STANDARD
            .decode(secret.trim())
            .map_err(|e| AuthError::InvalidSecret(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AuthError::InvalidSecret("secret is empty".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&bytes),
            decoding_key: DecodingKey::from_secret(&bytes),
            token_ttl_secs,
        })
    }

    /// Validate signature and expiry of an inbound token.
    ///
    /// Role and channel checks are left to the caller.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("extension token rejected: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Sign arbitrary claims with the shared secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Mint an `external` token allowed to send to `channel_id`.
    pub fn issue_outbound(&self, channel_id: &str) -> Result<String, AuthError> {
        self.issue_outbound_at(channel_id, Utc::now().timestamp())
    }

    /// Same as [`issue_outbound`](Self::issue_outbound) with an explicit clock.
    pub fn issue_outbound_at(&self, channel_id: &str, now: i64) -> Result<String, AuthError> {
        let exp = now
            .checked_add(self.token_ttl_secs)
            .ok_or_else(|| AuthError::Internal("token expiry overflows".to_string()))?;
        self.sign(&Claims::external(channel_id, exp))
    }
}
