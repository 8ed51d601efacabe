//! JWT Token Decoder
//! Mission: Turn a raw token string into typed claims and a validity verdict
//!
//! Tokens are issued by the upstream authentication service. By default this
//! layer only parses the payload and checks expiry; the signature is checked
//! only when a shared secret is configured.

use crate::auth::models::{DecodeError, TokenClaims, TokenStatus};
use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use tracing::debug;

/// Current wall-clock time in unix seconds
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Decodes tokens with or without signature verification
#[derive(Clone)]
pub struct TokenDecoder {
    key: DecodingKey,
    validation: Validation,
    verifies_signature: bool,
}

impl TokenDecoder {
    /// Decoder that parses structure and claims only.
    ///
    /// This is a trust boundary, not a security control: anyone can mint a
    /// token this decoder accepts.
    pub fn unverified() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        Self::finish(DecodingKey::from_secret(&[]), validation, false)
    }

    /// Decoder that also verifies an HMAC signature with `secret`
    pub fn with_secret(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        Self::finish(
            DecodingKey::from_secret(secret.as_bytes()),
            validation,
            true,
        )
    }

    fn finish(key: DecodingKey, mut validation: Validation, verifies_signature: bool) -> Self {
        // Expiry is compared against an injected clock, without leeway.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        Self {
            key,
            validation,
            verifies_signature,
        }
    }

    pub fn verifies_signature(&self) -> bool {
        self.verifies_signature
    }

    /// Parse a token into claims without looking at the clock
    pub fn decode(&self, token: &str) -> Result<TokenClaims, DecodeError> {
        decode::<TokenClaims>(token.trim(), &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => DecodeError::BadSignature,
                _ => DecodeError::Malformed(e.to_string()),
            })
    }

    /// Classify an optional token against `now` (unix seconds).
    ///
    /// Never fails: decode errors collapse into `TokenStatus::Malformed`.
    pub fn status(&self, token: Option<&str>, now: i64) -> TokenStatus {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return TokenStatus::Missing;
        };

        match self.decode(token) {
            Ok(claims) if claims.is_expired_at(now) => {
                debug!(exp = claims.expires_at, now, "Token expired");
                TokenStatus::Expired
            }
            Ok(claims) => TokenStatus::Valid(claims),
            Err(e) => {
                debug!("Token rejected: {}", e);
                TokenStatus::Malformed
            }
        }
    }

    /// True iff the token decodes and `exp > now`
    pub fn is_token_valid(&self, token: Option<&str>, now: i64) -> bool {
        self.status(token, now).is_valid()
    }
}

impl Default for TokenDecoder {
    fn default() -> Self {
        Self::unverified()
    }
}
