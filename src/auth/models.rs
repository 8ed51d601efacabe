//! Authentication Models
//! Mission: Define the typed shape of decoded tokens and their validity

use serde::{Deserialize, Deserializer, Serialize};

/// Marketplace roles carried in the `role` claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "PATIENT")]
    Patient, // Books sessions
    #[serde(rename = "FREELANCER")]
    Freelancer, // Offers services and manages slots
    #[serde(rename = "ADMIN")]
    Admin, // Full marketplace management
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "PATIENT",
            Role::Freelancer => "FREELANCER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PATIENT" => Some(Role::Patient),
            "FREELANCER" => Some(Role::Freelancer),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded token payload.
///
/// Only `exp` is required. An unrecognised `role` decodes as `None` so that
/// role knowledge never influences whether a token counts as valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_role",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<Role>,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(rename = "exp")]
    pub expires_at: i64, // unix seconds
}

impl TokenClaims {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(Role::from_str))
}

/// Why a token failed to decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Malformed(String),
    BadSignature,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed(reason) => write!(f, "Malformed token: {}", reason),
            DecodeError::BadSignature => write!(f, "Token signature rejected"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Outcome of a validity check against the current time.
///
/// Every non-`Valid` variant leads to the same redirect; the distinction
/// only exists for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid(TokenClaims),
    Missing,
    Malformed,
    Expired,
}

impl TokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenStatus::Valid(_))
    }

    pub fn claims(&self) -> Option<&TokenClaims> {
        match self {
            TokenStatus::Valid(claims) => Some(claims),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Valid(_) => "valid",
            TokenStatus::Missing => "missing",
            TokenStatus::Malformed => "malformed",
            TokenStatus::Expired => "expired",
        }
    }
}
