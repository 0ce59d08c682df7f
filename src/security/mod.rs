use crate::config::SecurityConfig;
use crate::error::Error;
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

pub mod auth;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (operator ID)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Bearer token issued to a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Issues and checks the bearer tokens that identify callers
pub struct SecurityService {
    config: SecurityConfig,
}

impl SecurityService {
    /// Create a new security service
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Generate a JWT token
    pub fn generate_token(&self, subject: &str, name: &str, role: &str) -> Result<AuthToken> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.jwt_expiration_minutes as i64);

        let claims = Claims {
            sub: subject.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("Failed to generate JWT token: {}", e)))?;

        Ok(AuthToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_minutes * 60,
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>, Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| Error::Unauthorized(format!("Invalid token: {}", e)))
    }
}
