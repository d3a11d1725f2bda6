use chrono::Duration;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::JwtConfig;
use crate::services::Clock;

/// Purpose discriminator carried in the `sub` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSubject {
    Auth,
    Refresh,
}

/// Claims shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Token purpose
    pub sub: TokenSubject,
    /// User ID, as a decimal string
    pub jti: String,
    pub is_admin: bool,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Not before (Unix timestamp)
    pub nbf: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.jti.parse().map_err(|_| TokenError::InvalidUserId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Unexpected signing algorithm")]
    UnexpectedAlgorithm,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Invalid token type")]
    WrongSubject,

    #[error("Token does not grant admin access")]
    NotAdmin,

    #[error("Invalid user ID in token")]
    InvalidUserId,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Access and refresh tokens issued together.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Stateless HS256 token issuance and validation.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtService {
    /// Build the service from the shared signing secret.
    ///
    /// An empty secret is a configuration error.
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, anyhow::Error> {
        let secret = config.secret.expose_secret();
        if secret.is_empty() {
            return Err(anyhow::anyhow!("JWT signing secret is empty"));
        }

        tracing::info!(issuer = %config.issuer, "JWT service initialized with HS256 secret");

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_token_ttl: Duration::minutes(config.access_token_expiry_minutes),
            refresh_token_ttl: Duration::days(config.refresh_token_expiry_days),
            clock,
        })
    }

    fn sign(
        &self,
        user_id: i64,
        is_admin: bool,
        sub: TokenSubject,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = self.clock.now().timestamp();

        let claims = TokenClaims {
            sub,
            jti: user_id.to_string(),
            is_admin,
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + ttl.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Generate both access and refresh tokens
    pub fn issue_token_pair(&self, user_id: i64, is_admin: bool) -> Result<TokenPair, TokenError> {
        let access_token = self.sign(user_id, is_admin, TokenSubject::Auth, self.access_token_ttl)?;
        let refresh_token =
            self.sign(user_id, is_admin, TokenSubject::Refresh, self.refresh_token_ttl)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Check signature, algorithm and validity window against the clock.
    fn decode_claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);
        // Time checks run below against the injected clock, with no leeway.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::UnexpectedAlgorithm
                }
                _ => TokenError::Malformed(e.to_string()),
            })?
            .claims;

        let now = self.clock.now().timestamp();
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        if claims.nbf > now {
            return Err(TokenError::NotYetValid);
        }

        Ok(claims)
    }

    /// Validate any unexpired token signed by this service.
    ///
    /// The subject is deliberately not checked.
    pub fn validate_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.decode_claims(token)
    }

    /// Validate an access token that carries the admin claim.
    pub fn validate_admin_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.decode_claims(token)?;

        if claims.sub != TokenSubject::Auth {
            return Err(TokenError::WrongSubject);
        }
        if !claims.is_admin {
            return Err(TokenError::NotAdmin);
        }

        Ok(claims)
    }

    /// Validate a refresh token, returning the embedded user ID and admin flag.
    pub fn validate_refresh_token(&self, token: &str) -> Result<(i64, bool), TokenError> {
        let claims = self.decode_claims(token)?;

        if claims.sub != TokenSubject::Refresh {
            return Err(TokenError::WrongSubject);
        }

        Ok((claims.user_id()?, claims.is_admin))
    }

    /// Exchange a refresh token for a new pair. The old token stays valid
    /// until it expires on its own.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let (user_id, is_admin) = self.validate_refresh_token(refresh_token)?;
        self.issue_token_pair(user_id, is_admin)
    }
}
