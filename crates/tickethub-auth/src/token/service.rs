//! Token issuing and verification with configurable signing and TTL.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use tickethub_core::config::auth::AuthConfig;
use tickethub_core::error::AppError;

use super::claims::{Claims, TokenType};

/// A freshly issued access + refresh credential pair.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Access token expiration timestamp.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiration timestamp.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Issues and verifies signed, time-bound credentials.
///
/// Tokens are signed (HMAC-SHA256), not encrypted; verification needs no
/// state beyond the signing key and is pure and synchronous.
#[derive(Clone)]
pub struct TokenService {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation settings for ordinary verification.
    validation: Validation,
    /// Validation settings for expiry inspection (signature only).
    inspection: Validation,
    /// TTL configuration.
    config: AuthConfig,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenService {
    /// Creates a new token service from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        let mut inspection = Validation::new(Algorithm::HS256);
        inspection.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            inspection,
            config: config.clone(),
        }
    }

    /// Issues a new access + refresh pair for the given account.
    ///
    /// Session-bound pairs carry the session ID; legacy pairs omit it. The
    /// refresh lifetime follows the remember-me choice, the access
    /// lifetime is the short fixed window from configuration.
    pub fn issue(
        &self,
        account_id: Uuid,
        session_id: Option<Uuid>,
        remember_me: bool,
    ) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let access_exp = now + self.config.access_ttl();
        let refresh_exp = now + self.config.refresh_ttl(remember_me);

        let access_claims = Claims {
            sub: account_id,
            sid: session_id,
            remember_me,
            token_type: TokenType::Access,
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
            jti: Uuid::new_v4(),
        };

        let refresh_claims = Claims {
            sub: account_id,
            sid: session_id,
            remember_me,
            token_type: TokenType::Refresh,
            iat: now.timestamp(),
            exp: refresh_exp.timestamp(),
            jti: Uuid::new_v4(),
        };

        let access_token = encode(&Header::default(), &access_claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;

        let refresh_token = encode(&Header::default(), &refresh_claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode refresh token: {e}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at: access_exp,
            refresh_expires_at: refresh_exp,
        })
    }

    /// Verifies a refresh token string and returns its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode_token(token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(AppError::token_invalid(
                "Invalid token type: expected refresh token",
            ));
        }

        Ok(claims)
    }

    /// Verifies an access token string and returns its claims.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.decode_token(token)?;

        if claims.token_type != TokenType::Access {
            return Err(AppError::token_invalid(
                "Invalid token type: expected access token",
            ));
        }

        Ok(claims)
    }

    /// Reads a token's expiry without enforcing it. Pure inspection; the
    /// signature is still required to be valid.
    pub fn expiry_of(&self, token: &str) -> Result<DateTime<Utc>, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.inspection)
            .map_err(|e| AppError::token_invalid(format!("Token inspection failed: {e}")))?;

        Ok(token_data.claims.expires_at())
    }

    /// Internal decode without type checking.
    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::token_expired("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::token_invalid("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::token_invalid("Invalid token signature")
                    }
                    _ => AppError::token_invalid(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}
