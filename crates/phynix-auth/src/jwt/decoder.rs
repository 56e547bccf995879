//! JWT token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use phynix_core::config::AuthConfig;
use phynix_core::error::AppError;

use super::claims::Claims;

/// Validates bearer tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;
        validation.set_issuer(&[config.jwt_issuer.as_str()]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token string.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::authentication("Invalid token issuer")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        if token_data.claims.email.trim().is_empty() {
            return Err(AppError::authentication("Token carries no email"));
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::jwt::JwtEncoder;

    #[test]
    fn test_round_trip() {
        let config = AuthConfig::default();
        let encoder = JwtEncoder::new(&config);
        let decoder = JwtDecoder::new(&config);
        let user_id = Uuid::new_v4();

        let (token, _) = encoder.issue(user_id, "a@x.io", "Ann").unwrap();
        let claims = decoder.decode(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "phynixdrive");
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let issuing = AuthConfig {
            jwt_issuer: "someone-else".into(),
            ..AuthConfig::default()
        };
        let (token, _) = JwtEncoder::new(&issuing)
            .issue(Uuid::new_v4(), "a@x.io", "")
            .unwrap();
        let err = JwtDecoder::new(&AuthConfig::default())
            .decode(&token)
            .unwrap_err();
        assert_eq!(err.message, "Invalid token issuer");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let decoder = JwtDecoder::new(&AuthConfig::default());
        assert!(decoder.decode("not.a.token").is_err());
    }
}
