//! Signed blob URLs.
//!
//! A signed URL embeds an HS256 token naming the blob key, the file name to
//! present, and the content disposition. The API verifies the token and
//! streams the blob without a bearer credential.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use phynix_core::error::AppError;
use phynix_core::result::AppResult;
use phynix_core::traits::storage::Disposition;

/// Claims carried by a blob token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobClaims {
    /// Storage key of the blob.
    pub key: String,
    /// File name for `Content-Disposition`.
    pub name: String,
    /// Attachment or inline.
    pub disposition: Disposition,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Issues and verifies blob tokens.
#[derive(Clone)]
pub struct SignedUrlIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    base_url: String,
}

impl std::fmt::Debug for SignedUrlIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedUrlIssuer")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SignedUrlIssuer {
    /// Create an issuer signing with `secret` and building URLs under `public_base_url`.
    pub fn new(secret: &str, public_base_url: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sign a token for `key`.
    pub fn token(
        &self,
        key: &str,
        file_name: &str,
        disposition: Disposition,
        ttl: Duration,
    ) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = BlobClaims {
            key: key.to_string(),
            name: file_name.to_string(),
            disposition,
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign blob token: {e}")))
    }

    /// Full URL for a signed token.
    pub fn url(
        &self,
        key: &str,
        file_name: &str,
        disposition: Disposition,
        ttl: Duration,
    ) -> AppResult<String> {
        let token = self.token(key, file_name, disposition, ttl)?;
        Ok(format!("{}/api/blobs/{token}", self.base_url))
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> AppResult<BlobClaims> {
        decode::<BlobClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::authentication("Link has expired")
                }
                _ => AppError::authentication("Invalid link"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_round_trips_claims() {
        let issuer = SignedUrlIssuer::new("secret", "http://localhost:8080/");
        let url = issuer
            .url("u/1/a.pdf", "a.pdf", Disposition::Inline, Duration::from_secs(60))
            .unwrap();
        let token = url
            .strip_prefix("http://localhost:8080/api/blobs/")
            .unwrap();
        let claims = issuer.verify(token).unwrap();
        assert_eq!(claims.key, "u/1/a.pdf");
        assert_eq!(claims.disposition, Disposition::Inline);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = SignedUrlIssuer::new("secret", "http://localhost");
        let claims = BlobClaims {
            key: "k".into(),
            name: "n".into(),
            disposition: Disposition::Attachment,
            iat: Utc::now().timestamp() - 120,
            exp: Utc::now().timestamp() - 60,
        };
        let token = encode(&Header::default(), &claims, &issuer.encoding_key).unwrap();
        let err = issuer.verify(&token).unwrap_err();
        assert_eq!(err.message, "Link has expired");
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let issuer = SignedUrlIssuer::new("secret", "http://localhost");
        let other = SignedUrlIssuer::new("other", "http://localhost");
        let token = other
            .token("k", "n", Disposition::Attachment, Duration::from_secs(60))
            .unwrap();
        assert!(issuer.verify(&token).is_err());
    }
}
