use jsonwebtoken::{Algorithm, EncodingKey, Header};
use thiserror::Error;

use crate::jwt::{claims::Claims, error::JwtEncoderError, signed::SignedJwt};

use super::JwtSigner;

/// Errors that can occur when creating a ClientSecretSigner.
#[derive(Debug, Error)]
pub enum ClientSecretSignerError {
    #[error("client secret must not be empty")]
    EmptySecret,
}

/// Signer that uses the OAuth client secret as a symmetric HMAC key.
pub struct ClientSecretSigner {
    encoding_key: EncodingKey,
    algorithm: Algorithm,
}

/// Attempt to create a ClientSecretSigner from the raw secret.
impl TryFrom<&str> for ClientSecretSigner {
    type Error = ClientSecretSignerError;

    fn try_from(secret: &str) -> Result<Self, Self::Error> {
        // An empty key would produce an assertion the server can never
        // accept, so it is rejected before signing.
        if secret.is_empty() {
            return Err(ClientSecretSignerError::EmptySecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
        })
    }
}

impl JwtSigner for ClientSecretSigner {
    // Algorithm-agnostic, though we only support HS256.
    fn sign(&self, claims: Claims) -> Result<SignedJwt, JwtEncoderError> {
        let value = jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| JwtEncoderError::TokenEncoding(e.to_string()))?;
        Ok(SignedJwt { value })
    }
}
