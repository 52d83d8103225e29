use super::{claims::Claims, error::JwtEncoderError, signed::SignedJwt};
use client_secret::ClientSecretSigner;

pub mod client_secret;

/// A JWT signer.
pub trait JwtSigner {
    fn sign(&self, claims: Claims) -> Result<SignedJwt, JwtEncoderError>;
}

/// Enumerates all implementations for `JwtSigner` for static dispatching reasons.
pub enum JwtSignerImpl {
    ClientSecret(ClientSecretSigner),
}

#[cfg_attr(test, mockall::automock)]
impl JwtSigner for JwtSignerImpl {
    fn sign(&self, claims: Claims) -> Result<SignedJwt, JwtEncoderError> {
        match self {
            Self::ClientSecret(secret_signer) => secret_signer.sign(claims),
        }
    }
}
