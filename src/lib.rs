pub mod authenticator;
pub mod commands;
pub mod discovery;
pub mod http;
pub mod http_client;
pub mod jwt;
pub mod parameters;

use thiserror::Error;

pub type ClientID = String;

#[derive(Error, Debug)]
pub enum TokenExchangeError {
    #[error("invalid configuration: `{0}`")]
    ConfigurationError(#[from] parameters::ConfigurationError),
    #[error("discovering issuer: `{0}`")]
    DiscoveryError(#[from] discovery::DiscoveryError),
    #[error("building JWT signer: `{0}`")]
    JwtSignerBuildError(#[from] jwt::signer::client_secret::ClientSecretSignerError),
    #[error("signing JWT assertion: `{0}`")]
    JwtSignerError(#[from] jwt::error::JwtEncoderError),
    #[error("fetching access token: `{0}`")]
    AuthenticatorError(#[from] authenticator::AuthenticateError),
}
