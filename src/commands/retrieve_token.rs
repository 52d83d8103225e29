use chrono::{TimeDelta, Utc};
use tracing::debug;

use crate::TokenExchangeError;
use crate::authenticator::{Authenticator, HttpAuthenticator, TokenRequest, TokenResponse};
use crate::discovery::{HttpIssuerDiscoverer, IssuerDiscoverer};
use crate::http_client::HttpClient;
use crate::jwt::claims::Claims;
use crate::jwt::error::JwtEncoderError;
use crate::jwt::signed::SignedJwt;
use crate::jwt::signer::client_secret::ClientSecretSigner;
use crate::jwt::signer::{JwtSigner, JwtSignerImpl};
use crate::parameters::Config;

/// A signed assertion should live just long enough for the authorization
/// server to consume it.
pub(crate) const ASSERTION_TTL: TimeDelta = TimeDelta::seconds(60);

/// Path of the token generation endpoint, relative to the discovered issuer.
const AUDIENCE_PATH: &str = "/v1/token";

/// One-shot token retrieval: discover the issuer, sign an assertion for it,
/// exchange the assertion for an access token. Strictly sequential and
/// fail-fast; the first error aborts the run.
pub struct RetrieveTokenCommand<C>
where
    C: HttpClient + Clone,
{
    http_client: C,
}

impl<C> RetrieveTokenCommand<C>
where
    C: HttpClient + Clone,
{
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    pub fn retrieve_token(self, config: &Config) -> Result<TokenResponse, TokenExchangeError> {
        let discoverer = HttpIssuerDiscoverer::new(
            self.http_client.clone(),
            config.discovery_endpoint().clone(),
        );
        let issuer = discoverer.discover()?;

        let assertion = build_assertion(config, &issuer)?;
        debug!("assertion signed");

        let request = TokenRequest::new(assertion, config.scope(), config.launch());
        let authenticator =
            HttpAuthenticator::new(self.http_client, config.token_endpoint().clone());

        let response = authenticator.authenticate(request)?;
        debug!("access token retrieved");

        Ok(response)
    }
}

/// Builds and signs the JWT assertion: `aud` is the issuer's token
/// generation endpoint, `iss` and `sub` are the client id, `exp` is 60
/// seconds from now, `jti` is fresh on every call.
fn build_assertion(config: &Config, issuer: &str) -> Result<SignedJwt, TokenExchangeError> {
    // Permissive concatenation, matching what the server publishes.
    let audience = format!("{issuer}{AUDIENCE_PATH}");

    let expires_at = Utc::now() + ASSERTION_TTL;
    let exp = expires_at.timestamp().try_into().map_err(|_| {
        JwtEncoderError::TokenEncoding("converting assertion expiration time".into())
    })?;

    let claims = Claims::new(config.client_id().to_owned(), audience, exp);

    let signer = JwtSignerImpl::ClientSecret(ClientSecretSigner::try_from(config.client_secret())?);

    Ok(signer.sign(claims)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use http::{Request, Response};
    use httpmock::{Method::GET, Method::POST, MockServer};
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, get_current_timestamp};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    use crate::http_client::HttpClientError;

    fn test_config(authorization_url: &str) -> Config {
        Config::new(
            "test_client_id".into(),
            "test_client_secret".into(),
            vec!["patient/Patient.read".into(), "launch".into()],
            Some("1012845331V153043".into()),
            authorization_url,
        )
        .unwrap()
    }

    #[test]
    fn retrieve_token_end_to_end() {
        let token_body = r#"{"access_token":"abc123","token_type":"Bearer","expires_in":300}"#;

        let server = MockServer::start();
        let discovery_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/oauth2/.well-known/openid-configuration");
            then.status(200).body(r#"{"issuer":"https://auth.test"}"#);
        });
        let token_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth2/token")
                .header("content-type", "application/x-www-form-urlencoded");
            then.status(200).body(token_body);
        });

        let config = test_config(&format!("{}/oauth2", server.base_url()));
        let http_client = crate::http::client::HttpClient::new().unwrap();

        let response = RetrieveTokenCommand::new(http_client)
            .retrieve_token(&config)
            .unwrap();

        // The output payload is byte-identical to the token endpoint's body.
        assert_eq!(response.raw(), token_body);
        discovery_mock.assert();
        token_mock.assert()
    }

    #[test]
    fn assertion_audience_and_claims_follow_the_discovered_issuer() {
        // A closure-backed HttpClient serves both calls and captures the
        // token request body so the signed assertion can be inspected.
        let captured_body: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let capture = Arc::clone(&captured_body);

        let http_client = move |req: Request<Vec<u8>>| -> Result<Response<Vec<u8>>, HttpClientError> {
            let body = if req.uri().path().ends_with("/openid-configuration") {
                r#"{"issuer":"https://example.org"}"#.to_string()
            } else {
                *capture.lock().unwrap() =
                    Some(String::from_utf8(req.body().clone()).unwrap());
                r#"{"access_token":"abc123","token_type":"Bearer","expires_in":300}"#.to_string()
            };
            Response::builder()
                .status(200)
                .body(body.into_bytes())
                .map_err(|e| HttpClientError::InvalidResponse(e.to_string()))
        };

        let config = test_config("https://auth.test/oauth2");
        let started_at = get_current_timestamp();

        RetrieveTokenCommand::new(http_client)
            .retrieve_token(&config)
            .unwrap();

        let body = captured_body.lock().unwrap().clone().unwrap();
        let fields: Vec<(String, String)> = serde_urlencoded::from_str(&body).unwrap();

        let field = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(field("grant_type"), "client_credentials");
        assert_eq!(
            field("client_assertion_type"),
            "urn:ietf:params:oauth:client-assertion-type:jwt-bearer"
        );
        assert_eq!(field("scope"), "patient/Patient.read launch");
        assert_eq!(field("launch"), "1012845331V153043");

        // The assertion verifies under the client secret and carries the
        // audience derived from the discovered issuer.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.sub = Some("test_client_id".to_owned());
        validation.set_audience(&["https://example.org/v1/token"]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        let decoded = jsonwebtoken::decode::<Value>(
            &field("client_assertion"),
            &DecodingKey::from_secret(b"test_client_secret"),
            &validation,
        )
        .unwrap();

        let claims = decoded.claims;
        assert_eq!(claims["iss"], "test_client_id");
        assert_eq!(claims["sub"], "test_client_id");
        assert_eq!(claims["aud"], "https://example.org/v1/token");

        let exp = claims["exp"].as_u64().unwrap();
        assert!(exp >= started_at);
        assert!(exp <= get_current_timestamp() + ASSERTION_TTL.num_seconds() as u64);
    }

    #[test]
    fn jti_differs_between_runs_with_identical_inputs() {
        let captured: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let make_client = |capture: Arc<Mutex<Vec<String>>>| {
            move |req: Request<Vec<u8>>| -> Result<Response<Vec<u8>>, HttpClientError> {
                let body = if req.uri().path().ends_with("/openid-configuration") {
                    r#"{"issuer":"https://example.org"}"#.to_string()
                } else {
                    capture
                        .lock()
                        .unwrap()
                        .push(String::from_utf8(req.body().clone()).unwrap());
                    r#"{"access_token":"abc123","token_type":"Bearer","expires_in":300}"#
                        .to_string()
                };
                Response::builder()
                    .status(200)
                    .body(body.into_bytes())
                    .map_err(|e| HttpClientError::InvalidResponse(e.to_string()))
            }
        };

        let config = test_config("https://auth.test/oauth2");

        for _ in 0..2 {
            RetrieveTokenCommand::new(make_client(Arc::clone(&captured)))
                .retrieve_token(&config)
                .unwrap();
        }

        let bodies = captured.lock().unwrap();
        assert_eq!(bodies.len(), 2);

        let jti_of = |body: &str| {
            let fields: Vec<(String, String)> = serde_urlencoded::from_str(body).unwrap();
            let assertion = fields
                .iter()
                .find(|(k, _)| k == "client_assertion")
                .map(|(_, v)| v.clone())
                .unwrap();

            let mut validation = Validation::new(Algorithm::HS256);
            validation.insecure_disable_signature_validation();
            validation.validate_aud = false;
            jsonwebtoken::decode::<Value>(&assertion, &DecodingKey::from_secret(b""), &validation)
                .unwrap()
                .claims["jti"]
                .clone()
        };

        assert_ne!(jti_of(&bodies[0]), jti_of(&bodies[1]));
    }

    #[test]
    fn auth_server_error_is_surfaced_with_its_payload() {
        let server = MockServer::start();
        let discovery_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/oauth2/.well-known/openid-configuration");
            then.status(200).body(r#"{"issuer":"https://auth.test"}"#);
        });
        let token_mock = server.mock(|when, then| {
            when.method(POST).path("/oauth2/token");
            then.status(400).body(r#"{"error":"invalid_client"}"#);
        });

        let config = test_config(&format!("{}/oauth2", server.base_url()));
        let http_client = crate::http::client::HttpClient::new().unwrap();

        let error = RetrieveTokenCommand::new(http_client)
            .retrieve_token(&config)
            .unwrap_err();

        assert_matches!(error, TokenExchangeError::AuthenticatorError(_));
        assert!(error.to_string().contains("invalid_client"));
        discovery_mock.assert();
        token_mock.assert()
    }

    #[test]
    fn discovery_failure_skips_the_token_request() {
        let server = MockServer::start();
        let discovery_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/oauth2/.well-known/openid-configuration");
            then.status(200).body(r#"{"not_issuer":true}"#);
        });
        let token_mock = server.mock(|when, then| {
            when.method(POST).path("/oauth2/token");
            then.status(200).body("{}");
        });

        let config = test_config(&format!("{}/oauth2", server.base_url()));
        let http_client = crate::http::client::HttpClient::new().unwrap();

        let error = RetrieveTokenCommand::new(http_client)
            .retrieve_token(&config)
            .unwrap_err();

        assert_matches!(error, TokenExchangeError::DiscoveryError(_));
        discovery_mock.assert();
        token_mock.assert_calls(0)
    }
}
