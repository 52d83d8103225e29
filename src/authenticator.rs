use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, Uri};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::http_client::HttpClient;
use crate::jwt::signed::SignedJwt;

#[derive(Error, Debug)]
pub enum AuthenticateError {
    #[error("unable to serialize request: `{0}`")]
    SerializeError(String),
    #[error("unable to parse token response: `{0}`")]
    DeserializeError(String),
    #[error("token endpoint error: Status code: `{0}`, Body: `{1}`")]
    HttpResponseError(u16, String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
}

pub trait Authenticator {
    fn authenticate(&self, req: TokenRequest) -> Result<TokenResponse, AuthenticateError>;
}

/// The Authenticator is responsible for exchanging a signed JWT assertion
/// for an access token at the authorization server's token endpoint.
pub struct HttpAuthenticator<C> {
    /// HTTP client
    http_client: C,
    /// Token endpoint URL
    url: Uri,
}

impl<C> HttpAuthenticator<C> {
    pub fn new(http_client: C, url: Uri) -> Self {
        Self { http_client, url }
    }
}

impl<C> Authenticator for HttpAuthenticator<C>
where
    C: HttpClient,
{
    /// Executes a form-encoded POST request to the token endpoint with the
    /// `TokenRequest` as a body and returns the server's token document.
    fn authenticate(&self, req: TokenRequest) -> Result<TokenResponse, AuthenticateError> {
        let serialized_req = serde_urlencoded::to_string(&req)
            .map_err(|e| AuthenticateError::SerializeError(e.to_string()))?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(serialized_req.into_bytes())
            .map_err(|e| AuthenticateError::SerializeError(e.to_string()))?;

        let response = self
            .http_client
            .send(request)
            .map_err(|e| AuthenticateError::HttpTransportError(e.to_string()))?;

        let body = String::from_utf8(response.body().clone()).map_err(|e| {
            AuthenticateError::DeserializeError(format!("invalid utf8 response: {e}"))
        })?;

        if !response.status().is_success() {
            // The server's error payload is surfaced verbatim.
            return Err(AuthenticateError::HttpResponseError(
                response.status().as_u16(),
                body,
            ));
        }

        TokenResponse::try_from(body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    ClientCredentials,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClientAssertionType {
    #[serde(rename = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer")]
    JwtBearer,
}

/// Form body of the token request. Field order here is the serialization
/// order on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenRequest {
    pub grant_type: GrantType,
    pub client_assertion_type: ClientAssertionType,
    pub client_assertion: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch: Option<String>,
}

impl TokenRequest {
    pub fn new(assertion: SignedJwt, scopes: &[String], launch: Option<&str>) -> Self {
        Self {
            grant_type: GrantType::ClientCredentials,
            client_assertion_type: ClientAssertionType::JwtBearer,
            client_assertion: assertion.value().to_owned(),
            scope: scopes.join(" "),
            launch: launch.filter(|l| !l.is_empty()).map(str::to_owned),
        }
    }
}

/// The token endpoint's response, kept opaque.
///
/// The raw body is retained alongside the parsed document so the response
/// can be relayed to stdout byte-identical to what the server sent,
/// unknown fields included.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenResponse {
    raw: String,
    json: Value,
}

impl TokenResponse {
    pub fn json(&self) -> &Value {
        &self.json
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for TokenResponse {
    type Error = AuthenticateError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let json: Value = serde_json::from_str(raw.as_str())
            .map_err(|e| AuthenticateError::DeserializeError(e.to_string()))?;
        Ok(Self { raw, json })
    }
}

impl fmt::Display for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
