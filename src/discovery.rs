use http::header::ACCEPT;
use http::{Method, Request, Uri};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::http_client::HttpClient;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("unable to build discovery request: `{0}`")]
    BuildingRequest(String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
    #[error("discovery endpoint error: Status code: `{0}`, Body: `{1}`")]
    HttpResponseError(u16, String),
    #[error("malformed discovery document: `{0}`")]
    MalformedDocument(String),
    #[error("discovery document has no `issuer` field")]
    MissingIssuer,
}

/// Resolves the authorization server's canonical issuer identity.
pub trait IssuerDiscoverer {
    fn discover(&self) -> Result<String, DiscoveryError>;
}

/// Fetches the OpenID well-known configuration document and extracts the
/// `issuer` value, which feeds the assertion audience.
pub struct HttpIssuerDiscoverer<C> {
    /// HTTP client
    http_client: C,
    /// Full URL of the well-known configuration document
    url: Uri,
}

impl<C> HttpIssuerDiscoverer<C> {
    pub fn new(http_client: C, url: Uri) -> Self {
        Self { http_client, url }
    }
}

impl<C> IssuerDiscoverer for HttpIssuerDiscoverer<C>
where
    C: HttpClient,
{
    /// Executes a GET request against the well-known configuration document
    /// and returns its `issuer` field unmodified.
    fn discover(&self) -> Result<String, DiscoveryError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.url.clone())
            .header(ACCEPT, "application/json")
            .body(Vec::new())
            .map_err(|e| DiscoveryError::BuildingRequest(e.to_string()))?;

        let response = self
            .http_client
            .send(request)
            .map_err(|e| DiscoveryError::HttpTransportError(e.to_string()))?;

        let body = String::from_utf8(response.body().clone())
            .map_err(|e| DiscoveryError::MalformedDocument(format!("invalid utf8 response: {e}")))?;

        if !response.status().is_success() {
            return Err(DiscoveryError::HttpResponseError(
                response.status().as_u16(),
                body,
            ));
        }

        // The document is treated as opaque JSON; only `issuer` is read.
        let document: Value = serde_json::from_str(body.as_str())
            .map_err(|e| DiscoveryError::MalformedDocument(e.to_string()))?;

        let issuer = document
            .get("issuer")
            .and_then(Value::as_str)
            .ok_or(DiscoveryError::MissingIssuer)?;

        debug!("issuer discovered: {issuer}");

        Ok(issuer.to_owned())
    }
}
