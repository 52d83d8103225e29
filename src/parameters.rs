use crate::ClientID;
use clap::Args;
use http::Uri;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_AUTHORIZATION_URL: &str = "https://dev-api.va.gov/oauth2";

/// Path of the OpenID well-known configuration document, relative to the
/// authorization base URL.
const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const TOKEN_PATH: &str = "/token";

#[derive(Args, Debug)]
pub struct AuthArgs {
    /// OAuth client id
    #[arg(long, required = true)]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long, required = true)]
    pub client_secret: String,

    /// Space separated list of OAuth scopes to request
    #[arg(long, required = true, num_args = 1..)]
    pub scope: Vec<String>,

    /// Launch context (ICN)
    #[arg(long)]
    pub launch: Option<String>,

    /// OAuth authorization url
    #[arg(long, default_value = DEFAULT_AUTHORIZATION_URL)]
    pub authorization_url: String,
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("missing required configuration value: `{0}`")]
    MissingValue(&'static str),
    #[error("invalid authorization url `{0}`: `{1}`")]
    InvalidAuthorizationUrl(String, String),
}

/// Validated, immutable configuration for a single token request run.
///
/// Constructed once from the CLI arguments and passed explicitly to every
/// component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    client_id: ClientID,
    client_secret: String,
    scope: Vec<String>,
    launch: Option<String>,
    discovery_endpoint: Uri,
    token_endpoint: Uri,
}

impl Config {
    pub fn new(
        client_id: ClientID,
        client_secret: String,
        scope: Vec<String>,
        launch: Option<String>,
        authorization_url: &str,
    ) -> Result<Self, ConfigurationError> {
        if client_id.is_empty() {
            return Err(ConfigurationError::MissingValue("client-id"));
        }
        if client_secret.is_empty() {
            return Err(ConfigurationError::MissingValue("client-secret"));
        }
        // An empty entry anywhere in the list would leak a stray space into
        // the space-joined scope string.
        if scope.is_empty() || scope.iter().any(|s| s.is_empty()) {
            return Err(ConfigurationError::MissingValue("scope"));
        }
        if authorization_url.is_empty() {
            return Err(ConfigurationError::MissingValue("authorization-url"));
        }

        // The base URL and the derived endpoints are validated here, before
        // any network call. The endpoint paths are appended by plain
        // concatenation, matching the permissive server-side contract.
        let discovery_endpoint = parse_endpoint(authorization_url, DISCOVERY_PATH)?;
        let token_endpoint = parse_endpoint(authorization_url, TOKEN_PATH)?;

        Ok(Self {
            client_id,
            client_secret,
            scope,
            // An empty launch context is treated as absent.
            launch: launch.filter(|l| !l.is_empty()),
            discovery_endpoint,
            token_endpoint,
        })
    }

    pub fn client_id(&self) -> &ClientID {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    pub fn launch(&self) -> Option<&str> {
        self.launch.as_deref()
    }

    pub fn discovery_endpoint(&self) -> &Uri {
        &self.discovery_endpoint
    }

    pub fn token_endpoint(&self) -> &Uri {
        &self.token_endpoint
    }
}

impl TryFrom<AuthArgs> for Config {
    type Error = ConfigurationError;

    fn try_from(args: AuthArgs) -> Result<Self, Self::Error> {
        Config::new(
            args.client_id,
            args.client_secret,
            args.scope,
            args.launch,
            &args.authorization_url,
        )
    }
}

fn parse_endpoint(base: &str, path: &str) -> Result<Uri, ConfigurationError> {
    let url = format!("{base}{path}");
    url.parse::<Uri>()
        .map_err(|e| ConfigurationError::InvalidAuthorizationUrl(url, e.to_string()))
}
