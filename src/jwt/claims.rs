use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims of the assertion JWT presented to the token endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Issuer. Client ID will be used here.
    pub(crate) iss: String,
    /// Subject (whom token refers to). Client ID will be used here.
    pub(crate) sub: String,
    /// Audience. The issuer's token generation endpoint.
    pub(crate) aud: String,
    /// JWT ID. Must not be reused. Using UID.
    pub(crate) jti: Uuid,
    /// Expiration time (as UTC timestamp).
    pub(crate) exp: u64,
}

impl Clone for Claims {
    /// Clone the Claims instance. This implies a new UUID will be generated as its `jti`.
    fn clone(&self) -> Self {
        Self {
            iss: self.iss.clone(),
            sub: self.sub.clone(),
            aud: self.aud.clone(),
            jti: Uuid::now_v7(),
            exp: self.exp,
        }
    }
}

impl Claims {
    /// Create a new Claims instance. `aud` is taken as an opaque string:
    /// the audience is built by concatenating the discovered issuer with
    /// the token path, and intentionally left unvalidated.
    pub fn new(client_id: String, aud: String, exp: u64) -> Self {
        Self {
            iss: client_id.clone(),
            sub: client_id,
            aud,
            jti: Uuid::now_v7(), // Non-reusable JWT ID
            exp,
        }
    }

    pub fn audience(&self) -> &str {
        &self.aud
    }
}
