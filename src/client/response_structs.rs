//! Response structures for the Matrix client-server endpoints.
//!
//! This module contains structures for deserializing JSON responses from the
//! homeserver endpoints consumed by the authentication engine.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Response from `GET /_matrix/client/v3/login`.
///
/// Lists the login flows the homeserver supports.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LoginFlowsResponse {
    /// Supported login flows, one entry per flow type.
    pub flows: Vec<LoginFlow>,
}

/// A single supported login flow.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LoginFlow {
    /// The flow type identifier, e.g. `m.login.password` or `m.login.sso`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Identity providers advertised by an `m.login.sso` flow.
    #[serde(default)]
    pub identity_providers: Vec<IdentityProvider>,
}

/// An SSO identity provider as advertised by the homeserver.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IdentityProvider {
    /// Identifier used for the SSO redirect endpoint.
    pub id: String,
    /// Human readable provider name.
    pub name: String,
    /// Optional brand hint for styling the login button.
    #[serde(default)]
    pub brand: Option<String>,
    /// Optional URL to an icon representing the provider.
    #[serde(default, rename = "icon")]
    pub icon_url: Option<String>,
}

/// A user-interactive-authentication session body.
///
/// The homeserver attaches this body to a 401-style response whenever a
/// registration request needs more stages. `session` and `flows` are always
/// present in such a body, which is what distinguishes it from a plain error
/// answer.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UiaResponse {
    /// Server-issued session identifier for the ongoing attempt.
    pub session: String,
    /// The alternative flows the client may complete.
    pub flows: Vec<UiaFlow>,
    /// Stage identifiers already completed within this session.
    #[serde(default)]
    pub completed: Vec<String>,
    /// Per-stage-type parameters, e.g. the reCAPTCHA public key.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Error code carried when the previous stage submission failed.
    #[serde(default)]
    pub errcode: Option<String>,
    /// Error message carried when the previous stage submission failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl fmt::Display for UiaResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "session={}, flows={}, completed={:?}",
            self.session,
            self.flows.len(),
            self.completed
        )
    }
}

/// One alternative flow inside a [`UiaResponse`].
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UiaFlow {
    /// Ordered stage identifiers required by this flow.
    #[serde(default)]
    pub stages: Vec<String>,
}

/// Credentials returned by a completed `/register` or `/login` request.
#[derive(Deserialize, Clone, PartialEq)]
pub struct CredentialsResponse {
    /// Fully qualified user identifier, e.g. `@alice:example.org`.
    pub user_id: String,
    /// Access token for the created session.
    pub access_token: String,
    /// Device identifier, generated by the server when not supplied.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Server name, informational and deprecated on the wire.
    #[serde(default)]
    pub home_server: Option<String>,
}

// The access token must never end up in logs, so Debug is written by hand.
impl fmt::Debug for CredentialsResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CredentialsResponse")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("device_id", &self.device_id)
            .field("home_server", &self.home_server)
            .finish()
    }
}

/// Response from a `requestToken` endpoint during registration.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TokenResponse {
    /// Session identifier of the verification, distinct from the
    /// user-interactive-authentication session.
    pub sid: String,
    /// Endpoint to post the received code to, phone verification only.
    #[serde(default)]
    pub submit_url: Option<String>,
    /// Phone number as formatted by the homeserver.
    #[serde(default, rename = "msisdn")]
    pub formatted_msisdn: Option<String>,
}

/// Response from `GET /.well-known/matrix/client`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WellKnownResponse {
    /// The advertised homeserver.
    #[serde(rename = "m.homeserver")]
    pub homeserver: WellKnownEntry,
    /// The advertised identity server, if any.
    #[serde(default, rename = "m.identity_server")]
    pub identity_server: Option<WellKnownEntry>,
}

/// A single server entry of a well-known document.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WellKnownEntry {
    /// Base URL of the advertised server.
    pub base_url: String,
}

/// Response from `GET /_matrix/client/v3/register/available`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UsernameAvailableResponse {
    /// Whether the queried username can be registered.
    pub available: bool,
}

/// Standard Matrix error body, `{"errcode": ..., "error": ...}`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MatrixErrorBody {
    /// Machine readable error code, e.g. `M_USER_IN_USE`.
    #[serde(default)]
    pub errcode: Option<String>,
    /// Human readable error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of a registration request.
///
/// A registration request either completes the account and yields
/// credentials, or answers with a user-interactive-authentication body that
/// lists the remaining stages. Other answers are transport errors.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    /// The account exists and a session was granted.
    Success(CredentialsResponse),
    /// More authentication stages are required.
    IncompleteAuth(UiaResponse),
}
