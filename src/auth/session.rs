//! Session materialization from homeserver credentials.

use std::fmt;

use reqwest::Url;

use crate::client::CredentialsResponse;

/// An authenticated session against a homeserver.
///
/// This is what the rest of an application receives once registration or
/// login completes; it carries everything needed to issue authenticated
/// requests.
#[derive(Clone, PartialEq)]
pub struct AccountSession {
    /// Fully qualified user identifier, e.g. `@alice:example.org`.
    pub user_id: String,
    /// Device identifier of this session.
    pub device_id: Option<String>,
    /// Access token authenticating this session.
    pub access_token: String,
    /// The homeserver the session belongs to.
    pub homeserver_url: Url,
}

// The access token must never end up in logs, so Debug is written by hand.
impl fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccountSession")
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("access_token", &"<redacted>")
            .field("homeserver_url", &self.homeserver_url.as_str())
            .finish()
    }
}

/// Builds [`AccountSession`] values out of credential responses.
///
/// A pure function of its inputs: calling it twice with the same response
/// yields two distinct but equal sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCreator;

impl SessionCreator {
    /// Materialize a session from a credentials response.
    ///
    /// The homeserver URL comes from the client that performed the
    /// request; the `home_server` field of the response is a bare server
    /// name and is only informational.
    pub fn create_session(
        &self,
        response: CredentialsResponse,
        homeserver_url: &Url,
    ) -> AccountSession {
        AccountSession {
            user_id: response.user_id,
            device_id: response.device_id,
            access_token: response.access_token,
            homeserver_url: homeserver_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> CredentialsResponse {
        CredentialsResponse {
            user_id: "@alice:example.org".to_string(),
            access_token: "syt_token".to_string(),
            device_id: Some("DEVICE".to_string()),
            home_server: Some("example.org".to_string()),
        }
    }

    #[test]
    fn test_create_session_copies_credentials() {
        let url = Url::parse("https://example.org").unwrap();
        let session = SessionCreator.create_session(credentials(), &url);

        assert_eq!(session.user_id, "@alice:example.org");
        assert_eq!(session.device_id.as_deref(), Some("DEVICE"));
        assert_eq!(session.access_token, "syt_token");
        assert_eq!(session.homeserver_url, url);
    }

    #[test]
    fn test_create_session_twice_yields_equal_sessions() {
        let url = Url::parse("https://example.org").unwrap();
        let creator = SessionCreator;

        let first = creator.create_session(credentials(), &url);
        let second = creator.create_session(credentials(), &url);

        assert_eq!(first, second);
    }

    #[test]
    fn test_session_debug_redacts_access_token() {
        let url = Url::parse("https://example.org").unwrap();
        let session = SessionCreator.create_session(credentials(), &url);

        let debug = format!("{:?}", session);
        assert!(debug.contains("@alice:example.org"));
        assert!(!debug.contains("syt_token"));
    }
}
