//! Password login against a negotiated homeserver.

use log::info;

use crate::auth::params::LoginParameters;
use crate::auth::session::{AccountSession, SessionCreator};
use crate::client::HomeserverApi;
use crate::error::AuthError;

/// Logs into an existing account on the negotiated homeserver.
///
/// Obtained from the authentication service once the login flow has been
/// fetched; the single round-trip either yields a session or an error.
#[derive(Debug)]
pub struct LoginWizard<'a, C: HomeserverApi> {
    /// Transport to the homeserver.
    client: &'a C,
    /// Builder for the final session object.
    session_creator: SessionCreator,
}

impl<'a, C: HomeserverApi> LoginWizard<'a, C> {
    /// Create a wizard over the negotiated homeserver.
    pub fn new(client: &'a C) -> LoginWizard<'a, C> {
        LoginWizard {
            client,
            session_creator: SessionCreator,
        }
    }

    /// Authenticate with a password.
    ///
    /// # Arguments
    ///
    /// * `user` - A full Matrix ID or the localpart, e.g. `alice`.
    /// * `password` - The account password.
    /// * `initial_device_display_name` - Display name for the new device.
    pub async fn login(
        &self,
        user: &str,
        password: &str,
        initial_device_display_name: Option<&str>,
    ) -> Result<AccountSession, AuthError> {
        info!("login with password");
        let parameters = LoginParameters::password(user, password, initial_device_display_name);
        let credentials = self.client.login(&parameters).await?;

        Ok(self
            .session_creator
            .create_session(credentials, self.client.homeserver_url()))
    }
}
