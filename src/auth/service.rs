//! The authentication service façade.
//!
//! The service owns the transport client and the state of the current
//! authentication attempt. Negotiating a homeserver replaces both, which is
//! what makes an attempt against a previous homeserver impossible to
//! continue by accident.

use std::time::Duration;

use log::info;
use reqwest::Url;

use crate::auth::login::LoginWizard;
use crate::auth::pending::PendingAuthData;
use crate::auth::session::{AccountSession, SessionCreator};
use crate::auth::stages::stage_type;
use crate::auth::wizard::RegistrationWizard;
use crate::auth::{AuthenticationMode, LoginFlowResult, SsoIdentityProvider};
use crate::client::{CredentialsResponse, HomeserverApi, RestClient, WellKnownResponse};
use crate::config::Config;
use crate::error::AuthError;

/// Entry point for authenticating against a Matrix homeserver.
///
/// The expected call order is:
/// 1. [`login_flow`](AuthenticationService::login_flow) to negotiate a
///    homeserver and learn its supported flows,
/// 2. [`registration_wizard`](AuthenticationService::registration_wizard)
///    or [`login_wizard`](AuthenticationService::login_wizard) to drive the
///    actual authentication.
///
/// Exactly one attempt is live at a time. Wizards borrow the service, so
/// starting a new negotiation first requires every outstanding wizard to be
/// dropped, and stale wizards cannot operate on the new attempt.
///
/// # Examples
///
/// ```no_run
/// use vestibule::auth::AuthenticationService;
/// use vestibule::config::Config;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), vestibule::error::AuthError> {
/// let mut service = AuthenticationService::new(&Config::default())?;
/// let flows = service.login_flow("example.org").await?;
/// println!("negotiated {}", flows.homeserver_url);
///
/// let mut wizard = service.registration_wizard()?;
/// let result = wizard.create_account(Some("alice"), Some("secret"), None).await?;
/// # let _ = result;
/// # Ok(())
/// # }
/// ```
pub struct AuthenticationService {
    /// Transport to the currently negotiated homeserver.
    client: RestClient,
    /// State of the current attempt, `None` before any negotiation.
    pending: Option<PendingAuthData>,
    /// Builder for session objects created outside a wizard.
    session_creator: SessionCreator,
    /// Request timeout applied to every transport client.
    timeout: Duration,
}

impl AuthenticationService {
    /// Create a service pointing at the configured default homeserver.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::InvalidHomeserver`] when the configured
    /// default URL is malformed.
    pub fn new(config: &Config) -> Result<AuthenticationService, AuthError> {
        let url = normalize_homeserver_url(&config.homeserver.default_url)?;
        let timeout = Duration::from_secs(config.http.timeout);
        let client = RestClient::new(url, timeout)?;

        Ok(AuthenticationService {
            client,
            pending: None,
            session_creator: SessionCreator,
            timeout,
        })
    }

    /// The homeserver the service currently points at.
    pub fn homeserver_url(&self) -> &Url {
        self.client.homeserver_url()
    }

    /// True when username and password have been sent successfully for the
    /// current attempt.
    pub fn is_registration_started(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(PendingAuthData::is_registration_started)
    }

    /// The result of the last flow negotiation, if one succeeded.
    pub fn login_flow_result(&self) -> Option<&LoginFlowResult> {
        self.pending
            .as_ref()
            .and_then(|pending| pending.login_flow_result.as_ref())
    }

    /// Negotiate authentication flows with a homeserver.
    ///
    /// This is the first method to call to be able to get a wizard to log
    /// in or to create an account. Starting a negotiation discards any
    /// attempt in progress, on purpose: one attempt at a time.
    ///
    /// The homeserver string is the user's input; `https://` is prepended
    /// when no scheme is present.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::InvalidHomeserver`] before any network call
    /// when the string cannot be parsed as a URL.
    pub async fn login_flow(&mut self, homeserver: &str) -> Result<LoginFlowResult, AuthError> {
        self.pending = None;

        let url = normalize_homeserver_url(homeserver)?;
        info!("negotiate login flow with {}", &url);

        self.client = RestClient::new(url.clone(), self.timeout)?;
        self.pending = Some(PendingAuthData::new(url.clone()));

        let response = self.client.get_login_flows().await?;

        let mut providers: Vec<SsoIdentityProvider> = response
            .flows
            .iter()
            .find(|flow| flow.kind == stage_type::SSO)
            .map(|flow| {
                flow.identity_providers
                    .iter()
                    .map(SsoIdentityProvider::from)
                    .collect()
            })
            .unwrap_or_default();
        providers.sort_by(|a, b| a.name.cmp(&b.name));

        let result = LoginFlowResult {
            homeserver_url: url,
            supported_flows: response.flows.iter().map(|flow| flow.kind.clone()).collect(),
            sso_identity_providers: providers,
        };

        if let Some(pending) = self.pending.as_mut() {
            pending.login_flow_result = Some(result.clone());
        }

        Ok(result)
    }

    /// A wizard to create an account on the negotiated homeserver.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::FlowNotNegotiated`] when
    /// [`login_flow`](AuthenticationService::login_flow) has not run.
    pub fn registration_wizard(
        &mut self,
    ) -> Result<RegistrationWizard<'_, RestClient>, AuthError> {
        let AuthenticationService {
            client, pending, ..
        } = self;
        let pending = pending.as_mut().ok_or(AuthError::FlowNotNegotiated)?;
        Ok(RegistrationWizard::new(&*client, pending))
    }

    /// A wizard to log into an existing account on the negotiated
    /// homeserver.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthError::FlowNotNegotiated`] when
    /// [`login_flow`](AuthenticationService::login_flow) has not run.
    pub fn login_wizard(&self) -> Result<LoginWizard<'_, RestClient>, AuthError> {
        if self.pending.is_none() {
            return Err(AuthError::FlowNotNegotiated);
        }
        Ok(LoginWizard::new(&self.client))
    }

    /// Abandon the attempt in progress but keep the negotiated homeserver.
    ///
    /// The attempt state is replaced wholesale: new client secret, zeroed
    /// send-attempt counter, no session. The homeserver cannot correlate
    /// the next attempt with the abandoned one.
    pub fn cancel_pending_registration(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!("cancel the registration in progress");
            self.pending = Some(PendingAuthData::new(pending.homeserver_url().clone()));
        }
    }

    /// Drop every pending state, including the negotiated homeserver
    /// flows. The service needs a new negotiation afterwards.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// The web fallback page for the given mode, for applications that do
    /// not implement every mandatory stage natively.
    pub fn fallback_url(&self, mode: AuthenticationMode) -> Result<Url, AuthError> {
        let page = match mode {
            AuthenticationMode::Login => "login",
            AuthenticationMode::Registration => "register",
        };
        let raw = format!(
            "{}/_matrix/static/client/{}/",
            self.client.homeserver_url().as_str().trim_end_matches('/'),
            page
        );
        Url::parse(&raw).map_err(|_| AuthError::InvalidHomeserver)
    }

    /// Materialize a session from credentials obtained through single
    /// sign-on.
    pub fn make_session_from_sso(&self, credentials: CredentialsResponse) -> AccountSession {
        self.session_creator
            .create_session(credentials, self.client.homeserver_url())
    }

    /// Fetch the homeserver's discovery document and cache it on the
    /// current attempt.
    ///
    /// Advisory only: the negotiated endpoint is not rewritten. Callers
    /// wanting to follow the advertised base URL negotiate again with it.
    pub async fn fetch_well_known(&mut self) -> Result<WellKnownResponse, AuthError> {
        if self.pending.is_none() {
            return Err(AuthError::FlowNotNegotiated);
        }

        let response = self.client.get_well_known().await?;

        if let Some(pending) = self.pending.as_mut() {
            pending.well_known = Some(response.clone());
        }

        Ok(response)
    }
}

/// Normalize a user-entered homeserver string into a URL, prepending the
/// secure scheme when none is present.
fn normalize_homeserver_url(homeserver: &str) -> Result<Url, AuthError> {
    let trimmed = homeserver.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&with_scheme).map_err(|_| AuthError::InvalidHomeserver)
}
