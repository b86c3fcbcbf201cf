//! Mutable state of one in-flight authentication attempt.

use reqwest::Url;
use uuid::Uuid;

use crate::auth::LoginFlowResult;
use crate::auth::params::{RegisterThreePid, RegistrationParameters};
use crate::client::{TokenResponse, WellKnownResponse};

/// The state accumulated while registering against one homeserver.
///
/// Exactly one of these is live per attempt. It is created when flow
/// negotiation starts and replaced wholesale when negotiation restarts or
/// the attempt is cancelled, so nothing can keep operating on a stale
/// attempt. The wizard borrows it mutably for the duration of each call.
#[derive(Debug)]
pub struct PendingAuthData {
    /// The homeserver this attempt targets. Immutable for the attempt.
    homeserver_url: Url,
    /// Random secret correlating the verification requests of this attempt.
    pub(crate) client_secret: String,
    /// Counter passed to token requests, strictly increasing within the
    /// attempt so the homeserver does not treat retries as replays.
    pub(crate) send_attempt: u32,
    /// The authentication session issued by the homeserver. `Some` exactly
    /// when at least one partial-completion response has been received.
    pub(crate) current_session: Option<String>,
    /// True once username and password were accepted by the homeserver.
    pub(crate) is_registration_started: bool,
    /// The third-party identifier currently awaiting verification, if any.
    pub(crate) current_three_pid_data: Option<ThreePidData>,
    /// The negotiated login flows, kept for later inspection.
    pub(crate) login_flow_result: Option<LoginFlowResult>,
    /// The discovery document, fetched on demand.
    pub(crate) well_known: Option<WellKnownResponse>,
}

impl PendingAuthData {
    /// Create the state for a fresh attempt against `homeserver_url`,
    /// with a new client secret and a zeroed send-attempt counter.
    pub fn new(homeserver_url: Url) -> PendingAuthData {
        PendingAuthData {
            homeserver_url,
            client_secret: Uuid::new_v4().to_string(),
            send_attempt: 0,
            current_session: None,
            is_registration_started: false,
            current_three_pid_data: None,
            login_flow_result: None,
            well_known: None,
        }
    }

    /// The homeserver this attempt targets.
    pub fn homeserver_url(&self) -> &Url {
        &self.homeserver_url
    }

    /// The client secret of this attempt.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// The next send-attempt counter value.
    pub fn send_attempt(&self) -> u32 {
        self.send_attempt
    }

    /// The current authentication session, if the homeserver issued one.
    pub fn current_session(&self) -> Option<&str> {
        self.current_session.as_deref()
    }

    /// True once `create_account` was accepted by the homeserver.
    pub fn is_registration_started(&self) -> bool {
        self.is_registration_started
    }
}

/// A third-party identifier verification in progress.
///
/// Holds everything needed to resend the token, post a received code, and
/// replay the registration request once verification succeeds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ThreePidData {
    /// The identifier as submitted.
    pub three_pid: RegisterThreePid,
    /// The homeserver's answer to the token request.
    pub response: TokenResponse,
    /// The registration parameters to replay after verification.
    pub parameters: RegistrationParameters,
}
