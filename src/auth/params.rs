//! Request parameter structures for registration and login.
//!
//! These structures serialize into the JSON bodies the homeserver expects.
//! Field names follow the wire format; the few places where the wire name
//! differs from the Rust name carry an explicit rename.

use serde::{Deserialize, Serialize};

use crate::auth::stages::stage_type;

/// A third-party identifier submitted for verification during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterThreePid {
    /// An email address. The homeserver mails a validation link.
    Email(String),
    /// A phone number with its ISO 3166-1 country code. The homeserver
    /// texts a validation code.
    Msisdn {
        /// The phone number as entered by the user.
        number: String,
        /// Two-letter country code used to interpret the number.
        country_code: String,
    },
}

/// Credentials tying a verification session to the current attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreePidCredentials {
    /// The client-generated secret of the attempt.
    pub client_secret: String,
    /// The verification session issued by the token request.
    #[serde(rename = "sid")]
    pub session_id: String,
}

/// The `auth` object of a registration request, tagged by stage type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticationParameters {
    /// The stage type being satisfied, e.g. `m.login.recaptcha`.
    #[serde(rename = "type")]
    pub kind: String,

    /// The current authentication session, absent only for flows that run
    /// outside a session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,

    /// Parameter for the `m.login.recaptcha` stage.
    #[serde(rename = "response", skip_serializing_if = "Option::is_none")]
    pub captcha_response: Option<String>,

    /// Parameter for the `m.login.email.identity` and `m.login.msisdn`
    /// stages.
    #[serde(rename = "threepid_creds", skip_serializing_if = "Option::is_none")]
    pub three_pid_credentials: Option<ThreePidCredentials>,
}

impl AuthenticationParameters {
    /// Parameters for a stage that only needs its type and the session,
    /// such as `m.login.terms` or `m.login.dummy`.
    pub fn new(kind: &str, session: String) -> AuthenticationParameters {
        AuthenticationParameters {
            kind: kind.to_string(),
            session: Some(session),
            captcha_response: None,
            three_pid_credentials: None,
        }
    }

    /// Parameters for the `m.login.recaptcha` stage.
    pub fn captcha(session: String, captcha_response: String) -> AuthenticationParameters {
        AuthenticationParameters {
            kind: stage_type::RECAPTCHA.to_string(),
            session: Some(session),
            captcha_response: Some(captcha_response),
            three_pid_credentials: None,
        }
    }

    /// Parameters for the `m.login.email.identity` stage.
    pub fn email_identity(
        session: String,
        credentials: ThreePidCredentials,
    ) -> AuthenticationParameters {
        AuthenticationParameters {
            kind: stage_type::EMAIL_IDENTITY.to_string(),
            session: Some(session),
            captcha_response: None,
            three_pid_credentials: Some(credentials),
        }
    }

    /// Parameters for the `m.login.msisdn` stage.
    pub fn msisdn_identity(
        session: String,
        credentials: ThreePidCredentials,
    ) -> AuthenticationParameters {
        AuthenticationParameters {
            kind: stage_type::MSISDN.to_string(),
            session: Some(session),
            captcha_response: None,
            three_pid_credentials: Some(credentials),
        }
    }
}

/// Body of a `POST /register` request.
///
/// Every field is optional: the very first request of an attempt is empty on
/// purpose, which makes the homeserver answer with the stages it requires.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistrationParameters {
    /// Authentication parameters for the stage being satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthenticationParameters>,

    /// The desired account username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// The desired account password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Display name for the device created alongside the account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_device_display_name: Option<String>,

    /// Tells the homeserver that this client can handle the msisdn flow,
    /// keeping older clients out of the web fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_show_msisdn: Option<bool>,
}

/// Body posted to a three-PID submission URL to validate a received code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationCodeBody {
    /// The client-generated secret of the attempt.
    pub client_secret: String,
    /// The verification session the code belongs to.
    #[serde(rename = "sid")]
    pub session_id: String,
    /// The code the user received.
    #[serde(rename = "token")]
    pub code: String,
}

/// Body of a `POST /login` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginParameters {
    /// The login flow type, `m.login.password` here.
    #[serde(rename = "type")]
    pub kind: String,
    /// Who is logging in.
    pub identifier: UserIdentifier,
    /// The account password.
    pub password: String,
    /// Display name for the device created by this login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_device_display_name: Option<String>,
}

impl LoginParameters {
    /// Password login parameters for a user identifier or localpart.
    pub fn password(
        user: &str,
        password: &str,
        initial_device_display_name: Option<&str>,
    ) -> LoginParameters {
        LoginParameters {
            kind: stage_type::PASSWORD.to_string(),
            identifier: UserIdentifier::User {
                user: user.to_string(),
            },
            password: password.to_string(),
            initial_device_display_name: initial_device_display_name.map(str::to_string),
        }
    }
}

/// Identifier of the account a login refers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum UserIdentifier {
    /// A Matrix user ID or localpart.
    #[serde(rename = "m.id.user")]
    User {
        /// The user ID or localpart.
        user: String,
    },

    /// A third-party identifier bound to the account.
    #[serde(rename = "m.id.thirdparty")]
    ThirdParty {
        /// The identifier medium, `email` or `msisdn`.
        medium: String,
        /// The identifier address.
        address: String,
    },

    /// A phone number bound to the account.
    #[serde(rename = "m.id.phone")]
    Phone {
        /// Two-letter country code.
        country: String,
        /// The phone number.
        phone: String,
    },
}
