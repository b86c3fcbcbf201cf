//! Authentication engine for Matrix homeservers.
//!
//! This module implements the account registration and login flows on top
//! of the transport in [`crate::client`]:
//!
//! - **Negotiation**: [`AuthenticationService`] resolves a homeserver and
//!   fetches its supported login flows.
//! - **Registration**: [`RegistrationWizard`] drives the
//!   user-interactive-authentication stages (password, reCAPTCHA, terms,
//!   dummy, email and phone verification) until the homeserver grants a
//!   session.
//! - **Login**: [`LoginWizard`] performs a password login.
//! - **Progress**: [`FlowDriver`] wraps wizard calls for UI layers,
//!   emitting loading and outcome events and completing a mandatory dummy
//!   stage automatically.
//!
//! # Examples
//!
//! ```no_run
//! use vestibule::auth::AuthenticationService;
//! use vestibule::config::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), vestibule::error::AuthError> {
//! let mut service = AuthenticationService::new(&Config::default())?;
//! let flows = service.login_flow("example.org").await?;
//!
//! for provider in &flows.sso_identity_providers {
//!     println!("SSO provider: {}", provider.name);
//! }
//! # Ok(())
//! # }
//! ```

mod driver;
mod login;
mod params;
mod pending;
mod service;
mod session;
mod stages;
mod wizard;

pub use crate::auth::driver::{FlowDriver, RegistrationStep, RegistrationUpdate};
pub use crate::auth::login::LoginWizard;
pub use crate::auth::params::{
    AuthenticationParameters, LoginParameters, RegisterThreePid, RegistrationParameters,
    ThreePidCredentials, UserIdentifier, ValidationCodeBody,
};
pub use crate::auth::pending::PendingAuthData;
pub use crate::auth::service::AuthenticationService;
pub use crate::auth::session::{AccountSession, SessionCreator};
pub use crate::auth::stages::{FlowResult, Stage, TermPolicies, stage_type};
pub use crate::auth::wizard::{RegistrationResult, RegistrationWizard};

use reqwest::Url;

use crate::client::IdentityProvider;

/// Whether an operation targets login or registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMode {
    /// Logging into an existing account.
    Login,
    /// Creating a new account.
    Registration,
}

/// Outcome of a flow negotiation with a homeserver.
#[derive(Debug, Clone)]
pub struct LoginFlowResult {
    /// The normalized homeserver URL the flows were fetched from.
    pub homeserver_url: Url,
    /// Raw flow type identifiers, in the homeserver's order.
    pub supported_flows: Vec<String>,
    /// SSO identity providers, sorted by display name.
    pub sso_identity_providers: Vec<SsoIdentityProvider>,
}

/// An SSO identity provider offered as a login alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoIdentityProvider {
    /// Identifier used for the SSO web redirection,
    /// `/login/sso/redirect/{id}`.
    pub id: String,
    /// Human readable name intended to be shown to the user.
    pub name: String,
    /// Optional brand, letting a client style the login button.
    pub brand: Option<String>,
    /// Optional URL to an icon representing the provider.
    pub icon_url: Option<String>,
}

impl From<&IdentityProvider> for SsoIdentityProvider {
    fn from(provider: &IdentityProvider) -> SsoIdentityProvider {
        SsoIdentityProvider {
            id: provider.id.clone(),
            name: provider.name.clone(),
            brand: provider.brand.clone(),
            icon_url: provider.icon_url.clone(),
        }
    }
}
