//! Vestibule - an interactive authentication flow engine for Matrix
//! homeservers.
//!
//! This crate negotiates authentication flows with a Matrix homeserver and
//! drives the user-interactive-authentication protocol used to create
//! accounts: password submission, reCAPTCHA, terms of service, the dummy
//! stage, and email or phone verification with polling. A successful run
//! produces an [`auth::AccountSession`] the rest of an application can use.
//!
//! # Overview
//!
//! Registering against a homeserver is not a single request. The server
//! answers each attempt with the set of alternative stage lists it accepts,
//! and the client completes stages one at a time, guided by that feedback,
//! until one list is fully satisfied. This crate models that conversation
//! as a small state machine owned by an [`auth::AuthenticationService`] and
//! driven through an [`auth::RegistrationWizard`].
//!
//! # Architecture
//!
//! The crate consists of four modules:
//!
//! - [`auth`] - Flow negotiation, the registration and login wizards, the
//!   stage model and the progress-reporting flow driver
//! - [`client`] - The homeserver HTTP transport and its wire types
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`error`] - The crate error taxonomy
//!
//! # Examples
//!
//! ```no_run
//! use vestibule::auth::{AuthenticationService, RegistrationResult};
//! use vestibule::config::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), vestibule::error::AuthError> {
//! let mut service = AuthenticationService::new(&Config::default())?;
//!
//! // Learn what the homeserver supports.
//! let flows = service.login_flow("example.org").await?;
//! println!("negotiated {}", flows.homeserver_url);
//!
//! // Start an account creation; the homeserver answers with the stages
//! // still missing, e.g. an email confirmation or a captcha.
//! let mut wizard = service.registration_wizard()?;
//! match wizard.create_account(Some("alice"), Some("secret"), None).await? {
//!     RegistrationResult::Success(session) => {
//!         println!("registered as {}", session.user_id);
//!     }
//!     RegistrationResult::FlowResponse(flow_result) => {
//!         for stage in &flow_result.missing_stages {
//!             println!("missing stage: {}", stage.kind());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The crate logs through the `log` facade: operations at `info`, request
//! and response details at `debug`. Access tokens never appear in log
//! output. Initializing a logger is left to the consuming application.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;

pub use crate::auth::AuthenticationService;
pub use crate::config::Config;
pub use crate::error::AuthError;
