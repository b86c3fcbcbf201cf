//! Step execution with progress reporting and automatic dummy stage.
//!
//! UI layers drive a registration one step at a time and want loading
//! indicators plus a single stream of outcomes. [`FlowDriver`] wraps wizard
//! calls for them: each submitted [`RegistrationStep`] is bracketed with
//! loading updates, flow responses are forwarded as the stages still
//! missing, and a mandatory `m.login.dummy` stage is completed on the spot
//! once account creation has happened, since it carries nothing a user
//! could act on.

use std::time::Duration;

use log::debug;

use crate::auth::params::RegisterThreePid;
use crate::auth::session::AccountSession;
use crate::auth::stages::{FlowResult, Stage};
use crate::auth::wizard::{RegistrationResult, RegistrationWizard};
use crate::client::HomeserverApi;
use crate::error::AuthError;

/// One user-initiated registration operation.
///
/// Steps are plain data so UI layers can queue and serialize them without
/// borrowing the wizard themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationStep {
    /// Probe which stages the homeserver requires.
    RegistrationFlow,
    /// Start the account creation.
    CreateAccount {
        /// The desired username.
        username: Option<String>,
        /// The desired password.
        password: Option<String>,
        /// Display name for the new device.
        initial_device_display_name: Option<String>,
    },
    /// Submit a reCAPTCHA response token.
    ReCaptcha {
        /// The response token produced by the widget.
        response: String,
    },
    /// Accept the homeserver's terms of service.
    AcceptTerms,
    /// Submit the dummy stage.
    Dummy,
    /// Start verification of a third-party identifier.
    AddThreePid(RegisterThreePid),
    /// Resend the current verification email or SMS.
    SendAgainThreePid,
    /// Submit a verification code received by SMS.
    ValidateThreePid {
        /// The received code.
        code: String,
    },
    /// Poll for the email validation link having been clicked.
    CheckEmailValidated {
        /// How long to wait before polling.
        delay: Duration,
    },
}

/// Progress events emitted while executing a step.
#[derive(Debug)]
pub enum RegistrationUpdate {
    /// A step started; show a loading indicator.
    StartLoading,
    /// The step finished, successfully or not; hide the indicator.
    StopLoading,
    /// The homeserver still expects the contained stages.
    MissingStages(FlowResult),
    /// Registration completed and a session is available.
    SessionCreated {
        /// The materialized session.
        session: AccountSession,
        /// Whether the session comes from a freshly created account.
        is_new_account: bool,
    },
}

/// Executes registration steps and reports progress through a callback.
///
/// Both the driver and the wizard are borrowed mutably for the duration of
/// one step, so two submissions against the same attempt cannot overlap.
/// Dropping the returned future cancels the step: no update is emitted for
/// it and the attempt state stays as the last completed response left it —
/// after a cancelled automatic dummy submission the dummy stage may still
/// be reported missing, which callers must tolerate.
pub struct FlowDriver<F: FnMut(RegistrationUpdate)> {
    /// Callback receiving progress updates.
    on_update: F,
}

impl<F: FnMut(RegistrationUpdate)> FlowDriver<F> {
    /// Create a driver reporting progress to `on_update`.
    pub fn new(on_update: F) -> FlowDriver<F> {
        FlowDriver { on_update }
    }

    /// Execute one step against the wizard.
    ///
    /// Emits [`RegistrationUpdate::StartLoading`], then the step's outcome
    /// as [`RegistrationUpdate::SessionCreated`] or
    /// [`RegistrationUpdate::MissingStages`], then
    /// [`RegistrationUpdate::StopLoading`]. On failure the error is
    /// returned after the loading bracket closes, including a failure of
    /// the automatic dummy submission.
    pub async fn submit<C: HomeserverApi>(
        &mut self,
        wizard: &mut RegistrationWizard<'_, C>,
        step: RegistrationStep,
    ) -> Result<(), AuthError> {
        (self.on_update)(RegistrationUpdate::StartLoading);

        let outcome = self.run(wizard, step).await;
        let outcome = match outcome {
            Ok(update) => {
                (self.on_update)(update);
                Ok(())
            }
            Err(error) => Err(error),
        };

        (self.on_update)(RegistrationUpdate::StopLoading);
        outcome
    }

    /// Dispatch the step and fold its result into a progress update.
    async fn run<C: HomeserverApi>(
        &mut self,
        wizard: &mut RegistrationWizard<'_, C>,
        step: RegistrationStep,
    ) -> Result<RegistrationUpdate, AuthError> {
        let result = Self::dispatch(wizard, step).await?;

        match result {
            RegistrationResult::Success(session) => Ok(RegistrationUpdate::SessionCreated {
                session,
                is_new_account: true,
            }),
            RegistrationResult::FlowResponse(flow_result) => {
                self.process_flow_response(wizard, flow_result).await
            }
        }
    }

    /// Forward a flow response, completing a mandatory dummy stage first
    /// when account creation already happened.
    async fn process_flow_response<C: HomeserverApi>(
        &mut self,
        wizard: &mut RegistrationWizard<'_, C>,
        flow_result: FlowResult,
    ) -> Result<RegistrationUpdate, AuthError> {
        let dummy_is_mandatory = flow_result
            .missing_stages
            .iter()
            .any(|stage| matches!(stage, Stage::Dummy { mandatory: true }));

        if wizard.is_registration_started() && dummy_is_mandatory {
            debug!("complete the mandatory dummy stage automatically");
            match wizard.dummy().await? {
                RegistrationResult::Success(session) => Ok(RegistrationUpdate::SessionCreated {
                    session,
                    is_new_account: true,
                }),
                RegistrationResult::FlowResponse(flow_result) => {
                    Ok(RegistrationUpdate::MissingStages(flow_result))
                }
            }
        } else {
            Ok(RegistrationUpdate::MissingStages(flow_result))
        }
    }

    /// Map a step to the wizard call implementing it.
    async fn dispatch<C: HomeserverApi>(
        wizard: &mut RegistrationWizard<'_, C>,
        step: RegistrationStep,
    ) -> Result<RegistrationResult, AuthError> {
        match step {
            RegistrationStep::RegistrationFlow => wizard.registration_flow().await,
            RegistrationStep::CreateAccount {
                username,
                password,
                initial_device_display_name,
            } => {
                wizard
                    .create_account(
                        username.as_deref(),
                        password.as_deref(),
                        initial_device_display_name.as_deref(),
                    )
                    .await
            }
            RegistrationStep::ReCaptcha { response } => {
                wizard.perform_recaptcha(&response).await
            }
            RegistrationStep::AcceptTerms => wizard.accept_terms().await,
            RegistrationStep::Dummy => wizard.dummy().await,
            RegistrationStep::AddThreePid(three_pid) => wizard.add_three_pid(three_pid).await,
            RegistrationStep::SendAgainThreePid => wizard.send_again_three_pid().await,
            RegistrationStep::ValidateThreePid { code } => {
                wizard.validate_three_pid(&code).await
            }
            RegistrationStep::CheckEmailValidated { delay } => {
                wizard.check_email_validated(delay).await
            }
        }
    }
}
