//! The registration wizard: a user-interactive authentication state machine.
//!
//! This module drives account creation against one homeserver, stage by
//! stage, following the server's feedback after each attempt.

use std::time::Duration;

use log::{debug, info};
use reqwest::Method;
use serde_json::Value;
use tokio::time;

use crate::auth::params::{
    AuthenticationParameters, RegisterThreePid, RegistrationParameters, ThreePidCredentials,
    ValidationCodeBody,
};
use crate::auth::pending::{PendingAuthData, ThreePidData};
use crate::auth::session::{AccountSession, SessionCreator};
use crate::auth::stages::{FlowResult, stage_type};
use crate::client::{HomeserverApi, RegisterOutcome};
use crate::error::AuthError;

/// Delay before replaying the registration request once a verification
/// code was accepted, giving the homeserver time to record the validation.
const VALIDATION_REPLAY_DELAY: Duration = Duration::from_secs(3);

/// Terminal outcome of one registration request.
#[derive(Debug)]
pub enum RegistrationResult {
    /// The account exists and a session was materialized.
    Success(AccountSession),
    /// The homeserver expects more stages, described by the flow result.
    FlowResponse(FlowResult),
}

/// Set of methods to be able to create an account on a homeserver.
///
/// Common scenario to register an account successfully:
/// - call [`registration_flow`](RegistrationWizard::registration_flow) to
///   check that the application supports all the mandatory stages,
/// - call [`create_account`](RegistrationWizard::create_account) to start
///   the account creation,
/// - fulfil the missing stages with
///   [`perform_recaptcha`](RegistrationWizard::perform_recaptcha),
///   [`accept_terms`](RegistrationWizard::accept_terms),
///   [`dummy`](RegistrationWizard::dummy) and the three-PID methods.
///
/// The wizard borrows the attempt state mutably, so only one submission can
/// be in flight at a time; a failed call leaves the state untouched and the
/// submission can simply be retried. Dropping the future of an in-flight
/// call before it completes also leaves the state untouched: the state is
/// only written after the homeserver's answer has arrived.
#[derive(Debug)]
pub struct RegistrationWizard<'a, C: HomeserverApi> {
    /// Transport to the homeserver of this attempt.
    client: &'a C,
    /// State of the attempt, owned by the authentication service.
    pending: &'a mut PendingAuthData,
    /// Builder for the final session object.
    session_creator: SessionCreator,
}

impl<'a, C: HomeserverApi> RegistrationWizard<'a, C> {
    /// Create a wizard over an attempt's state.
    pub fn new(client: &'a C, pending: &'a mut PendingAuthData) -> RegistrationWizard<'a, C> {
        RegistrationWizard {
            client,
            pending,
            session_creator: SessionCreator,
        }
    }

    /// True when username and password have been sent successfully to the
    /// homeserver, i.e. [`create_account`](RegistrationWizard::create_account)
    /// has been called and answered.
    pub fn is_registration_started(&self) -> bool {
        self.pending.is_registration_started
    }

    /// The authentication session issued by the homeserver, if any.
    pub fn current_session(&self) -> Option<&str> {
        self.pending.current_session.as_deref()
    }

    /// The third-party identifier currently awaiting verification,
    /// preferring the phone number as formatted by the homeserver.
    pub fn current_three_pid(&self) -> Option<String> {
        let data = self.pending.current_three_pid_data.as_ref()?;
        match &data.three_pid {
            RegisterThreePid::Email(address) => Some(address.clone()),
            RegisterThreePid::Msisdn { number, .. } => Some(
                data.response
                    .formatted_msisdn
                    .clone()
                    .unwrap_or_else(|| number.clone()),
            ),
        }
    }

    /// Ask the homeserver which stages the current registration flow
    /// requires, without submitting any credentials.
    ///
    /// Useful to ensure the application implements every mandatory stage
    /// before starting; if it does not, the caller should fall back to the
    /// web registration page.
    pub async fn registration_flow(&mut self) -> Result<RegistrationResult, AuthError> {
        let parameters = RegistrationParameters::default();
        self.perform_registration_request(parameters, Duration::ZERO)
            .await
    }

    /// Check whether the desired username is available on the homeserver.
    ///
    /// A taken name answers `false`. A name the homeserver considers
    /// malformed or reserved is an error, never a default `true`.
    pub async fn registration_available(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.client.is_username_available(username).await?)
    }

    /// Start the account creation. This is the first request of any
    /// attempt and must precede every stage submission.
    ///
    /// # Arguments
    ///
    /// * `username` - The desired username, e.g. `alice`.
    /// * `password` - The desired password.
    /// * `initial_device_display_name` - Display name for the new device.
    pub async fn create_account(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
        initial_device_display_name: Option<&str>,
    ) -> Result<RegistrationResult, AuthError> {
        info!("start account creation");
        let parameters = RegistrationParameters {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            initial_device_display_name: initial_device_display_name.map(str::to_string),
            ..Default::default()
        };

        let result = self
            .perform_registration_request(parameters, Duration::ZERO)
            .await?;
        self.pending.is_registration_started = true;
        Ok(result)
    }

    /// Perform the `m.login.recaptcha` stage.
    ///
    /// # Arguments
    ///
    /// * `response` - The response token produced by the reCAPTCHA widget.
    pub async fn perform_recaptcha(
        &mut self,
        response: &str,
    ) -> Result<RegistrationResult, AuthError> {
        let session = self.require_session()?;
        let parameters = RegistrationParameters {
            auth: Some(AuthenticationParameters::captcha(
                session,
                response.to_string(),
            )),
            ..Default::default()
        };
        self.perform_registration_request(parameters, Duration::ZERO)
            .await
    }

    /// Perform the `m.login.terms` stage.
    pub async fn accept_terms(&mut self) -> Result<RegistrationResult, AuthError> {
        let session = self.require_session()?;
        let parameters = RegistrationParameters {
            auth: Some(AuthenticationParameters::new(stage_type::TERMS, session)),
            ..Default::default()
        };
        self.perform_registration_request(parameters, Duration::ZERO)
            .await
    }

    /// Perform the `m.login.dummy` stage.
    pub async fn dummy(&mut self) -> Result<RegistrationResult, AuthError> {
        let session = self.require_session()?;
        let parameters = RegistrationParameters {
            auth: Some(AuthenticationParameters::new(stage_type::DUMMY, session)),
            ..Default::default()
        };
        self.perform_registration_request(parameters, Duration::ZERO)
            .await
    }

    /// Perform the `m.login.email.identity` or `m.login.msisdn` stage.
    ///
    /// Any previously pending identifier is discarded. The homeserver sends
    /// a validation email or SMS to the new identifier.
    pub async fn add_three_pid(
        &mut self,
        three_pid: RegisterThreePid,
    ) -> Result<RegistrationResult, AuthError> {
        self.pending.current_three_pid_data = None;
        self.send_three_pid(three_pid).await
    }

    /// Ask the homeserver to send the current verification email or SMS
    /// again.
    pub async fn send_again_three_pid(&mut self) -> Result<RegistrationResult, AuthError> {
        let three_pid = self
            .pending
            .current_three_pid_data
            .as_ref()
            .map(|data| data.three_pid.clone())
            .ok_or(AuthError::NoPendingThreePid)?;
        self.send_three_pid(three_pid).await
    }

    /// Submit the code received by SMS to validate a phone number.
    ///
    /// When the code is correct, the stored registration request is
    /// replayed to complete the stage; when it is not, the attempt stays
    /// where it was and the user can try another code.
    pub async fn validate_three_pid(&mut self, code: &str) -> Result<RegistrationResult, AuthError> {
        let (submit_url, body) = {
            let data = self
                .pending
                .current_three_pid_data
                .as_ref()
                .ok_or(AuthError::NoPendingThreePid)?;
            let submit_url = data
                .response
                .submit_url
                .clone()
                .ok_or(AuthError::MissingVerificationUrl)?;
            let body = ValidationCodeBody {
                client_secret: self.pending.client_secret.clone(),
                session_id: data.response.sid.clone(),
                code: code.to_string(),
            };
            (submit_url, body)
        };

        info!("submit three-pid verification code");
        let payload = serde_json::to_value(&body)?;
        let response = self
            .client
            .raw_request(Method::POST, &submit_url, &payload)
            .await?;

        // The answer is a json object with a single success flag.
        if response.get("success").and_then(Value::as_bool) == Some(true) {
            let parameters = self
                .pending
                .current_three_pid_data
                .as_ref()
                .map(|data| data.parameters.clone())
                .ok_or(AuthError::NoPendingThreePid)?;
            self.perform_registration_request(parameters, VALIDATION_REPLAY_DELAY)
                .await
        } else {
            Err(AuthError::ThreePidValidationFailure)
        }
    }

    /// Poll the homeserver while waiting for the user to click the
    /// validation link in their email.
    ///
    /// Replays the stored registration request after `delay`; returns a
    /// flow response for as long as the email has not been validated, so
    /// callers invoke it repeatedly.
    ///
    /// # Arguments
    ///
    /// * `delay` - How long to wait before sending the request.
    pub async fn check_email_validated(
        &mut self,
        delay: Duration,
    ) -> Result<RegistrationResult, AuthError> {
        let parameters = self
            .pending
            .current_three_pid_data
            .as_ref()
            .map(|data| data.parameters.clone())
            .ok_or(AuthError::NoPendingThreePid)?;

        self.perform_registration_request(parameters, delay).await
    }

    /// The session identifier, or the failure every stage method maps a
    /// missing session to.
    fn require_session(&self) -> Result<String, AuthError> {
        self.pending
            .current_session
            .clone()
            .ok_or(AuthError::AccountCreationNotStarted)
    }

    /// Request a verification token for `three_pid` and perform the
    /// registration request binding it to the current session.
    async fn send_three_pid(
        &mut self,
        three_pid: RegisterThreePid,
    ) -> Result<RegistrationResult, AuthError> {
        let session = self.require_session()?;

        let response = self
            .client
            .request_token(
                &three_pid,
                &self.pending.client_secret,
                self.pending.send_attempt,
            )
            .await?;

        // A served token request consumes the attempt number, whatever
        // happens next. The counter is never reset within an attempt.
        self.pending.send_attempt += 1;

        let credentials = ThreePidCredentials {
            client_secret: self.pending.client_secret.clone(),
            session_id: response.sid.clone(),
        };
        let auth = match &three_pid {
            RegisterThreePid::Email(_) => {
                AuthenticationParameters::email_identity(session, credentials)
            }
            RegisterThreePid::Msisdn { .. } => {
                AuthenticationParameters::msisdn_identity(session, credentials)
            }
        };
        let parameters = RegistrationParameters {
            auth: Some(auth),
            ..Default::default()
        };

        self.pending.current_three_pid_data = Some(ThreePidData {
            three_pid,
            response,
            parameters: parameters.clone(),
        });

        // Send the session id for the first time.
        self.perform_registration_request(parameters, Duration::ZERO)
            .await
    }

    /// The shared submission primitive: optionally wait, post the
    /// registration request, interpret the answer.
    ///
    /// The attempt state is only written after the response has arrived,
    /// and only for a partial completion. A transport or protocol error
    /// changes nothing and the same submission can be retried.
    async fn perform_registration_request(
        &mut self,
        parameters: RegistrationParameters,
        delay: Duration,
    ) -> Result<RegistrationResult, AuthError> {
        if !delay.is_zero() {
            debug!("wait {:?} before the registration request", delay);
            time::sleep(delay).await;
        }

        match self.client.register(&parameters).await? {
            RegisterOutcome::Success(credentials) => {
                info!("registration completed");
                let session = self
                    .session_creator
                    .create_session(credentials, self.client.homeserver_url());
                Ok(RegistrationResult::Success(session))
            }
            RegisterOutcome::IncompleteAuth(response) => {
                debug!("registration flow state -> {}", &response);
                self.pending.current_session = Some(response.session.clone());
                Ok(RegistrationResult::FlowResponse(FlowResult::from_uia_response(&response)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate;
    use reqwest::Url;
    use serde_json::Map;

    use crate::auth::stages::Stage;
    use crate::client::{
        CredentialsResponse, MockHomeserverApi, RestError, TokenResponse, UiaFlow, UiaResponse,
    };

    fn pending() -> PendingAuthData {
        PendingAuthData::new(Url::parse("https://example.org").unwrap())
    }

    fn uia(flows: Vec<Vec<&str>>, completed: Vec<&str>) -> UiaResponse {
        UiaResponse {
            session: "sess1".to_string(),
            flows: flows
                .into_iter()
                .map(|stages| UiaFlow {
                    stages: stages.into_iter().map(str::to_string).collect(),
                })
                .collect(),
            completed: completed.into_iter().map(str::to_string).collect(),
            params: Map::new(),
            errcode: None,
            error: None,
        }
    }

    fn credentials() -> CredentialsResponse {
        CredentialsResponse {
            user_id: "@alice:example.org".to_string(),
            access_token: "syt_token".to_string(),
            device_id: Some("DEVICE".to_string()),
            home_server: None,
        }
    }

    fn homeserver_url() -> Url {
        Url::parse("https://example.org").unwrap()
    }

    #[tokio::test]
    async fn test_create_account_with_partial_completion_stores_session() {
        let mut mock = MockHomeserverApi::new();
        let response = uia(vec![vec!["m.login.email.identity", "m.login.terms"]], vec![]);
        mock.expect_register()
            .withf(|parameters| {
                parameters.username.as_deref() == Some("alice")
                    && parameters.password.as_deref() == Some("secret")
                    && parameters.auth.is_none()
            })
            .times(1)
            .returning(move |_| Ok(RegisterOutcome::IncompleteAuth(response.clone())));

        let mut data = pending();
        {
            let mut wizard = RegistrationWizard::new(&mock, &mut data);
            let result = wizard
                .create_account(Some("alice"), Some("secret"), None)
                .await
                .unwrap();

            match result {
                RegistrationResult::FlowResponse(flow_result) => {
                    assert_eq!(flow_result.missing_stages.len(), 2);
                }
                RegistrationResult::Success(_) => panic!("expected a flow response"),
            }
        }

        assert_eq!(data.current_session(), Some("sess1"));
        assert!(data.is_registration_started());
    }

    #[tokio::test]
    async fn test_create_account_error_leaves_state_untouched() {
        let mut mock = MockHomeserverApi::new();
        mock.expect_register().times(1).returning(|_| {
            Err(RestError::Api {
                status: reqwest::StatusCode::FORBIDDEN,
                errcode: "M_FORBIDDEN".to_string(),
                message: "Registration is disabled".to_string(),
            })
        });

        let mut data = pending();
        {
            let mut wizard = RegistrationWizard::new(&mock, &mut data);
            let error = wizard
                .create_account(Some("alice"), Some("secret"), None)
                .await
                .unwrap_err();
            assert!(matches!(error, AuthError::Transport(_)));
        }

        assert!(data.current_session().is_none());
        assert!(!data.is_registration_started());
    }

    #[tokio::test]
    async fn test_recaptcha_without_account_creation_fails_fast() {
        // No expectation is set: the transport must not be touched.
        let mock = MockHomeserverApi::new();
        let mut data = pending();
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let error = wizard.perform_recaptcha("captcha-answer").await.unwrap_err();

        assert!(matches!(error, AuthError::AccountCreationNotStarted));
    }

    #[tokio::test]
    async fn test_recaptcha_submits_tagged_payload_and_completes() {
        let mut mock = MockHomeserverApi::new();
        mock.expect_register()
            .withf(|parameters| {
                let auth = parameters.auth.as_ref().unwrap();
                auth.kind == "m.login.recaptcha"
                    && auth.session.as_deref() == Some("sess1")
                    && auth.captcha_response.as_deref() == Some("captcha-answer")
            })
            .times(1)
            .returning(|_| Ok(RegisterOutcome::Success(credentials())));
        mock.expect_homeserver_url().return_const(homeserver_url());

        let mut data = pending();
        data.current_session = Some("sess1".to_string());
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        match wizard.perform_recaptcha("captcha-answer").await.unwrap() {
            RegistrationResult::Success(session) => {
                assert_eq!(session.user_id, "@alice:example.org");
                assert_eq!(session.homeserver_url, homeserver_url());
            }
            RegistrationResult::FlowResponse(_) => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn test_accept_terms_and_dummy_require_session() {
        let mock = MockHomeserverApi::new();
        let mut data = pending();
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        assert!(matches!(
            wizard.accept_terms().await.unwrap_err(),
            AuthError::AccountCreationNotStarted
        ));
        assert!(matches!(
            wizard.dummy().await.unwrap_err(),
            AuthError::AccountCreationNotStarted
        ));
    }

    #[tokio::test]
    async fn test_add_three_pid_increments_send_attempt_across_requests() {
        let mut mock = MockHomeserverApi::new();
        let mut sequence = mockall::Sequence::new();

        mock.expect_request_token()
            .withf(|three_pid, _, send_attempt| {
                *send_attempt == 0 && matches!(three_pid, RegisterThreePid::Email(_))
            })
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| {
                Ok(TokenResponse {
                    sid: "sid-0".to_string(),
                    submit_url: None,
                    formatted_msisdn: None,
                })
            });
        mock.expect_register()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| {
                Ok(RegisterOutcome::IncompleteAuth(uia(
                    vec![vec!["m.login.email.identity"]],
                    vec![],
                )))
            });
        mock.expect_request_token()
            .withf(|_, _, send_attempt| *send_attempt == 1)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| {
                Ok(TokenResponse {
                    sid: "sid-1".to_string(),
                    submit_url: None,
                    formatted_msisdn: None,
                })
            });
        mock.expect_register()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| {
                Ok(RegisterOutcome::IncompleteAuth(uia(
                    vec![vec!["m.login.email.identity"]],
                    vec![],
                )))
            });

        let mut data = pending();
        data.current_session = Some("sess1".to_string());
        {
            let mut wizard = RegistrationWizard::new(&mock, &mut data);
            let three_pid = RegisterThreePid::Email("alice@example.org".to_string());
            wizard.add_three_pid(three_pid.clone()).await.unwrap();
            wizard.send_again_three_pid().await.unwrap();
        }

        assert_eq!(data.send_attempt(), 2);
    }

    #[tokio::test]
    async fn test_send_again_three_pid_without_pending_request() {
        let mock = MockHomeserverApi::new();
        let mut data = pending();
        data.current_session = Some("sess1".to_string());
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let error = wizard.send_again_three_pid().await.unwrap_err();

        assert!(matches!(error, AuthError::NoPendingThreePid));
    }

    #[tokio::test]
    async fn test_add_three_pid_stores_replay_parameters() {
        let mut mock = MockHomeserverApi::new();
        mock.expect_request_token().times(1).returning(|_, _, _| {
            Ok(TokenResponse {
                sid: "sms-sid".to_string(),
                submit_url: Some("https://example.org/submit".to_string()),
                formatted_msisdn: Some("+44 7700 900000".to_string()),
            })
        });
        mock.expect_register()
            .withf(|parameters| {
                let auth = parameters.auth.as_ref().unwrap();
                auth.kind == "m.login.msisdn"
                    && auth
                        .three_pid_credentials
                        .as_ref()
                        .is_some_and(|credentials| credentials.session_id == "sms-sid")
            })
            .times(1)
            .returning(|_| {
                Ok(RegisterOutcome::IncompleteAuth(uia(
                    vec![vec!["m.login.msisdn"]],
                    vec![],
                )))
            });

        let mut data = pending();
        data.current_session = Some("sess1".to_string());
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        wizard
            .add_three_pid(RegisterThreePid::Msisdn {
                number: "07700900000".to_string(),
                country_code: "GB".to_string(),
            })
            .await
            .unwrap();

        // The formatted number from the homeserver wins over the input.
        assert_eq!(wizard.current_three_pid().as_deref(), Some("+44 7700 900000"));
    }

    #[tokio::test]
    async fn test_validate_three_pid_rejected_code_does_not_advance() {
        let mut mock = MockHomeserverApi::new();
        mock.expect_raw_request()
            .with(
                predicate::eq(Method::POST),
                predicate::eq("https://example.org/submit"),
                predicate::always(),
            )
            .times(1)
            .returning(|_, _, _| Ok(serde_json::json!({"success": false})));
        // No register expectation: a rejected code must not replay.

        let mut data = pending();
        data.current_session = Some("sess1".to_string());
        data.current_three_pid_data = Some(ThreePidData {
            three_pid: RegisterThreePid::Msisdn {
                number: "07700900000".to_string(),
                country_code: "GB".to_string(),
            },
            response: TokenResponse {
                sid: "sms-sid".to_string(),
                submit_url: Some("https://example.org/submit".to_string()),
                formatted_msisdn: None,
            },
            parameters: RegistrationParameters::default(),
        });
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let error = wizard.validate_three_pid("000000").await.unwrap_err();

        assert!(matches!(error, AuthError::ThreePidValidationFailure));
    }

    #[tokio::test]
    async fn test_validate_three_pid_without_submit_url() {
        let mock = MockHomeserverApi::new();
        let mut data = pending();
        data.current_session = Some("sess1".to_string());
        data.current_three_pid_data = Some(ThreePidData {
            three_pid: RegisterThreePid::Msisdn {
                number: "07700900000".to_string(),
                country_code: "GB".to_string(),
            },
            response: TokenResponse {
                sid: "sms-sid".to_string(),
                submit_url: None,
                formatted_msisdn: None,
            },
            parameters: RegistrationParameters::default(),
        });
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let error = wizard.validate_three_pid("123456").await.unwrap_err();

        assert!(matches!(error, AuthError::MissingVerificationUrl));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_three_pid_accepted_code_replays_parameters() {
        let replay = RegistrationParameters {
            auth: Some(AuthenticationParameters::msisdn_identity(
                "sess1".to_string(),
                ThreePidCredentials {
                    client_secret: "secret".to_string(),
                    session_id: "sms-sid".to_string(),
                },
            )),
            ..Default::default()
        };

        let mut mock = MockHomeserverApi::new();
        mock.expect_raw_request()
            .withf(|method, url, payload| {
                *method == Method::POST
                    && url == "https://example.org/submit"
                    && payload.get("token").and_then(Value::as_str) == Some("123456")
                    && payload.get("sid").and_then(Value::as_str) == Some("sms-sid")
            })
            .times(1)
            .returning(|_, _, _| Ok(serde_json::json!({"success": true})));
        let expected = replay.clone();
        mock.expect_register()
            .withf(move |parameters| *parameters == expected)
            .times(1)
            .returning(|_| Ok(RegisterOutcome::Success(credentials())));
        mock.expect_homeserver_url().return_const(homeserver_url());

        let mut data = pending();
        data.client_secret = "secret".to_string();
        data.current_session = Some("sess1".to_string());
        data.current_three_pid_data = Some(ThreePidData {
            three_pid: RegisterThreePid::Msisdn {
                number: "07700900000".to_string(),
                country_code: "GB".to_string(),
            },
            response: TokenResponse {
                sid: "sms-sid".to_string(),
                submit_url: Some("https://example.org/submit".to_string()),
                formatted_msisdn: None,
            },
            parameters: replay,
        });
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let result = wizard.validate_three_pid("123456").await.unwrap();

        assert!(matches!(result, RegistrationResult::Success(_)));
    }

    #[tokio::test]
    async fn test_check_email_validated_without_pending_request() {
        let mock = MockHomeserverApi::new();
        let mut data = pending();
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let error = wizard
            .check_email_validated(Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::NoPendingThreePid));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_email_validated_replays_after_delay() {
        let replay = RegistrationParameters {
            auth: Some(AuthenticationParameters::email_identity(
                "sess1".to_string(),
                ThreePidCredentials {
                    client_secret: "secret".to_string(),
                    session_id: "email-sid".to_string(),
                },
            )),
            ..Default::default()
        };

        let mut mock = MockHomeserverApi::new();
        let expected = replay.clone();
        mock.expect_register()
            .withf(move |parameters| *parameters == expected)
            .times(1)
            .returning(|_| {
                Ok(RegisterOutcome::IncompleteAuth(uia(
                    vec![vec!["m.login.email.identity"]],
                    vec![],
                )))
            });

        let mut data = pending();
        data.current_session = Some("sess1".to_string());
        data.current_three_pid_data = Some(ThreePidData {
            three_pid: RegisterThreePid::Email("alice@example.org".to_string()),
            response: TokenResponse {
                sid: "email-sid".to_string(),
                submit_url: None,
                formatted_msisdn: None,
            },
            parameters: replay,
        });
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let result = wizard
            .check_email_validated(Duration::from_secs(10))
            .await
            .unwrap();

        assert!(matches!(result, RegistrationResult::FlowResponse(_)));
    }

    #[tokio::test]
    async fn test_registration_flow_sends_empty_parameters() {
        let mut mock = MockHomeserverApi::new();
        mock.expect_register()
            .withf(|parameters| *parameters == RegistrationParameters::default())
            .times(1)
            .returning(|_| {
                Ok(RegisterOutcome::IncompleteAuth(uia(
                    vec![vec!["m.login.dummy"]],
                    vec![],
                )))
            });

        let mut data = pending();
        let mut wizard = RegistrationWizard::new(&mock, &mut data);

        let result = wizard.registration_flow().await.unwrap();

        match result {
            RegistrationResult::FlowResponse(flow_result) => {
                assert_eq!(
                    flow_result.missing_stages,
                    vec![Stage::Dummy { mandatory: true }]
                );
            }
            RegistrationResult::Success(_) => panic!("expected a flow response"),
        }
    }

    #[tokio::test]
    async fn test_registration_available_delegates_to_transport() {
        let mut mock = MockHomeserverApi::new();
        mock.expect_is_username_available()
            .with(predicate::eq("alice"))
            .times(1)
            .returning(|_| Ok(false));

        let mut data = pending();
        let wizard = RegistrationWizard::new(&mock, &mut data);

        assert!(!wizard.registration_available("alice").await.unwrap());
    }
}
