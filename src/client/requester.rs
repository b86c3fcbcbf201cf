//! HTTP client for the Matrix client-server API.
//!
//! This module provides the [`HomeserverApi`] trait describing the endpoints
//! the authentication engine consumes, and [`RestClient`], the reqwest-backed
//! implementation targeting one homeserver.

use std::time::Duration;

use log::{debug, info};
use mockall::automock;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{LoginParameters, RegisterThreePid, RegistrationParameters};
use crate::client::RestError;
use crate::client::response_structs::{
    CredentialsResponse, LoginFlowsResponse, MatrixErrorBody, RegisterOutcome, TokenResponse,
    UiaResponse, UsernameAvailableResponse, WellKnownResponse,
};

/// Trait over the homeserver endpoints used during authentication.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
/// All request and response bodies are typed; the single exception is
/// [`raw_request`](HomeserverApi::raw_request), which posts to an absolute
/// URL handed out by the homeserver itself (the three-PID code submission
/// endpoint lives outside the client-server API prefix).
#[automock]
pub trait HomeserverApi {
    /// The base URL of the homeserver this client talks to.
    fn homeserver_url(&self) -> &Url;

    /// Fetches the login flows supported by the homeserver.
    async fn get_login_flows(&self) -> Result<LoginFlowsResponse, RestError>;

    /// Fetches the `.well-known/matrix/client` discovery document.
    async fn get_well_known(&self) -> Result<WellKnownResponse, RestError>;

    /// Checks whether a username can still be registered.
    ///
    /// A username already taken answers `false`; a malformed or disallowed
    /// username is an error.
    async fn is_username_available(&self, username: &str) -> Result<bool, RestError>;

    /// Performs one registration request with the accumulated parameters.
    async fn register(
        &self,
        parameters: &RegistrationParameters,
    ) -> Result<RegisterOutcome, RestError>;

    /// Authenticates with a password and returns session credentials.
    async fn login(&self, parameters: &LoginParameters) -> Result<CredentialsResponse, RestError>;

    /// Asks the homeserver to send a verification token to a third-party
    /// identifier (an email or an SMS).
    async fn request_token(
        &self,
        three_pid: &RegisterThreePid,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<TokenResponse, RestError>;

    /// Sends a JSON payload to an absolute URL, outside the client-server
    /// API prefix.
    async fn raw_request(
        &self,
        method: Method,
        url: &str,
        payload: &Value,
    ) -> Result<Value, RestError>;
}

/// HTTP client bound to a single homeserver.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use vestibule::client::{HomeserverApi, RestClient};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), vestibule::client::RestError> {
/// let url = "https://matrix.example.org".parse().unwrap();
/// let client = RestClient::new(url, Duration::from_secs(30))?;
/// let flows = client.get_login_flows().await?;
/// println!("{} flows supported", flows.flows.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RestClient {
    /// Base URL of the homeserver
    homeserver_url: Url,
    /// HTTP client
    client: reqwest::Client,
}

impl RestClient {
    /// Create a new [`RestClient`] for the given homeserver.
    ///
    /// # Arguments
    ///
    /// * `homeserver_url` - The validated base URL of the homeserver.
    /// * `timeout` - Timeout applied to every request.
    pub fn new(homeserver_url: Url, timeout: Duration) -> Result<Self, RestError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(RestClient {
            homeserver_url,
            client,
        })
    }

    /// Build a client-server API URL, `{base}/_matrix/client/v3/{path}`.
    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/_matrix/client/v3/{}",
            self.homeserver_url.as_str().trim_end_matches('/'),
            path
        )
    }

    /// Read a response body, decoding a success into `T` and anything else
    /// into [`RestError::Api`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RestError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(Self::api_error(status, &body))
        }
    }

    /// Turn a non-success body into a [`RestError::Api`].
    fn api_error(status: StatusCode, body: &str) -> RestError {
        let parsed: MatrixErrorBody = serde_json::from_str(body).unwrap_or_default();
        RestError::Api {
            status,
            errcode: parsed.errcode.unwrap_or_else(|| "M_UNKNOWN".to_string()),
            message: parsed.error.unwrap_or_default(),
        }
    }
}

impl HomeserverApi for RestClient {
    fn homeserver_url(&self) -> &Url {
        &self.homeserver_url
    }

    /// Request `GET /login` to list the supported login flows.
    async fn get_login_flows(&self) -> Result<LoginFlowsResponse, RestError> {
        let url = self.api_url("login");
        info!("request supported login flows");
        debug!("request GET {}", &url);

        let response = self.client.get(&url).send().await?;
        let flows: LoginFlowsResponse = Self::decode(response).await?;

        debug!("response from {} -> {:?}", &url, &flows);

        Ok(flows)
    }

    /// Request the `.well-known/matrix/client` discovery document at the
    /// root of the homeserver, outside the API prefix.
    async fn get_well_known(&self) -> Result<WellKnownResponse, RestError> {
        let url = format!(
            "{}/.well-known/matrix/client",
            self.homeserver_url.as_str().trim_end_matches('/')
        );
        info!("request well-known document");
        debug!("request GET {}", &url);

        let response = self.client.get(&url).send().await?;
        let well_known: WellKnownResponse = Self::decode(response).await?;

        debug!("response from {} -> {:?}", &url, &well_known);

        Ok(well_known)
    }

    /// Request `GET /register/available?username={username}`.
    ///
    /// The homeserver reports a taken name with an `M_USER_IN_USE` error
    /// rather than a body, so that answer is folded into `Ok(false)` here.
    /// Malformed names (`M_INVALID_USERNAME`) stay errors.
    async fn is_username_available(&self, username: &str) -> Result<bool, RestError> {
        let url = self.api_url("register/available");
        info!("check username availability");
        debug!("request GET {}?username={}", &url, username);

        let response = self
            .client
            .get(&url)
            .query(&[("username", username)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let parsed: UsernameAvailableResponse = serde_json::from_str(&body)?;
            Ok(parsed.available)
        } else {
            let parsed: MatrixErrorBody = serde_json::from_str(&body).unwrap_or_default();
            match parsed.errcode.as_deref() {
                Some("M_USER_IN_USE") | Some("M_EXCLUSIVE") => Ok(false),
                _ => Err(Self::api_error(status, &body)),
            }
        }
    }

    /// Request `POST /register` with the accumulated parameters.
    ///
    /// A non-success status whose body decodes as a
    /// user-interactive-authentication session is not an error: it is the
    /// homeserver describing the remaining stages and becomes
    /// [`RegisterOutcome::IncompleteAuth`].
    async fn register(
        &self,
        parameters: &RegistrationParameters,
    ) -> Result<RegisterOutcome, RestError> {
        let url = self.api_url("register");
        info!("submit registration request");
        debug!("request POST {}", &url);

        let response = self
            .client
            .post(&url)
            .query(&[("kind", "user")])
            .json(parameters)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let credentials: CredentialsResponse = serde_json::from_str(&body)?;
            debug!("registration completed -> {:?}", &credentials);
            Ok(RegisterOutcome::Success(credentials))
        } else if let Ok(session) = serde_json::from_str::<UiaResponse>(&body) {
            debug!("registration needs more stages -> {}", &session);
            Ok(RegisterOutcome::IncompleteAuth(session))
        } else {
            Err(Self::api_error(status, &body))
        }
    }

    /// Request `POST /login` with password parameters.
    async fn login(&self, parameters: &LoginParameters) -> Result<CredentialsResponse, RestError> {
        let url = self.api_url("login");
        info!("submit login request");
        debug!("request POST {}", &url);

        let response = self.client.post(&url).json(parameters).send().await?;
        let credentials: CredentialsResponse = Self::decode(response).await?;

        debug!("response from {} -> {:?}", &url, &credentials);

        Ok(credentials)
    }

    /// Request `POST /register/email/requestToken` or
    /// `POST /register/msisdn/requestToken` depending on the identifier.
    async fn request_token(
        &self,
        three_pid: &RegisterThreePid,
        client_secret: &str,
        send_attempt: u32,
    ) -> Result<TokenResponse, RestError> {
        let (url, payload) = match three_pid {
            RegisterThreePid::Email(address) => (
                self.api_url("register/email/requestToken"),
                serde_json::json!({
                    "client_secret": client_secret,
                    "email": address,
                    "send_attempt": send_attempt,
                }),
            ),
            RegisterThreePid::Msisdn {
                number,
                country_code,
            } => (
                self.api_url("register/msisdn/requestToken"),
                serde_json::json!({
                    "client_secret": client_secret,
                    "country": country_code,
                    "phone_number": number,
                    "send_attempt": send_attempt,
                }),
            ),
        };

        info!("request verification token, attempt {}", send_attempt);
        debug!("request POST {}", &url);

        let response = self.client.post(&url).json(&payload).send().await?;
        let token: TokenResponse = Self::decode(response).await?;

        debug!("response from {} -> {:?}", &url, &token);

        Ok(token)
    }

    /// Send a JSON payload to an absolute URL.
    ///
    /// Used for the three-PID code submission endpoint, which the
    /// homeserver hands out as a complete URL.
    async fn raw_request(
        &self,
        method: Method,
        url: &str,
        payload: &Value,
    ) -> Result<Value, RestError> {
        debug!("request {} {}", &method, url);

        let response = self
            .client
            .request(method, url)
            .json(payload)
            .send()
            .await?;
        let body: Value = Self::decode(response).await?;

        debug!("response from {} -> {:?}", url, &body);

        Ok(body)
    }
}
