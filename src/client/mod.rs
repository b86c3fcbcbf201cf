//! HTTP transport for the Matrix client-server API.
//!
//! This module owns every network interaction of the crate. The surface is
//! the [`HomeserverApi`] trait, which abstracts the handful of client-server
//! endpoints the authentication engine needs, and [`RestClient`], its
//! reqwest-backed implementation.
//!
//! # Modules
//!
//! - `requester` - The [`HomeserverApi`] trait and the [`RestClient`] implementation
//! - `response_structs` - Deserialized wire types for the consumed endpoints
//!
//! The trait exists so the engine can be exercised against
//! [`MockHomeserverApi`] in tests while the real client is tested against a
//! local mock server.

mod requester;
mod response_structs;

pub use crate::client::requester::{HomeserverApi, MockHomeserverApi, RestClient};
pub use crate::client::response_structs::{
    CredentialsResponse, IdentityProvider, LoginFlow, LoginFlowsResponse, MatrixErrorBody,
    RegisterOutcome, TokenResponse, UiaFlow, UiaResponse, UsernameAvailableResponse,
    WellKnownEntry, WellKnownResponse,
};

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the homeserver transport.
///
/// # Variants
///
/// * `Http` - The request never completed (connection, TLS, timeout); the
///   reqwest error is kept intact.
/// * `Api` - The homeserver answered with a standard `{errcode, error}` body.
/// * `Decoding` - The response body did not match the expected shape.
#[derive(Debug, Error)]
pub enum RestError {
    /// Failure at the HTTP layer, before any body could be interpreted.
    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    /// A structured error answer from the homeserver.
    #[error("homeserver returned {errcode}: {message} (status {status})")]
    Api {
        /// HTTP status of the response.
        status: StatusCode,
        /// Matrix error code, `M_UNKNOWN` when the body carried none.
        errcode: String,
        /// Human readable message from the homeserver, possibly empty.
        message: String,
    },

    /// The response body could not be parsed into the expected structure.
    #[error("failed to decode homeserver response")]
    Decoding(#[from] serde_json::Error),
}
