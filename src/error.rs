//! Error types surfaced by the authentication engine.
//!
//! Every fallible operation of the crate returns [`AuthError`]. Transport
//! failures keep their original shape and are wrapped transparently, so a
//! caller can always tell a protocol-level refusal from a network problem.

use thiserror::Error;

use crate::client::RestError;

/// Errors produced while negotiating flows or driving a registration attempt.
///
/// Each variant maps to exactly one failure condition; none of them is fatal
/// to the process. A failed call leaves the in-progress attempt unchanged and
/// retryable, the only exception being [`AuthError::InvalidHomeserver`] which
/// is raised before any state exists at all.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The homeserver string could not be turned into a valid URL.
    #[error("the homeserver address is not a valid URL")]
    InvalidHomeserver,

    /// A wizard was requested before the login flow was fetched.
    #[error("the login flow has not been requested for this homeserver")]
    FlowNotNegotiated,

    /// A stage was submitted before the homeserver issued an
    /// authentication session, i.e. before `create_account` was called.
    #[error("account creation has not been started for this attempt")]
    AccountCreationNotStarted,

    /// A resend or validation was attempted with no outstanding
    /// third-party identifier request.
    #[error("no third-party identifier verification is pending")]
    NoPendingThreePid,

    /// The token response for the pending third-party identifier did not
    /// carry the submission URL needed to post a verification code.
    #[error("the homeserver did not provide a verification submit URL")]
    MissingVerificationUrl,

    /// The homeserver rejected the submitted verification code.
    #[error("the verification code was rejected by the homeserver")]
    ThreePidValidationFailure,

    /// A payload could not be encoded or a response could not be decoded.
    #[error("failed to encode or decode an authentication payload")]
    Decoding(#[from] serde_json::Error),

    /// The HTTP layer failed; the underlying error is passed through as is.
    #[error(transparent)]
    Transport(#[from] RestError),
}
