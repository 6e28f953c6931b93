//! Error types for license issuing and verification.

use thiserror::Error;

use crate::time::TimeSourceError;

/// Licensing errors.
///
/// Every failure on the verification path is returned to the caller as one
/// of these; nothing is logged and swallowed.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The armored container or the envelope inside it could not be parsed.
    #[error("malformed license: {0}")]
    MalformedLicense(String),

    /// Signature verification failed.
    ///
    /// Carries no detail: corruption and forgery look the same to the caller.
    #[error("license signature invalid")]
    InvalidSignature,

    /// The payload passed signature verification but could not be decoded.
    #[error("malformed license payload: {0}")]
    MalformedPayload(String),

    /// The trusted clock reports the expiration instant has passed.
    #[error("license expired at {expires} (unix seconds)")]
    LicenseExpired {
        /// Expiration instant recorded in the license.
        expires: i64,
    },

    /// The time source could not tell whether the license has expired.
    #[error("could not verify license time: {0}")]
    TimeVerificationFailed(#[from] TimeSourceError),

    /// The private key or the signature primitive failed.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// Generating a key pair failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A PEM key could not be imported or exported.
    #[error("invalid key format: {0}")]
    KeyFormat(String),

    /// An expiration monitor is already running for this license.
    #[error("expiration monitor already started")]
    MonitorAlreadyStarted,

    /// No Tokio runtime is available to run the expiration monitor on.
    #[error("expiration monitor unavailable: {0}")]
    MonitorUnavailable(String),

    /// The license never expires, so there is nothing to monitor.
    #[error("license never expires and cannot be monitored")]
    NotMonitorable,
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
