//! Signed, expiring software licenses.
//!
//! The administrator encodes [`LicenseData`] and signs it with an RSA private
//! key; the client verifies the result with the matching public key and asks
//! a trusted [`TimeSource`] whether the license has expired.
//!
//! # License Format
//!
//! ```text
//! -----BEGIN LICENSE-----
//! base64({"data": base64(payload_json), "signature": base64(sig)})
//! -----END LICENSE-----
//! ```
//!
//! `sig` is RSASSA-PSS (SHA-256, random salt) over the SHA-256 digest of the
//! `data` string. The payload carries `expires` (Unix seconds, `0` for never)
//! and an open `additional_data` object.
//!
//! # Example
//!
//! ```no_run
//! use ezlicense::{AdminLicenseProgram, ClientLicenseProgram, Expiry, HttpTimeSource, LicenseData};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let admin = AdminLicenseProgram::new("LICENSE", 2048)?;
//! let license = admin.generate_license(
//!     &LicenseData::new()
//!         .with_expiry(Expiry::At(1_900_000_000))
//!         .with_field("seats", 5),
//! )?;
//!
//! let client = ClientLicenseProgram::new(admin.public_key(), HttpTimeSource::default_source()?)
//!     .on_expire(|data| eprintln!("license expired: {data:?}"));
//! let verified = client.verify_license(&license).await?;
//! assert_eq!(verified.data().get("seats"), Some(&serde_json::json!(5)));
//! # Ok(())
//! # }
//! ```

mod admin;
pub mod armor;
mod client;
pub mod codec;
mod data;
mod error;
mod keys;
mod monitor;
mod signing;
mod time;

pub use admin::AdminLicenseProgram;
pub use armor::DEFAULT_LABEL;
pub use client::{ClientConfig, ClientLicenseProgram, VerifiedLicense};
pub use data::{Expiry, LicenseData, NEVER_EXPIRES, SignedEnvelope};
pub use error::{LicenseError, LicenseResult};
pub use keys::{
    DEFAULT_KEY_BITS, KeyPair, MIN_KEY_BITS, export_private_key, export_public_key,
    generate_key_pair, read_private_key_pem, read_public_key_pem,
};
pub use monitor::{ExpirationMonitor, ExpireCallback, MonitorConfig, MonitorHandle, MonitorOutcome};
pub use time::{
    DEFAULT_TIME_URL, FixedTimeSource, HttpTimeSource, HttpTimeSourceConfig, SystemTimeSource,
    TimeSource, TimeSourceError,
};

/// Re-exported so callers can name key types without depending on `rsa`.
pub use rsa::{RsaPrivateKey, RsaPublicKey};

