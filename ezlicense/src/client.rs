//! Client side: verifying an armored license and watching it for expiry.

use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::armor;
use crate::codec;
use crate::data::{LicenseData, SignedEnvelope};
use crate::error::{LicenseError, LicenseResult};
use crate::keys;
use crate::monitor::{ExpirationMonitor, ExpireCallback, MonitorConfig, MonitorHandle};
use crate::signing;
use crate::time::TimeSource;

/// Client-side verification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Armor label licenses must carry. `None` accepts any label.
    pub expected_label: Option<String>,
    /// Settings for the expiration monitor.
    pub monitor: MonitorConfig,
}

/// Verifies licenses issued by one administrator key.
pub struct ClientLicenseProgram {
    public_key: RsaPublicKey,
    time_source: Arc<dyn TimeSource>,
    config: ClientConfig,
    on_expire: Option<ExpireCallback>,
}

impl ClientLicenseProgram {
    /// Creates a program with default settings and no expiry callback.
    pub fn new(public_key: RsaPublicKey, time_source: impl TimeSource + 'static) -> Self {
        Self {
            public_key,
            time_source: Arc::new(time_source),
            config: ClientConfig::default(),
            on_expire: None,
        }
    }

    /// Creates a program from a PEM-encoded public key.
    pub fn from_pem(public_key_pem: &str, time_source: impl TimeSource + 'static) -> LicenseResult<Self> {
        let public_key = keys::read_public_key_pem(public_key_pem)?;
        Ok(Self::new(public_key, time_source))
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers the callback run when a verified license later expires.
    ///
    /// With a callback set, every successful verification of an expiring
    /// license starts an expiration monitor.
    #[must_use]
    pub fn on_expire<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LicenseData) + Send + Sync + 'static,
    {
        self.on_expire = Some(Arc::new(callback));
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the issuer's public key.
    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Checks the armor, signature and payload of `license` without
    /// consulting the time source.
    ///
    /// Nothing from the payload is looked at until the signature has been
    /// verified.
    pub fn verify_signature(&self, license: &str) -> LicenseResult<LicenseData> {
        let armored = armor::unwrap(license)?;
        if let Some(expected) = &self.config.expected_label {
            if armored.label != *expected {
                return Err(LicenseError::MalformedLicense(format!(
                    "unexpected label {:?}",
                    armored.label
                )));
            }
        }

        let envelope: SignedEnvelope = serde_json::from_slice(&armored.body)
            .map_err(|e| LicenseError::MalformedLicense(format!("invalid envelope: {e}")))?;
        signing::verify(&self.public_key, &envelope.data, &envelope.signature)?;
        codec::decode(&envelope.data)
    }

    /// Verifies `license` and checks it has not expired.
    ///
    /// A perpetual license is returned without asking the time source. If an
    /// expiry callback is registered and the license expires, an expiration
    /// monitor is started and owned by the returned [`VerifiedLicense`].
    ///
    /// # Errors
    ///
    /// `MalformedLicense`, `InvalidSignature` or `MalformedPayload` from
    /// [`verify_signature`](Self::verify_signature); `LicenseExpired` if the
    /// time source says the expiry has passed; `TimeVerificationFailed` if
    /// the time source could not answer; `MonitorUnavailable` if a monitor
    /// is due but the future is not polled inside a Tokio runtime.
    pub async fn verify_license(&self, license: &str) -> LicenseResult<VerifiedLicense> {
        let data = self.verify_signature(license)?;

        let mut verified = VerifiedLicense {
            data,
            time_source: Arc::clone(&self.time_source),
            monitor_config: self.config.monitor.clone(),
            monitor: None,
        };

        let Some(expires) = verified.data.expires.instant() else {
            debug!("license never expires, skipping time check");
            return Ok(verified);
        };

        if self.time_source.has_passed(expires).await? {
            info!(expires, "license rejected as expired");
            return Err(LicenseError::LicenseExpired { expires });
        }

        if let Some(callback) = &self.on_expire {
            verified.spawn_monitor(Arc::clone(callback))?;
        }
        info!(expires, monitored = verified.is_monitored(), "license verified");
        Ok(verified)
    }
}

impl fmt::Debug for ClientLicenseProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientLicenseProgram")
            .field("public_key", &self.public_key)
            .field("config", &self.config)
            .field("on_expire", &self.on_expire.is_some())
            .finish_non_exhaustive()
    }
}

/// A license that passed verification.
///
/// Owns the expiration monitor, if one was started. Dropping the verified
/// license stops its monitor.
pub struct VerifiedLicense {
    data: LicenseData,
    time_source: Arc<dyn TimeSource>,
    monitor_config: MonitorConfig,
    monitor: Option<MonitorHandle>,
}

impl VerifiedLicense {
    /// Returns the decoded license data.
    #[must_use]
    pub fn data(&self) -> &LicenseData {
        &self.data
    }

    /// Returns the monitor handle, if a monitor was ever started.
    #[must_use]
    pub fn monitor(&self) -> Option<&MonitorHandle> {
        self.monitor.as_ref()
    }

    /// Returns true while a monitor is running for this license.
    #[must_use]
    pub fn is_monitored(&self) -> bool {
        self.monitor
            .as_ref()
            .is_some_and(|m| !m.is_cancelled() && !m.is_finished())
    }

    /// Starts the expiration monitor with `callback`.
    ///
    /// # Errors
    ///
    /// `MonitorAlreadyStarted` if a monitor was started before, even one that
    /// has since stopped; `NotMonitorable` if the license never expires.
    pub fn start_monitor<F>(&mut self, callback: F) -> LicenseResult<()>
    where
        F: Fn(&LicenseData) + Send + Sync + 'static,
    {
        self.spawn_monitor(Arc::new(callback))
    }

    fn spawn_monitor(&mut self, callback: ExpireCallback) -> LicenseResult<()> {
        if self.monitor.is_some() {
            return Err(LicenseError::MonitorAlreadyStarted);
        }
        let handle = ExpirationMonitor::spawn(
            self.data.clone(),
            Arc::clone(&self.time_source),
            &self.monitor_config,
            callback,
        )?;
        self.monitor = Some(handle);
        Ok(())
    }

    /// Stops the monitor without running its callback.
    pub fn stop_monitor(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.cancel();
        }
    }

    /// Splits into the data and the monitor handle.
    ///
    /// The monitor keeps running for as long as the handle is held.
    #[must_use]
    pub fn into_parts(self) -> (LicenseData, Option<MonitorHandle>) {
        (self.data, self.monitor)
    }
}

impl fmt::Debug for VerifiedLicense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedLicense")
            .field("data", &self.data)
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}
