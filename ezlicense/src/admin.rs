//! Administrator side: turning license data into a signed, armored license.

use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::info;

use crate::armor::{self, DEFAULT_LABEL};
use crate::codec;
use crate::data::{Expiry, LicenseData, NEVER_EXPIRES, SignedEnvelope};
use crate::error::{LicenseError, LicenseResult};
use crate::keys::{self, KeyPair};
use crate::signing;

/// Issues licenses signed with one private key.
#[derive(Clone)]
pub struct AdminLicenseProgram {
    private_key: RsaPrivateKey,
    label: String,
}

impl AdminLicenseProgram {
    /// Creates a program around a freshly generated key pair.
    ///
    /// An empty `label` selects [`DEFAULT_LABEL`].
    pub fn new(label: &str, key_bits: usize) -> LicenseResult<Self> {
        let KeyPair { private_key, .. } = keys::generate_key_pair(key_bits)?;
        Ok(Self::load(private_key, label))
    }

    /// Creates a program around an existing private key.
    #[must_use]
    pub fn load(private_key: RsaPrivateKey, label: &str) -> Self {
        let label = if label.is_empty() { DEFAULT_LABEL } else { label };
        Self {
            private_key,
            label: label.to_string(),
        }
    }

    /// Creates a program from a PEM-encoded private key.
    pub fn from_pem(private_key_pem: &str, label: &str) -> LicenseResult<Self> {
        let private_key = keys::read_private_key_pem(private_key_pem)?;
        Ok(Self::load(private_key, label))
    }

    /// Returns the armor label put on issued licenses.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the private key.
    #[must_use]
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Returns the public key clients verify against.
    #[must_use]
    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// Signs `data` and returns the armored license text.
    ///
    /// # Errors
    ///
    /// Returns `SigningFailure` if the label cannot be armored, the expiry is
    /// `At` the never-expires sentinel, or the signature primitive fails.
    pub fn generate_license(&self, data: &LicenseData) -> LicenseResult<String> {
        if !armor::is_valid_label(&self.label) {
            return Err(LicenseError::SigningFailure(format!(
                "label {:?} cannot be used on an armor line",
                self.label
            )));
        }

        // On the wire this would read back as a perpetual license.
        if data.expires == Expiry::At(NEVER_EXPIRES) {
            return Err(LicenseError::SigningFailure(format!(
                "expiry {NEVER_EXPIRES} is reserved for licenses that never expire"
            )));
        }

        let encoded = codec::encode(data)?;
        let signature = signing::sign(&self.private_key, &encoded)?;
        let envelope = SignedEnvelope {
            data: encoded,
            signature,
        };
        let envelope = serde_json::to_vec(&envelope)
            .map_err(|e| LicenseError::SigningFailure(format!("cannot serialize envelope: {e}")))?;

        info!(
            label = %self.label,
            expires = data.expires.as_unix(),
            fields = data.additional_data.len(),
            "issued license"
        );
        Ok(armor::wrap(&self.label, &envelope))
    }
}

impl std::fmt::Debug for AdminLicenseProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminLicenseProgram")
            .field("private_key", &"[REDACTED]")
            .field("label", &self.label)
            .finish()
    }
}
