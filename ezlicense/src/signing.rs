//! RSASSA-PSS over the SHA-256 digest of an encoded payload.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::rngs::OsRng;
use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{LicenseError, LicenseResult};

/// Signs the SHA-256 digest of `payload` and returns the base64 signature.
///
/// The PSS salt is drawn from the OS RNG, so signing the same payload twice
/// gives different signatures.
pub(crate) fn sign(key: &RsaPrivateKey, payload: &str) -> LicenseResult<String> {
    let digest = Sha256::digest(payload.as_bytes());
    let signature = key
        .sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), &digest)
        .map_err(|e| LicenseError::SigningFailure(e.to_string()))?;
    Ok(BASE64.encode(signature))
}

/// Checks a base64 signature produced by [`sign`] against `payload`.
///
/// Every failure, including undecodable base64, is `InvalidSignature`.
pub(crate) fn verify(key: &RsaPublicKey, payload: &str, signature: &str) -> LicenseResult<()> {
    let signature = BASE64
        .decode(signature)
        .map_err(|_| LicenseError::InvalidSignature)?;
    let digest = Sha256::digest(payload.as_bytes());
    key.verify(Pss::new::<Sha256>(), &digest, &signature)
        .map_err(|_| LicenseError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 1024).unwrap())
    }

    #[test]
    fn sign_verify_roundtrip() {
        let sig = sign(key(), "hello world").unwrap();
        assert!(verify(&key().to_public_key(), "hello world", &sig).is_ok());
    }

    #[test]
    fn signatures_are_randomized() {
        let a = sign(key(), "same payload").unwrap();
        let b = sign(key(), "same payload").unwrap();
        assert_ne!(a, b);
        assert!(verify(&key().to_public_key(), "same payload", &a).is_ok());
        assert!(verify(&key().to_public_key(), "same payload", &b).is_ok());
    }

    #[test]
    fn wrong_message_fails() {
        let sig = sign(key(), "correct").unwrap();
        assert!(matches!(
            verify(&key().to_public_key(), "wrong", &sig),
            Err(LicenseError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_signature_fails() {
        let public = key().to_public_key();
        assert!(matches!(verify(&public, "x", "!!!"), Err(LicenseError::InvalidSignature)));
        assert!(matches!(verify(&public, "x", "AAAA"), Err(LicenseError::InvalidSignature)));
    }
}
