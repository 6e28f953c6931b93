//! Payload codec: `LicenseData` <-> base64(JSON).

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::data::LicenseData;
use crate::error::{LicenseError, LicenseResult};

/// Serializes license data to JSON and base64-encodes it.
pub fn encode(data: &LicenseData) -> LicenseResult<String> {
    let json = serde_json::to_vec(data)
        .map_err(|e| LicenseError::MalformedPayload(format!("cannot serialize payload: {e}")))?;
    Ok(BASE64.encode(json))
}

/// Inverse of [`encode`].
///
/// Unknown top-level fields are ignored. A missing or non-integer `expires`
/// is an error.
pub fn decode(encoded: &str) -> LicenseResult<LicenseData> {
    let json = BASE64
        .decode(encoded)
        .map_err(|e| LicenseError::MalformedPayload(format!("invalid payload base64: {e}")))?;
    serde_json::from_slice(&json)
        .map_err(|e| LicenseError::MalformedPayload(format!("invalid payload JSON: {e}")))
}
