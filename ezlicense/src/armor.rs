//! PEM-style armor around the serialized envelope.
//!
//! ```text
//! -----BEGIN LICENSE-----
//! eyJkYXRhIjoi...
//! -----END LICENSE-----
//! ```

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::{LicenseError, LicenseResult};

/// Label used when the administrator does not pick one.
pub const DEFAULT_LABEL: &str = "LICENSE";

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";
const LINE_WIDTH: usize = 64;

/// An unwrapped armor block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Armored {
    /// Label found on the BEGIN/END lines.
    pub label: String,
    /// Decoded body bytes.
    pub body: Vec<u8>,
}

/// Returns true if `label` can appear on a BEGIN/END line and be read back.
#[must_use]
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && !label.contains(DASHES)
        && label.chars().all(|c| c.is_ascii_graphic() || c == ' ')
}

/// Wraps `body` in a labeled block with 64-column base64 lines.
#[must_use]
pub fn wrap(label: &str, body: &[u8]) -> String {
    let encoded = BASE64.encode(body);
    let lines = encoded.len().div_ceil(LINE_WIDTH);
    let mut out = String::with_capacity(encoded.len() + lines + 2 * label.len() + 40);
    out.push_str(BEGIN);
    out.push_str(label);
    out.push_str(DASHES);
    out.push('\n');
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.extend(line.iter().map(|&b| char::from(b)));
        out.push('\n');
    }
    out.push_str(END);
    out.push_str(label);
    out.push_str(DASHES);
    out.push('\n');
    out
}

/// Finds the first labeled block in `text` and decodes its body.
///
/// Text before the BEGIN line and after the END line is ignored, as is any
/// whitespace inside the body. The label is everything between `BEGIN ` and
/// the trailing dashes of its line, so it may itself end in `-`. The END
/// label must match the BEGIN label.
pub fn unwrap(text: &str) -> LicenseResult<Armored> {
    let start = text
        .find(BEGIN)
        .ok_or_else(|| malformed("missing BEGIN line"))?;
    let after_begin = &text[start + BEGIN.len()..];

    let line_len = after_begin.find(['\r', '\n']).unwrap_or(after_begin.len());
    let label = after_begin[..line_len]
        .trim_end()
        .strip_suffix(DASHES)
        .ok_or_else(|| malformed("unterminated BEGIN line"))?;

    let rest = &after_begin[line_len..];
    let end_line = format!("{END}{label}{DASHES}");
    let body_len = rest
        .find(&end_line)
        .ok_or_else(|| malformed("missing matching END line"))?;

    let body: String = rest[..body_len]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if body.is_empty() {
        return Err(malformed("empty body"));
    }
    let body = BASE64
        .decode(body)
        .map_err(|e| LicenseError::MalformedLicense(format!("invalid armor base64: {e}")))?;

    Ok(Armored {
        label: label.to_string(),
        body,
    })
}

fn malformed(reason: &str) -> LicenseError {
    LicenseError::MalformedLicense(reason.to_string())
}
