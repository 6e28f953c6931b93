use ezlicense::{LicenseError, TimeSourceError};

#[test]
fn error_display_malformed_license() {
    let err = LicenseError::MalformedLicense("missing BEGIN line".into());
    let msg = format!("{err}");
    assert!(msg.contains("malformed license"));
    assert!(msg.contains("missing BEGIN line"));
}

#[test]
fn error_display_invalid_signature() {
    let err = LicenseError::InvalidSignature;
    assert!(format!("{err}").contains("signature"));
}

#[test]
fn error_display_malformed_payload() {
    let err = LicenseError::MalformedPayload("missing field `expires`".into());
    assert!(format!("{err}").contains("payload"));
}

#[test]
fn error_display_expired() {
    let err = LicenseError::LicenseExpired { expires: 1_700_000_000 };
    let msg = format!("{err}");
    assert!(msg.contains("expired"));
    assert!(msg.contains("1700000000"));
}

#[test]
fn error_from_time_source() {
    let err: LicenseError = TimeSourceError::Network("timeout".into()).into();
    assert!(matches!(err, LicenseError::TimeVerificationFailed(_)));
    let msg = format!("{err}");
    assert!(msg.contains("could not verify license time"));
    assert!(msg.contains("timeout"));
}

#[test]
fn error_display_signing_failure() {
    let err = LicenseError::SigningFailure("message too long".into());
    assert!(format!("{err}").contains("signing failed"));
}

#[test]
fn error_display_key_errors() {
    assert!(format!("{}", LicenseError::KeyFormat("bad".into())).contains("invalid key format"));
    assert!(format!("{}", LicenseError::KeyGeneration("bad".into())).contains("key generation"));
}

#[test]
fn error_display_monitor_errors() {
    assert!(format!("{}", LicenseError::MonitorAlreadyStarted).contains("already started"));
    assert!(format!("{}", LicenseError::NotMonitorable).contains("never expires"));
    let err = LicenseError::MonitorUnavailable("no reactor".into());
    assert!(format!("{err}").contains("monitor unavailable"));
}

#[test]
fn time_source_error_display() {
    assert!(format!("{}", TimeSourceError::MissingDateHeader).contains("Date header"));
    assert!(format!("{}", TimeSourceError::InvalidDate("x".into())).contains("invalid date"));
    assert!(format!("{}", TimeSourceError::Unavailable("x".into())).contains("unavailable"));
}

#[test]
fn error_is_debug() {
    let err = LicenseError::InvalidSignature;
    let _ = format!("{err:?}");
}
