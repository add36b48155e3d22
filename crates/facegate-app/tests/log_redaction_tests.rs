//! Integration tests for log redaction.

use facegate_app::redact_sensitive;

#[test]
fn log_redaction_tests_removes_obvious_secret_markers() {
    let raw = "authorization=Bearer abc123";
    let redacted = redact_sensitive(raw);

    assert!(redacted.contains("<redacted>"));
    assert!(!redacted.contains("abc123"));
}

#[test]
fn log_redaction_tests_pass_phrase_values_are_cut() {
    let redacted = redact_sensitive("form rejected: pass_phrase=open sesame");

    assert_eq!(redacted, "form rejected: pass_phrase=<redacted>");
}

#[test]
fn log_redaction_tests_plain_details_are_untouched() {
    assert_eq!(
        redact_sensitive("connection refused"),
        "connection refused"
    );
}
