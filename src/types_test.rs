// Unit tests for the core data model

use super::*;

#[test]
fn test_profile_get_skips_empty_values() {
    let profile = Profile::from_pairs([
        ("email", "jane@example.com"),
        ("phone_number", "   "),
        ("subject", ""),
    ]);

    assert_eq!(profile.get("email"), Some("jane@example.com"));
    assert_eq!(profile.get("phone_number"), None);
    assert_eq!(profile.get("subject"), None);
    assert_eq!(profile.get("missing"), None);
}

#[test]
fn test_profile_truthiness() {
    let profile = Profile::from_pairs([
        ("is_existing_customer", "true"),
        ("subscribed", "no"),
        ("flag", "1"),
    ]);

    assert!(profile.is_truthy("is_existing_customer"));
    assert!(profile.is_truthy("flag"));
    assert!(!profile.is_truthy("subscribed"));
    assert!(!profile.is_truthy("missing"));
}

#[test]
fn test_profile_fill_value_excludes_false() {
    let profile = Profile::from_pairs([
        ("email", "jane@example.com"),
        ("is_existing_customer", "false"),
    ]);

    assert!(profile.has_fill_value("email"));
    assert!(!profile.has_fill_value("is_existing_customer"));
    assert!(!profile.has_fill_value("missing"));
}

#[test]
fn test_message_override_wins_when_non_empty() {
    let profile = Profile::from_pairs([("message", "stored message")]);

    let overridden = profile.clone().with_message_override("fresh message");
    assert_eq!(overridden.get("message"), Some("fresh message"));

    // Blank override keeps the stored message.
    let kept = profile.with_message_override("   ");
    assert_eq!(kept.get("message"), Some("stored message"));
}

#[test]
fn test_status_and_method_names() {
    assert_eq!(SiteStatus::EmailOnly.as_str(), "email_only");
    assert_eq!(SiteStatus::NavFail.as_str(), "nav_fail");
    assert_eq!(ContactMethod::None.as_str(), "none");
    assert_eq!(ShotTag::SubmitError.as_str(), "submit_error");
}

#[test]
fn test_site_result_serializes_with_snake_case_status() {
    let mut result = SiteResult::new(3, "example.com");
    result.status = SiteStatus::EmailOnly;
    result.method = ContactMethod::Email;
    result.emails = vec!["info@example.com".to_string()];

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "email_only");
    assert_eq!(json["method"], "email");
    assert_eq!(json["idx"], 3);
}

#[test]
fn test_run_options_defaults() {
    let options = RunOptions::default();
    assert!(options.halt_on_captcha);
    assert!(!options.use_captcha_solver);
    assert!(options.headless);
    assert_eq!(options.nav_timeout_ms, 15_000);
}
