// Unit tests for CAPTCHA configuration and sitekey parsing

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_sitekey_from_anchor_iframe_url() {
    let url = "https://www.google.com/recaptcha/api2/anchor?ar=1&k=6LfKeyKeyKey&co=aHR0&hl=en";
    assert_eq!(
        sitekey_from_iframe_url(url),
        Some("6LfKeyKeyKey".to_string())
    );
}

#[test]
fn test_sitekey_falls_back_to_render_param() {
    let url = "https://www.google.com/recaptcha/api.js?render=6LdRenderKey";
    assert_eq!(
        sitekey_from_iframe_url(url),
        Some("6LdRenderKey".to_string())
    );
}

#[test]
fn test_sitekey_absent_yields_none() {
    assert_eq!(
        sitekey_from_iframe_url("https://www.google.com/recaptcha/api2/anchor?ar=1"),
        None
    );
    assert_eq!(sitekey_from_iframe_url("not a url"), None);
}

#[test]
fn test_task_id_accepts_string_and_number() {
    assert_eq!(
        id_string(Some(&serde_json::json!("12345"))),
        Some("12345".to_string())
    );
    assert_eq!(
        id_string(Some(&serde_json::json!(12345))),
        Some("12345".to_string())
    );
}

#[test]
fn test_task_id_rejects_zero_and_empty() {
    assert_eq!(id_string(Some(&serde_json::json!(""))), None);
    assert_eq!(id_string(Some(&serde_json::json!("0"))), None);
    assert_eq!(id_string(Some(&serde_json::json!(0))), None);
    assert_eq!(id_string(None), None);
}

#[test]
fn test_config_defaults() {
    let cfg = CaptchaConfig::default();
    assert_eq!(cfg.poll_interval, Duration::from_secs(4));
    assert_eq!(cfg.solve_timeout, Duration::from_secs(120));
    assert!(cfg.username.is_empty());
}
