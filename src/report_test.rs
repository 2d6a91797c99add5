// Unit tests for summary counting and report writing

use pretty_assertions::assert_eq;

use super::*;
use crate::types::SiteResult;

fn result(idx: usize, method: ContactMethod, status: SiteStatus) -> SiteResult {
    let mut r = SiteResult::new(idx, "example.com");
    r.method = method;
    r.status = status;
    r
}

#[test]
fn test_summary_counts_by_status() {
    let results = vec![
        result(1, ContactMethod::Form, SiteStatus::Success),
        result(2, ContactMethod::Form, SiteStatus::Fail),
        result(3, ContactMethod::Email, SiteStatus::EmailOnly),
        result(4, ContactMethod::None, SiteStatus::Skipped),
        result(5, ContactMethod::None, SiteStatus::NavFail),
        result(6, ContactMethod::Form, SiteStatus::Success),
    ];

    let summary = summarize(&results);
    assert_eq!(
        summary,
        RunSummary {
            form_success: 2,
            form_fail: 1,
            email_only: 1,
            skipped: 1,
            nav_fail: 1,
            total: 6,
        }
    );
}

#[test]
fn test_code_lines() {
    let mut success = result(1, ContactMethod::Form, SiteStatus::Success);
    success.final_url = "https://www.example.com/contact".to_string();
    assert_eq!(code_line(&success), "[1] www.example.com — FORM_SUCCESS");

    let mut fail = result(2, ContactMethod::Form, SiteStatus::Fail);
    fail.reason = "captcha".to_string();
    assert_eq!(code_line(&fail), "[2] example.com — FORM_FAIL(captcha)");

    let mut email = result(3, ContactMethod::Email, SiteStatus::EmailOnly);
    email.emails = vec!["a@x.io".to_string(), "b@x.io".to_string()];
    assert_eq!(code_line(&email), "[3] example.com — EMAIL_ONLY(2)");

    let nav = result(4, ContactMethod::None, SiteStatus::NavFail);
    assert_eq!(code_line(&nav), "[4] example.com — NAV_FAIL(error)");

    let skipped = result(5, ContactMethod::None, SiteStatus::Skipped);
    assert_eq!(code_line(&skipped), "[5] example.com — SKIPPED");
}

#[test]
fn test_reports_are_written_with_one_row_per_result() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = result(1, ContactMethod::Form, SiteStatus::Success);
    first.final_url = "https://example.com".to_string();
    let mut second = result(2, ContactMethod::Email, SiteStatus::EmailOnly);
    second.reason = "has, comma".to_string();
    second.emails = vec!["info@example.com".to_string()];

    let (csv_path, json_path) = write_reports(dir.path(), &[first, second]).unwrap();

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("idx,input_url,final_url,method,status"));
    assert!(lines[1].contains("form,success"));
    // The comma-bearing reason is quoted, keeping the column count stable.
    assert!(lines[2].contains("\"has, comma\""));
    assert!(lines[2].ends_with(",1,,,,,,"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[1]["status"], "email_only");
}
