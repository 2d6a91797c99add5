// Unit tests for form detection and fill planning

use pretty_assertions::assert_eq;

use super::*;
use crate::driver::SelectOptionInfo;

fn form(index: usize, html: &str) -> FormSnapshot {
    FormSnapshot {
        index,
        html: html.to_lowercase(),
    }
}

fn text_input(index: usize, name: &str, label: &str) -> ControlInfo {
    ControlInfo {
        index,
        tag: "input".to_string(),
        input_type: "text".to_string(),
        name: name.to_string(),
        label_text: label.to_string(),
        visible: true,
        ..ControlInfo::default()
    }
}

fn typed_input(index: usize, input_type: &str, name: &str) -> ControlInfo {
    ControlInfo {
        index,
        tag: "input".to_string(),
        input_type: input_type.to_string(),
        name: name.to_string(),
        visible: true,
        ..ControlInfo::default()
    }
}

fn textarea(index: usize) -> ControlInfo {
    ControlInfo {
        index,
        tag: "textarea".to_string(),
        visible: true,
        ..ControlInfo::default()
    }
}

// --- detector ---

#[test]
fn test_no_forms_means_no_contact_form() {
    assert_eq!(detect_contact_form(&[]), FormInfo::default());
}

#[test]
fn test_search_form_is_skipped() {
    let forms = vec![
        form(0, r#"<form><input type="search" name="s">search<button>Go</button></form>"#),
        form(1, r#"<form><input name="email"><textarea></textarea><button type="submit">Send</button></form>"#),
    ];
    let info = detect_contact_form(&forms);
    assert!(info.has_form);
    assert_eq!(info.form_index, 1);
    assert!(info.has_textarea);
}

#[test]
fn test_newsletter_without_textarea_is_skipped() {
    let forms = vec![
        form(0, r#"<form>newsletter <input type="email"><button type="submit">Join</button></form>"#),
        form(1, r#"<form><textarea name="msg"></textarea><input type="submit"></form>"#),
    ];
    assert_eq!(detect_contact_form(&forms).form_index, 1);
}

#[test]
fn test_newsletter_with_textarea_qualifies() {
    let forms = vec![form(
        0,
        r#"<form>newsletter <input type="email"><textarea></textarea><button type="submit">Send</button></form>"#,
    )];
    let info = detect_contact_form(&forms);
    assert_eq!(info.form_index, 0);
    assert!(info.has_textarea);
}

#[test]
fn test_fallback_is_form_zero() {
    // Nothing qualifies (no submit control anywhere), yet forms exist.
    let forms = vec![form(0, r#"<form><input name="q"></form>"#)];
    let info = detect_contact_form(&forms);
    assert!(info.has_form);
    assert_eq!(info.form_index, 0);
    assert!(info.has_submit);
}

// --- planner ---

fn full_profile() -> Profile {
    Profile::from_pairs([
        ("first_name", "Jane"),
        ("last_name", "Doe"),
        ("email", "jane@example.com"),
        ("phone_number", "+1 (555) 123-4567"),
        ("message", "Hello there"),
        ("company_name", "Acme"),
        ("country", "Canada"),
        ("is_existing_customer", "true"),
    ])
}

#[test]
fn test_plan_maps_labeled_controls() {
    let controls = vec![
        text_input(0, "fname", "First name"),
        text_input(1, "lname", "Last name"),
        typed_input(2, "email", "email"),
        textarea(3),
    ];
    let plan = build_fill_plan(0, &controls, &full_profile());

    let keys: Vec<&str> = plan.iter().map(|e| e.profile_key.as_str()).collect();
    assert_eq!(keys, vec!["first_name", "last_name", "email", "message"]);
    assert_eq!(plan[0].value, "Jane");
    assert_eq!(plan[3].value, "Hello there");
    assert!(plan.iter().all(|e| e.target.form_index == 0));
}

#[test]
fn test_plan_never_targets_recaptcha_response() {
    let mut by_name = typed_input(0, "text", "g-recaptcha-response");
    by_name.name = "g-recaptcha-response".to_string();
    let mut by_id = textarea(1);
    by_id.id = "g-recaptcha-response".to_string();

    let plan = build_fill_plan(0, &[by_name, by_id], &full_profile());
    assert!(plan.is_empty());
}

#[test]
fn test_plan_skips_honeypots_and_hidden_controls() {
    let mut honeypot = text_input(0, "hp_field", "Leave empty");
    honeypot.name = "hp_field".to_string();
    let mut invisible = text_input(1, "email", "Email");
    invisible.visible = false;
    let mut disabled = text_input(2, "email", "Email");
    disabled.disabled = true;

    let plan = build_fill_plan(0, &[honeypot, invisible, disabled], &full_profile());
    assert!(plan.is_empty());
}

#[test]
fn test_plan_count_never_exceeds_fillable_controls() {
    let controls = vec![
        text_input(0, "name", "Name"),
        text_input(1, "email", "Email"),
        textarea(2),
    ];
    let plan = build_fill_plan(0, &controls, &full_profile());
    let fillable = controls.iter().filter(|c| c.fillable()).count();
    assert!(plan.len() <= fillable);
}

#[test]
fn test_checkbox_only_toggles_boolean_fields() {
    // "existing customer" checkbox with an affirmative profile → planned.
    let customer = ControlInfo {
        index: 0,
        tag: "input".to_string(),
        input_type: "checkbox".to_string(),
        label_text: "Are you an existing customer?".to_string(),
        visible: true,
        ..ControlInfo::default()
    };
    // A text-shaped field on a checkbox must never be toggled.
    let country = ControlInfo {
        index: 1,
        tag: "input".to_string(),
        input_type: "checkbox".to_string(),
        label_text: "Country".to_string(),
        visible: true,
        ..ControlInfo::default()
    };

    let plan = build_fill_plan(0, &[customer, country], &full_profile());
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].profile_key, "is_existing_customer");
    assert_eq!(plan[0].action, FillAction::Check);
}

#[test]
fn test_checkbox_not_toggled_when_profile_says_no() {
    let customer = ControlInfo {
        index: 0,
        tag: "input".to_string(),
        input_type: "checkbox".to_string(),
        label_text: "Existing customer".to_string(),
        visible: true,
        ..ControlInfo::default()
    };
    let profile = Profile::from_pairs([("is_existing_customer", "false")]);
    assert!(build_fill_plan(0, &[customer], &profile).is_empty());
}

#[test]
fn test_select_is_planned_as_selection() {
    let country = ControlInfo {
        index: 0,
        tag: "select".to_string(),
        label_text: "Country".to_string(),
        visible: true,
        options: vec![
            SelectOptionInfo {
                label: "Canada".to_string(),
                value: "ca".to_string(),
            },
            SelectOptionInfo {
                label: "Other".to_string(),
                value: "other".to_string(),
            },
        ],
        ..ControlInfo::default()
    };

    let plan = build_fill_plan(0, &[country], &full_profile());
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].action, FillAction::Select);
    assert_eq!(plan[0].value, "Canada");
}

#[test]
fn test_textarea_falls_back_to_notes() {
    let profile = Profile::from_pairs([("notes", "Some notes")]);
    let plan = build_fill_plan(0, &[textarea(0)], &profile);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].value, "Some notes");
}

#[test]
fn test_tie_breaks_to_first_registered_field() {
    // "custom2" scores 3 for form_custom_field_1 (via "custom") and 3 for
    // form_custom_field_2 (via "custom2"); the earlier registration wins.
    let control = text_input(0, "custom2", "");
    let profile = Profile::from_pairs([
        ("form_custom_field_1", "alpha"),
        ("form_custom_field_2", "beta"),
    ]);
    let plan = build_fill_plan(0, &[control], &profile);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].profile_key, "form_custom_field_1");
    assert_eq!(plan[0].value, "alpha");
}

#[test]
fn test_unmatched_email_input_takes_profile_email() {
    let control = typed_input(0, "email", "x9f");
    let profile = Profile::from_pairs([("email", "jane@example.com")]);
    let plan = build_fill_plan(0, &[control], &profile);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].value, "jane@example.com");
}

#[test]
fn test_fallback_plan_fills_exactly_email_and_first_textarea() {
    let controls = vec![
        text_input(0, "xyzzy", "Unlabeled"),
        typed_input(1, "email", "qqq"),
        textarea(2),
        textarea(3),
    ];
    let profile = Profile::from_pairs([("email", "jane@example.com"), ("message", "Hi")]);

    let plan = fallback_plan(0, &controls, &profile);
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].target.control_index, 1);
    assert_eq!(plan[0].value, "jane@example.com");
    assert_eq!(plan[1].target.control_index, 2);
    assert_eq!(plan[1].value, "Hi");
}

#[test]
fn test_fallback_plan_without_email_control() {
    let controls = vec![text_input(0, "xyzzy", "Unlabeled"), textarea(1)];
    let profile = Profile::from_pairs([("email", "jane@example.com"), ("message", "Hi")]);

    let plan = fallback_plan(0, &controls, &profile);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].profile_key, "message");
}

// --- phone formatting ---

#[test]
fn test_phone_formats_to_dashes_by_default() {
    assert_eq!(format_phone("+1 (555) 123-4567", ""), "555-123-4567");
}

#[test]
fn test_phone_prefers_last_ten_digits() {
    assert_eq!(format_phone("0015551234567", ""), "555-123-4567");
}

#[test]
fn test_phone_obeys_digits_only_pattern() {
    assert_eq!(format_phone("(555) 123-4567", r"^\d+$"), "5551234567");
    assert_eq!(format_phone("555.123.4567", r"\d"), "5551234567");
}

#[test]
fn test_phone_short_numbers_stay_bare() {
    assert_eq!(format_phone("12345", ""), "12345");
    assert_eq!(format_phone("no digits", ""), "");
}
