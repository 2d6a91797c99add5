//! Contact-form detection and heuristic fill planning.
//!
//! The detector picks the form most likely to be a contact form from raw
//! form HTML; the planner maps profile fields onto that form's controls by
//! token scoring. Both work purely on driver snapshots — no DOM access, no
//! mutation — so the plan is fully computed before any filling starts.

use lazy_static::lazy_static;
use regex::Regex;

use crate::driver::{ControlInfo, FormSnapshot};
use crate::types::{FillAction, FillPlanEntry, FormInfo, PlanTarget, Profile};

/// How many forms the detector examines, in document order.
const MAX_FORMS_SCANNED: usize = 5;

/// Score added per matched token. Highest total wins; ties go to the field
/// registered earlier in [`PROFILE_TOKENS`].
const TOKEN_SCORE: i32 = 3;

/// Token lists per semantic profile field, in registration order.
///
/// New fields are added by extending this table; the matcher itself never
/// special-cases a field name.
pub const PROFILE_TOKENS: &[(&str, &[&str])] = &[
    ("first_name", &["first name", "firstname", "first_name", "given name", "givenname", "fname"]),
    ("last_name", &["last name", "lastname", "last_name", "surname", "family name", "lname"]),
    ("company_name", &["company", "organization", "organisation", "business", "firm"]),
    ("job_title", &["job title", "title", "position", "role"]),
    ("email", &["email", "e-mail", "mail"]),
    ("phone_number", &["phone", "telephone", "tel", "mobile", "cell"]),
    ("website_url", &["website", "site", "url", "homepage"]),
    ("subject", &["subject", "topic"]),
    ("referral_source", &["referral", "how did you hear", "how you heard"]),
    ("message", &["message", "comments", "comment", "inquiry", "enquiry", "details", "question"]),
    ("preferred_contact", &["preferred contact", "contact method", "how contact"]),
    ("city", &["city", "town"]),
    ("state", &["state", "province", "region/state"]),
    ("country", &["country", "nation"]),
    ("zip_code", &["zip", "postal", "postcode"]),
    ("industry", &["industry", "sector"]),
    ("best_time_to_contact", &["best time", "preferred time", "contact time"]),
    ("budget_range", &["budget", "price range", "budget range"]),
    ("product_interest", &["interest", "product interest", "service interest"]),
    ("is_existing_customer", &["existing customer", "current customer", "already a customer"]),
    ("language", &["language", "preferred language"]),
    ("timezone", &["timezone", "time zone"]),
    ("linkedin_url", &["linkedin", "linkedin url", "linkedin profile"]),
    ("notes", &["notes", "note", "additional info", "additional information"]),
    ("form_custom_field_1", &["custom", "custom1", "custom field 1"]),
    ("form_custom_field_2", &["custom2", "custom field 2"]),
    ("form_custom_field_3", &["custom3", "custom field 3"]),
    ("contact_source", &["contact source", "source"]),
    ("preferred_language", &["preferred language"]),
    ("region", &["region"]),
];

/// Fields whose value is a yes/no answer rather than free text. Only these
/// may ever toggle a checkbox or radio control.
const BOOLEAN_FIELDS: &[&str] = &["is_existing_customer"];

lazy_static! {
    /// Does a declared HTML `pattern` look like it wants bare digits?
    static ref DIGITS_ONLY_PATTERN: Regex = Regex::new(r"^\^?\\d[\d\-()\s+]*\$?$").unwrap();
}

/// Pick the contact form among the page's forms.
///
/// Looks at the first few forms in document order, skipping search forms and
/// newsletter signups that have no free-text area, and returns the first
/// remaining form with a submit-like control. When nothing qualifies but
/// forms exist, form 0 is used as a last resort.
pub fn detect_contact_form(forms: &[FormSnapshot]) -> FormInfo {
    if forms.is_empty() {
        return FormInfo::default();
    }

    for form in forms.iter().take(MAX_FORMS_SCANNED) {
        let html = form.html.as_str();

        let looks_search =
            html.contains("search") && (html.contains("type=\"search\"") || html.contains("name=\"s\""));
        let looks_newsletter = html.contains("newsletter") && html.contains("email");
        let has_textarea = html.contains("<textarea");
        let has_submit =
            html.contains("type=\"submit\"") || html.contains("role=\"button\"") || html.contains("<button");

        if looks_search || (looks_newsletter && !has_textarea) {
            continue;
        }

        if has_submit {
            return FormInfo {
                has_form: true,
                form_index: form.index,
                has_textarea,
                has_submit,
            };
        }
    }

    FormInfo {
        has_form: true,
        form_index: 0,
        has_textarea: false,
        has_submit: true,
    }
}

/// The description text the scorer matches tokens against.
fn control_blob(control: &ControlInfo) -> String {
    [
        control.label_text.as_str(),
        control.name.as_str(),
        control.id.as_str(),
        control.class.as_str(),
        control.placeholder.as_str(),
        control.aria_label.as_str(),
        control.title.as_str(),
    ]
    .join(" ")
    .to_lowercase()
}

fn score(blob: &str, tokens: &[&str]) -> i32 {
    tokens.iter().filter(|t| blob.contains(*t)).count() as i32 * TOKEN_SCORE
}

/// Highest-scoring profile field for a control blob, with its value.
/// Only fields the profile actually has a value for compete.
fn best_profile_key(blob: &str, profile: &Profile) -> Option<(String, String)> {
    let mut best: Option<(&str, i32)> = None;
    for (key, tokens) in PROFILE_TOKENS {
        if !profile.has_fill_value(key) {
            continue;
        }
        let s = score(blob, tokens);
        // Strict comparison keeps ties on the first-registered field.
        if s > best.map(|(_, s)| s).unwrap_or(0) {
            best = Some((key, s));
        }
    }
    best.and_then(|(key, _)| profile.get(key).map(|v| (key.to_string(), v.to_string())))
}

/// Controls the planner must never touch: the reCAPTCHA response carrier and
/// honeypot traps.
fn is_untouchable(control: &ControlInfo) -> bool {
    let name = control.name.to_lowercase();
    let id = control.id.to_lowercase();
    name == "g-recaptcha-response"
        || id == "g-recaptcha-response"
        || name.contains("honeypot")
        || name.contains("hp_")
}

/// Build the ordered fill plan for one form.
///
/// Each visible, enabled, non-CAPTCHA control is scored against the profile
/// token table; the winning field's value becomes a plan entry. Textareas
/// always carry the message (falling back to notes); selects are planned as
/// option selection; checkbox/radio controls are only toggled for
/// boolean-shaped fields; phone values are reformatted to match the
/// control's declared pattern.
pub fn build_fill_plan(
    form_index: usize,
    controls: &[ControlInfo],
    profile: &Profile,
) -> Vec<FillPlanEntry> {
    let mut plan = Vec::new();

    for control in controls {
        if !control.fillable() || is_untouchable(control) {
            continue;
        }

        let target = PlanTarget {
            form_index,
            control_index: control.index,
        };
        let blob = control_blob(control);

        if control.tag == "textarea" {
            if let Some(value) = profile.get("message").or_else(|| profile.get("notes")) {
                plan.push(FillPlanEntry {
                    target,
                    value: value.to_string(),
                    profile_key: "message".to_string(),
                    action: FillAction::Fill,
                });
            }
            continue;
        }

        if control.tag == "select" {
            if let Some((key, value)) = best_profile_key(&blob, profile) {
                plan.push(FillPlanEntry {
                    target,
                    value,
                    profile_key: key,
                    action: FillAction::Select,
                });
            }
            continue;
        }

        if control.input_type == "checkbox" || control.input_type == "radio" {
            // Toggles are only ever planned for boolean-shaped fields whose
            // own tokens match this control; free-text fields never land on
            // a checkbox.
            let toggle = BOOLEAN_FIELDS.iter().find(|field| {
                profile.is_truthy(field)
                    && PROFILE_TOKENS
                        .iter()
                        .find(|(key, _)| key == *field)
                        .is_some_and(|(_, tokens)| tokens.iter().any(|t| blob.contains(t)))
            });
            if let Some(field) = toggle {
                plan.push(FillPlanEntry {
                    target,
                    value: "true".to_string(),
                    profile_key: (*field).to_string(),
                    action: FillAction::Check,
                });
            }
            continue;
        }

        if let Some((key, value)) = best_profile_key(&blob, profile) {
            let value = if key == "phone_number" || control.input_type == "tel" {
                format_phone(&value, &control.pattern)
            } else {
                value
            };
            plan.push(FillPlanEntry {
                target,
                value,
                profile_key: key,
                action: FillAction::Fill,
            });
            continue;
        }

        // Unmatched but unambiguous: an email-typed input takes the profile
        // email even when its labeling matched nothing.
        if control.input_type == "email" {
            if let Some(email) = profile.get("email") {
                plan.push(FillPlanEntry {
                    target,
                    value: email.to_string(),
                    profile_key: "email".to_string(),
                    action: FillAction::Fill,
                });
            }
        }
    }

    plan
}

/// Minimal plan for when token matching found nothing: the first email-typed
/// input gets the profile email, the first textarea gets the message.
pub fn fallback_plan(
    form_index: usize,
    controls: &[ControlInfo],
    profile: &Profile,
) -> Vec<FillPlanEntry> {
    let mut plan = Vec::new();

    if let Some(email) = profile.get("email") {
        if let Some(control) = controls
            .iter()
            .find(|c| c.fillable() && c.input_type == "email" && !is_untouchable(c))
        {
            plan.push(FillPlanEntry {
                target: PlanTarget {
                    form_index,
                    control_index: control.index,
                },
                value: email.to_string(),
                profile_key: "email".to_string(),
                action: FillAction::Fill,
            });
        }
    }

    if let Some(message) = profile.get("message") {
        if let Some(control) = controls
            .iter()
            .find(|c| c.fillable() && c.tag == "textarea" && !is_untouchable(c))
        {
            plan.push(FillPlanEntry {
                target: PlanTarget {
                    form_index,
                    control_index: control.index,
                },
                value: message.to_string(),
                profile_key: "message".to_string(),
                action: FillAction::Fill,
            });
        }
    }

    plan
}

/// Normalize a phone value for common web inputs: prefer the last 10 digits,
/// bare digits when the declared pattern wants digits, `NNN-NNN-NNNN`
/// otherwise.
pub fn format_phone(raw: &str, pattern: &str) -> String {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }
    if digits.len() >= 10 {
        digits = digits[digits.len() - 10..].to_string();
    }
    if !pattern.is_empty() && DIGITS_ONLY_PATTERN.is_match(pattern) {
        return digits;
    }
    if digits.len() == 10 {
        return format!("{}-{}-{}", &digits[0..3], &digits[3..6], &digits[6..]);
    }
    digits
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod forms_test;
