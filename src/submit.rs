//! Plan application, pre-submit defaults, submission and strict outcome
//! classification.
//!
//! Classification is deliberately asymmetric: a submission only ever counts
//! as successful when the page says so in words. An ambiguous page is a
//! failure with an empty reason, never a success.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::driver::{ControlInfo, PageDriver, SubmitWait};
use crate::errors::SiteError;
use crate::logsink::LogSink;
use crate::types::{FillAction, FillPlanEntry, SiteStatus};

/// Bounded wait for a post-click navigation.
const NAV_WAIT: Duration = Duration::from_secs(8);
/// Settle period granted to AJAX-style submissions that never navigate.
const AJAX_SETTLE: Duration = Duration::from_secs(4);

/// Explicit positive wording; at least one of these must appear for a
/// submission to classify as successful.
const SUCCESS_KEYWORDS: &[&str] = &[
    "thank you",
    "thanks for your",
    "message sent",
    "form submitted",
    "successfully sent",
    "we have received",
    "submission complete",
    "your message has been received",
    "we'll be in touch",
    "we will contact you",
];

/// Error/validation wording; the first match becomes the failure reason.
const ERROR_KEYWORDS: &[&str] = &[
    "validation errors",
    "please confirm the fields",
    "please correct the highlighted",
    "please fix the following",
    "required field",
    "this field is required",
    "invalid",
    "captcha",
    "try again",
    "error",
    "failed",
    "not sent",
    "unable to send",
    "something went wrong",
];

lazy_static! {
    /// Selects whose label names geography; these keep their own defaults.
    static ref GEOGRAPHY: Regex =
        Regex::new(r"(?i)\b(country|state|province|region|city|zip|postal)\b").unwrap();
    static ref NEWSLETTER: Regex = Regex::new(r"(?i)(newsletter|subscribe)").unwrap();
}

/// Apply a precomputed fill plan. Every entry is independently
/// fault-tolerant: one control refusing input never aborts the rest.
pub async fn apply_plan(driver: &dyn PageDriver, plan: &[FillPlanEntry], log: &LogSink) {
    for entry in plan {
        if entry.value.is_empty() {
            continue;
        }
        let target = entry.target;
        let outcome = match entry.action {
            FillAction::Fill => {
                driver
                    .fill_control(target.form_index, target.control_index, &entry.value)
                    .await
            }
            FillAction::Select => {
                driver
                    .select_option(target.form_index, target.control_index, &entry.value, &entry.value)
                    .await
            }
            FillAction::Check => {
                driver
                    .check_control(target.form_index, target.control_index)
                    .await
            }
        };
        match outcome {
            Ok(()) => log.line(format!("Filled {}", entry.profile_key)),
            Err(e) => log.line(format!("Could not apply fill for {}: {e}", entry.profile_key)),
        }
    }
}

/// Best-effort defaults applied right before submission: answer "No" to
/// newsletter-style radios and selects, pick "Other" for generic selects,
/// leave geography selects alone.
pub async fn apply_presubmit_defaults(driver: &dyn PageDriver, form_index: usize) {
    let controls = match driver.form_controls(form_index).await {
        Ok(controls) => controls,
        Err(e) => {
            debug!("Skipping pre-submit defaults: {e}");
            return;
        }
    };

    for control in controls.iter().filter(|c| c.fillable()) {
        if control.input_type == "radio" && is_newsletter(control) {
            if control.value_attr.to_lowercase().contains("no") {
                if let Err(e) = driver.check_control(form_index, control.index).await {
                    debug!("Newsletter radio not toggled: {e}");
                }
            }
            continue;
        }

        if control.tag == "select" {
            if GEOGRAPHY.is_match(&control.label_text) {
                continue;
            }
            if is_newsletter(control) {
                if let Some(opt) = control
                    .options
                    .iter()
                    .find(|o| o.label.trim().eq_ignore_ascii_case("no"))
                {
                    if let Err(e) = driver
                        .select_option(form_index, control.index, &opt.label, &opt.value)
                        .await
                    {
                        debug!("Newsletter select not defaulted: {e}");
                    }
                }
                continue;
            }
            if let Some(opt) = control
                .options
                .iter()
                .find(|o| o.label.to_lowercase().contains("other"))
            {
                if let Err(e) = driver
                    .select_option(form_index, control.index, &opt.label, &opt.value)
                    .await
                {
                    debug!("Generic select not defaulted: {e}");
                }
            }
        }
    }
}

fn is_newsletter(control: &ControlInfo) -> bool {
    let blob = format!(
        "{} {} {} {}",
        control.label_text, control.name, control.id, control.class
    );
    NEWSLETTER.is_match(&blob)
}

/// Strict keyword-based classification over the submitted form's text, then
/// the full body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success,
    /// An error/validation keyword was observed; carries that keyword.
    Failure(String),
    /// Neither success nor error wording was found. Treated as failure with
    /// an empty reason by the caller.
    Ambiguous,
}

pub fn classify_submission(form_text: &str, body_text: &str) -> SubmissionOutcome {
    let scopes: Vec<String> = [form_text, body_text]
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    for scope in &scopes {
        if SUCCESS_KEYWORDS.iter().any(|kw| scope.contains(kw)) {
            return SubmissionOutcome::Success;
        }
    }
    for scope in &scopes {
        for kw in ERROR_KEYWORDS {
            if scope.contains(kw) {
                return SubmissionOutcome::Failure((*kw).to_string());
            }
        }
    }
    SubmissionOutcome::Ambiguous
}

/// Click submit and wait out either a navigation or an AJAX settle period.
///
/// A click failure is terminal for the site and comes back as
/// [`SiteError::SubmitClickFailure`] so the caller can record evidence
/// before finalizing the result.
pub async fn click_submit(
    driver: &dyn PageDriver,
    form_index: usize,
    log: &LogSink,
) -> Result<SubmitWait, SiteError> {
    match driver.submit_form(form_index, NAV_WAIT, AJAX_SETTLE).await {
        Ok(wait @ SubmitWait::Navigated) => {
            log.line("Form submitted (navigation observed)");
            Ok(wait)
        }
        Ok(wait @ SubmitWait::Settled) => {
            log.line("Form submitted (likely AJAX, no navigation)");
            Ok(wait)
        }
        Err(e) => Err(SiteError::SubmitClickFailure(e.to_string())),
    }
}

/// Read the post-submit page and classify the outcome into a status/reason
/// pair. Text reads are best-effort; missing scopes just shrink the
/// classification input.
pub async fn read_outcome(
    driver: &dyn PageDriver,
    form_index: usize,
    log: &LogSink,
) -> (SiteStatus, String) {
    let form_text = driver.form_text(form_index).await.unwrap_or_else(|e| {
        warn!("Could not read form text after submit: {e}");
        String::new()
    });
    let body_text = driver.body_text().await.unwrap_or_else(|e| {
        warn!("Could not read body text after submit: {e}");
        String::new()
    });

    match classify_submission(&form_text, &body_text) {
        SubmissionOutcome::Success => {
            log.line("Success message detected after form submission");
            (SiteStatus::Success, String::new())
        }
        SubmissionOutcome::Failure(keyword) => {
            log.line(format!("Form submission failed: {keyword}"));
            (SiteStatus::Fail, keyword)
        }
        SubmissionOutcome::Ambiguous => {
            log.line("Form submission failed: no success confirmation detected");
            (SiteStatus::Fail, String::new())
        }
    }
}

#[cfg(test)]
#[path = "submit_test.rs"]
mod submit_test;
