//! Per-site processing pipeline.
//!
//! One call per site row: normalize the URL, walk the navigation candidates,
//! clear consent popups, discover a contact channel, then either fill and
//! submit the contact form or fall back to the discovered email addresses.
//! Every failure mode ends as a [`SiteResult`] — nothing from a single site
//! ever propagates out of here.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, warn};

use crate::captcha::{handle_captcha, CaptchaConfig, CaptchaState};
use crate::discovery::find_contact_method;
use crate::driver::PageDriver;
use crate::errors::SiteError;
use crate::forms::{build_fill_plan, fallback_plan};
use crate::logsink::LogSink;
use crate::navigate::navigate_candidates;
use crate::popups::dismiss_popups;
use crate::submit::{apply_plan, apply_presubmit_defaults, click_submit, read_outcome};
use crate::types::{
    ContactMethod, DiscoveryResult, Profile, RunOptions, ShotTag, SiteResult, SiteRow, SiteStatus,
};
use crate::urlnorm::{candidate_urls, normalize_url};

/// How many discovered addresses the email fallback queues.
const EMAIL_FALLBACK_LIMIT: usize = 2;

/// Popup sweep passes on a fresh page.
const POPUP_PASSES: usize = 2;

/// Everything one site's processing needs besides the row itself.
pub struct SiteContext<'a> {
    pub driver: &'a dyn PageDriver,
    pub profile: &'a Profile,
    pub options: &'a RunOptions,
    pub captcha: &'a CaptchaConfig,
    pub shots_dir: &'a Path,
    pub log: &'a LogSink,
}

impl<'a> SiteContext<'a> {
    fn nav_timeout(&self) -> Duration {
        Duration::from_millis(self.options.nav_timeout_ms)
    }
}

/// Evidence screenshots for one site, under a shared timestamped base name.
struct Evidence<'a> {
    dir: &'a Path,
    base: String,
    shots: BTreeMap<ShotTag, String>,
}

impl<'a> Evidence<'a> {
    fn new(dir: &'a Path, idx: usize) -> Self {
        Evidence {
            dir,
            base: format!("row{idx}_{}", Local::now().format("%Y%m%d_%H%M%S_%3f")),
            shots: BTreeMap::new(),
        }
    }

    /// Best-effort capture; a failed screenshot never affects the pipeline.
    async fn capture(&mut self, driver: &dyn PageDriver, tag: ShotTag, log: &LogSink) {
        let path = self.dir.join(format!("{}_{}.png", self.base, tag.as_str()));
        match driver.screenshot().await {
            Ok(png) => match std::fs::write(&path, png) {
                Ok(()) => {
                    log.line(format!("Screenshot saved: {}", path.display()));
                    self.shots.insert(tag, path.display().to_string());
                }
                Err(e) => warn!("Screenshot not written to {}: {e}", path.display()),
            },
            Err(e) => debug!("Screenshot failed: {e}"),
        }
    }
}

/// Process one site row into exactly one [`SiteResult`].
pub async fn process_site(ctx: &SiteContext<'_>, row: &SiteRow) -> SiteResult {
    let log = ctx.log;
    let driver = ctx.driver;
    let mut evidence = Evidence::new(ctx.shots_dir, row.idx);

    log.line("----------------------------------------------");
    log.line(format!("[{}] Target URL: {}", row.idx, row.raw));

    let mut result = SiteResult::new(row.idx, &row.raw);

    // 1) Sanitize. An unrecoverable host never reaches the browser.
    let Some(canonical) = normalize_url(&row.raw) else {
        let err = SiteError::InvalidUrl(row.raw.clone());
        log.line(format!("Skipping row {}: {err}", row.idx));
        evidence.capture(driver, ShotTag::NavFail, log).await;
        result.status = SiteStatus::NavFail;
        result.reason = err.to_string();
        result.shots = evidence.shots;
        return result;
    };

    // 2) Walk the scheme/www candidates until one loads.
    let candidates = candidate_urls(&canonical);
    let final_url = match navigate_candidates(driver, &candidates, ctx.nav_timeout(), log).await {
        Ok(url) => url,
        Err(SiteError::NavigationFailure(last)) => {
            evidence.capture(driver, ShotTag::NavFail, log).await;
            log.line(format!(
                "Skipping {canonical} after failed navigation. Last error: {last}"
            ));
            result.status = SiteStatus::NavFail;
            result.reason = last;
            result.shots = evidence.shots;
            return result;
        }
        Err(other) => {
            evidence.capture(driver, ShotTag::NavFail, log).await;
            result.status = SiteStatus::NavFail;
            result.reason = other.to_string();
            result.shots = evidence.shots;
            return result;
        }
    };
    result.final_url = final_url;

    // 3) Clear consent popups on the landing page.
    dismiss_popups(driver, POPUP_PASSES, log).await;

    // 4) Find a contact channel; discovery failure degrades, never aborts.
    let contact = match find_contact_method(driver, log).await {
        Ok(contact) => contact,
        Err(e) => {
            let err = SiteError::DiscoveryFailure(e.to_string());
            log.line(format!("{err}"));
            DiscoveryResult {
                url: driver.current_url().await.unwrap_or_default(),
                ..DiscoveryResult::default()
            }
        }
    };
    log.line(format!(
        "Contact discovery: changed={} form={} emails={}",
        contact.page_changed,
        contact.form.has_form,
        contact.emails.len()
    ));

    if contact.page_changed {
        dismiss_popups(driver, POPUP_PASSES, log).await;
        evidence.capture(driver, ShotTag::Contact, log).await;
        if let Ok(url) = driver.current_url().await {
            result.final_url = url;
        }
    }
    evidence.capture(driver, ShotTag::Loaded, log).await;

    // 5) Form first, email fallback.
    if contact.form.has_form {
        let mut finished = form_path(ctx, &contact, &mut evidence, &result).await;
        finished.shots = evidence.shots;
        return finished;
    }

    if !contact.emails.is_empty() {
        let queued: Vec<String> = contact
            .emails
            .iter()
            .take(EMAIL_FALLBACK_LIMIT)
            .cloned()
            .collect();
        let body_len = ctx.profile.get("message").map(str::len).unwrap_or(0);
        log.line(format!(
            "No form found. Queued emails -> {queued:?} | site={} | body_len={body_len}",
            result.final_url
        ));
        result.method = ContactMethod::Email;
        result.status = SiteStatus::EmailOnly;
        result.emails = queued;
        result.shots = evidence.shots;
        return result;
    }

    log.line("No form and no email found; moving on");
    result.status = SiteStatus::Skipped;
    result.reason = "No form/email on page".to_string();
    result.shots = evidence.shots;
    result
}

/// Fill, CAPTCHA, submit, classify. Consumes `result` as the partially
/// filled record and returns the finalized one.
async fn form_path(
    ctx: &SiteContext<'_>,
    contact: &DiscoveryResult,
    evidence: &mut Evidence<'_>,
    result: &SiteResult,
) -> SiteResult {
    let log = ctx.log;
    let driver = ctx.driver;
    let form_index = contact.form.form_index;

    let mut out = result.clone();
    out.method = ContactMethod::Form;
    out.emails = contact.emails.clone();

    log.line("Contact form detected; building fill plan from profile");
    let controls = match driver.form_controls(form_index).await {
        Ok(controls) => controls,
        Err(e) => {
            debug!("Control enumeration failed: {e}");
            Vec::new()
        }
    };

    let mut plan = build_fill_plan(form_index, &controls, ctx.profile);
    if plan.is_empty() {
        log.line("No mapped fields from profile; trying minimal fallback (email + message)");
        plan = fallback_plan(form_index, &controls, ctx.profile);
    }
    apply_plan(driver, &plan, log).await;

    apply_presubmit_defaults(driver, form_index).await;

    // CAPTCHA policy: an unsolved challenge fails the site before submission
    // when halt_on_captcha is set; otherwise submission is still attempted
    // and the strict classifier decides.
    let state = handle_captcha(
        driver,
        form_index,
        ctx.profile,
        ctx.captcha,
        ctx.options.use_captcha_solver,
        log,
    )
    .await;
    if state == CaptchaState::Unsolved && ctx.options.halt_on_captcha {
        evidence.capture(driver, ShotTag::Captcha, log).await;
        out.status = SiteStatus::Fail;
        out.reason = SiteError::CaptchaUnsolved.to_string();
        return out;
    }

    // One more conservative sweep so nothing overlays the submit control.
    dismiss_popups(driver, POPUP_PASSES, log).await;

    if let Err(e) = click_submit(driver, form_index, log).await {
        evidence.capture(driver, ShotTag::SubmitError, log).await;
        log.line(format!("Submit click failed: {e}"));
        out.status = SiteStatus::Fail;
        out.reason = e.to_string();
        return out;
    }

    evidence.capture(driver, ShotTag::Postsubmit, log).await;
    let (status, reason) = read_outcome(driver, form_index, log).await;
    if let Ok(url) = driver.current_url().await {
        out.final_url = url;
    }
    out.status = status;
    out.reason = reason;
    out
}
