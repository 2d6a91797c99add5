//! Contact-channel discovery.
//!
//! Finds a way to reach the site: emails on the landing page are collected
//! first as a fallback, then a genuine contact/support link is clicked, then
//! a fixed list of common contact paths is probed on the same origin, and
//! finally the resulting page is scanned for emails again and for a contact
//! form. Deterministic: each step only runs when the previous one did not
//! already land on a suitable page.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::driver::{AnchorInfo, DriverResult, PageDriver};
use crate::forms::detect_contact_form;
use crate::logsink::LogSink;
use crate::types::DiscoveryResult;

/// Anchor scan cap for very large pages.
const MAX_ANCHOR_SCAN: usize = 200;

/// Wait after clicking a contact link.
const CONTACT_CLICK_TIMEOUT: Duration = Duration::from_secs(8);
/// Per-path limit when probing common contact paths.
const COMMON_PATH_TIMEOUT: Duration = Duration::from_secs(12);

/// Path segments that make an href a real contact/support link.
const CONTACT_SEGMENTS: &[&str] = &["contact", "contact-us", "contactus", "support", "help"];

/// Same-origin paths tried when no contact link could be clicked.
const COMMON_CONTACT_PATHS: &[&str] = &[
    "/contact",
    "/contact-us",
    "/contactus",
    "/support",
    "/support/contact",
    "/company/contact",
];

const EXCLUDE_HREF_PREFIXES: &[&str] = &["#", "javascript:", "tel:", "mailto:"];

/// Hosts that are never a site's own contact channel.
const EXCLUDE_HOST_PARTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "instagram.com",
    "youtu.be",
    "youtube.com",
    "maps.google.",
    "goo.gl/maps",
];

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap();
}

/// Whether an href really points at a contact/support page.
pub fn is_contact_href(href: &str) -> bool {
    let h = href.trim().to_lowercase();
    if h.is_empty() || EXCLUDE_HREF_PREFIXES.iter().any(|p| h.starts_with(p)) {
        return false;
    }

    let (host, path) = match Url::parse(&h) {
        Ok(u) => (
            u.host_str().unwrap_or("").to_string(),
            u.path().to_string(),
        ),
        // Relative href: no host, the href itself is the path.
        Err(_) => (
            String::new(),
            h.split(['?', '#']).next().unwrap_or("").to_string(),
        ),
    };

    if EXCLUDE_HOST_PARTS.iter().any(|part| host.contains(part)) {
        return false;
    }
    CONTACT_SEGMENTS.iter().any(|seg| path.contains(seg))
}

/// Email addresses from `mailto:` anchors and the page body text, lowercased
/// and deduplicated, in discovery order (anchors before body matches).
pub fn extract_emails(anchors: &[AnchorInfo], body_text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |addr: String| {
        if !addr.is_empty() && !out.contains(&addr) {
            out.push(addr);
        }
    };

    for anchor in anchors {
        let href = anchor.href.trim();
        if let Some(rest) = href
            .strip_prefix("mailto:")
            .or_else(|| href.strip_prefix("MAILTO:"))
        {
            let addr = rest.split('?').next().unwrap_or("").trim().to_lowercase();
            push(addr);
        }
    }
    for found in EMAIL.find_iter(body_text) {
        push(found.as_str().trim().to_lowercase());
    }
    out
}

/// The `scheme://host[:port]` origin of a URL, used to build common-path
/// probes. Falls back to the input when it does not parse.
fn origin_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => u.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}

async fn try_click_contact_link(
    driver: &dyn PageDriver,
    anchors: &[AnchorInfo],
    log: &LogSink,
) -> bool {
    for anchor in anchors {
        if !anchor.visible || !is_contact_href(&anchor.href) {
            continue;
        }
        match driver.click_anchor(anchor.index, CONTACT_CLICK_TIMEOUT).await {
            Ok(()) => {
                log.line(format!("Navigated via anchor href=\"{}\"", anchor.href));
                return true;
            }
            Err(e) => {
                debug!("Contact link click failed for {}: {e}", anchor.href);
                continue;
            }
        }
    }
    false
}

async fn try_common_paths(driver: &dyn PageDriver, base: &str, log: &LogSink) -> bool {
    for path in COMMON_CONTACT_PATHS {
        let url = format!("{}{}", base.trim_end_matches('/'), path);
        match driver.open_if_ok(&url, COMMON_PATH_TIMEOUT).await {
            Ok(true) => {
                log.line(format!("Opened common contact path: {url}"));
                return true;
            }
            Ok(false) => continue,
            Err(e) => {
                debug!("Common path probe failed for {url}: {e}");
                continue;
            }
        }
    }
    false
}

/// Locate a contact channel starting from the current page.
///
/// The returned `page_changed` flag tells the caller whether a fresh popup
/// sweep is worthwhile on the page discovery ended on.
pub async fn find_contact_method(
    driver: &dyn PageDriver,
    log: &LogSink,
) -> DriverResult<DiscoveryResult> {
    let anchors = driver.anchors(MAX_ANCHOR_SCAN).await?;
    let body = driver.body_text().await.unwrap_or_default();
    let emails_here = extract_emails(&anchors, &body);

    let base = origin_of(&driver.current_url().await?);

    let mut changed = try_click_contact_link(driver, &anchors, log).await;
    if !changed {
        changed = try_common_paths(driver, &base, log).await;
    }

    let anchors_after = driver.anchors(MAX_ANCHOR_SCAN).await.unwrap_or_default();
    let body_after = driver.body_text().await.unwrap_or_default();
    let emails_after = extract_emails(&anchors_after, &body_after);

    let forms = driver.forms().await.unwrap_or_default();
    let form = detect_contact_form(&forms);

    Ok(DiscoveryResult {
        page_changed: changed,
        url: driver.current_url().await.unwrap_or_default(),
        emails: if emails_after.is_empty() {
            emails_here
        } else {
            emails_after
        },
        form,
    })
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod discovery_test;
