//! Conservative cookie/consent dismissal.
//!
//! Detection casts a wide net (any frame, any container whose id/class
//! mentions cookie/consent), but clicking is narrow: accept-style buttons
//! are only ever clicked inside a recognized consent-management iframe or
//! inside a confirmed consent container. Generic close/OK controls outside a
//! consent scope are never touched — that asymmetry is what keeps the
//! dismisser from clicking away the contact form it is clearing the way for.

use tracing::debug;
use url::Url;

use crate::driver::{FrameScope, PageDriver};
use crate::logsink::LogSink;

/// Recognized consent-management providers. An iframe served from one of
/// these hosts is a safe click scope.
const CMP_HOST_PATTERNS: &[&str] = &[
    "cookielaw.org", // OneTrust
    "cookiebot.com",
    "cookieyes.com",
    "trustarc.com",
    "quantcast",
    "didomi",
    "termly",
];

/// Containers that mark a consent UI in the host page's own DOM.
const CONSENT_CONTAINERS: &[&str] = &[
    "[id*='cookie' i]",
    "[class*='cookie' i]",
    "[id*='consent' i]",
    "[class*='consent' i]",
];

/// Accept-style buttons, matched by attribute.
const ACCEPT_BUTTONS: &[&str] = &[
    "button[id*='accept' i], button[class*='accept' i]",
    "button[id*='agree' i], button[class*='agree' i]",
    "button[id*='allow' i], button[class*='allow' i]",
    "button[aria-label*='accept' i]",
    "button[title*='accept' i]",
];

/// Accept-style buttons, matched by exact visible text. Only tried inside a
/// confirmed consent scope.
const ACCEPT_TEXTS: &[&str] = &[
    "accept",
    "accept all",
    "agree",
    "allow",
    "allow all",
    "i agree",
    "ok",
    "got it",
    "continue",
];

fn is_cmp_url(url: &str) -> bool {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default();
    CMP_HOST_PATTERNS.iter().any(|p| host.contains(p))
}

/// One sweep of one frame. Returns the number of clicks (0 or 1).
async fn sweep_scope(driver: &dyn PageDriver, scope: FrameScope, cmp_frame: bool, log: &LogSink) -> usize {
    // Known CMP iframe: the whole frame is a consent UI.
    if cmp_frame {
        for selector in ACCEPT_BUTTONS {
            match driver.click_first_visible(scope, selector).await {
                Ok(true) => {
                    log.line(format!("[popup] Clicked consent-accept: {selector}"));
                    return 1;
                }
                Ok(false) => {}
                Err(e) => debug!("[popup] Click attempt failed: {e}"),
            }
        }
        match driver.click_button_labeled(scope, ACCEPT_TEXTS).await {
            Ok(true) => {
                log.line("[popup] Clicked consent-accept by text");
                return 1;
            }
            _ => return 0,
        }
    }

    // Host-page DOM: only act when a consent container is present.
    let mut containers = 0;
    for container in CONSENT_CONTAINERS {
        match driver.count_selector(scope, container).await {
            Ok(n) => containers += n,
            Err(e) => debug!("[popup] Container scan failed: {e}"),
        }
    }
    if containers == 0 {
        return 0;
    }

    for container in CONSENT_CONTAINERS {
        for button in ACCEPT_BUTTONS {
            // Scope each button selector to the container subtree.
            let scoped: String = button
                .split(", ")
                .map(|b| format!("{container} {b}"))
                .collect::<Vec<_>>()
                .join(", ");
            match driver.click_first_visible(scope, &scoped).await {
                Ok(true) => {
                    log.line(format!("[popup] Clicked consent-accept in container: {button}"));
                    return 1;
                }
                Ok(false) => {}
                Err(e) => debug!("[popup] Click attempt failed: {e}"),
            }
        }
    }
    match driver.click_button_labeled(scope, ACCEPT_TEXTS).await {
        Ok(true) => {
            log.line("[popup] Clicked consent-accept by text");
            1
        }
        _ => 0,
    }
}

/// Best-effort, safe consent dismissal over the main frame and all child
/// frames. Every click attempt is independently fault-tolerant. Returns the
/// total number of clicks.
pub async fn dismiss_popups(driver: &dyn PageDriver, passes: usize, log: &LogSink) -> usize {
    let mut total = 0;

    for _ in 0..passes {
        total += sweep_scope(driver, FrameScope::Main, false, log).await;

        let frames = match driver.frames().await {
            Ok(frames) => frames,
            Err(e) => {
                debug!("[popup] Frame enumeration failed: {e}");
                continue;
            }
        };
        for frame in frames {
            let cmp = is_cmp_url(&frame.url);
            total += sweep_scope(driver, FrameScope::Child(frame.index), cmp, log).await;
        }
    }

    if total > 0 {
        log.line(format!("[popup] Dismissed {total} consent banner(s)"));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmp_hosts_are_recognized() {
        assert!(is_cmp_url("https://consent.cookiebot.com/banner"));
        assert!(is_cmp_url("https://cdn.cookielaw.org/frame.html"));
        assert!(is_cmp_url("https://cmp.quantcast.example/choice"));
    }

    #[test]
    fn test_ordinary_hosts_are_not_cmp() {
        assert!(!is_cmp_url("https://example.com/iframe"));
        assert!(!is_cmp_url("about:blank"));
        assert!(!is_cmp_url(""));
    }
}
