//! reCAPTCHA detection and resolution.
//!
//! Detection looks for reCAPTCHA-shaped nodes in or near the target form.
//! Resolution either clicks the inline checkbox (no solver configured) or
//! delegates to an external token-solving service: submit a token task with
//! the site key and page URL, poll until the token arrives, inject it into
//! the hidden response field so the host page observes it.

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::driver::{FrameScope, PageDriver};
use crate::logsink::LogSink;
use crate::types::Profile;

/// reCAPTCHA markers inside a form's subtree.
const FORM_MARKERS: &str =
    "#g-recaptcha, #recaptcha, [name='g-recaptcha-response'], #g-recaptcha-response";

/// reCAPTCHA challenge iframes anywhere on the page.
const IFRAME_MARKER: &str = "iframe[src*='recaptcha']";

/// Where a site's CAPTCHA handling ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaState {
    /// No challenge present.
    None,
    /// Challenge present, inline checkbox clicked.
    SolvedInline,
    /// Challenge present, solver token injected.
    SolvedToken,
    /// Challenge present and not resolved.
    Unsolved,
}

/// One token-solving request. Created only when a challenge is detected and
/// never outlives the site being processed.
#[derive(Debug, Clone)]
pub struct CaptchaTask {
    pub site_key: String,
    pub page_url: String,
}

/// Solver service endpoint and timing. Credentials here are the
/// environment-level fallback; per-user profile credentials win.
#[derive(Debug, Clone)]
pub struct CaptchaConfig {
    pub api_base: String,
    pub username: String,
    pub password: String,
    pub poll_interval: Duration,
    pub solve_timeout: Duration,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        CaptchaConfig {
            api_base: "http://api.dbcapi.me".to_string(),
            username: String::new(),
            password: String::new(),
            poll_interval: Duration::from_secs(4),
            solve_timeout: Duration::from_secs(120),
        }
    }
}

impl CaptchaConfig {
    /// Environment-backed config: `CAPTCHA_API_URL`, `CAPTCHA_USER`,
    /// `CAPTCHA_PASS`.
    pub fn from_env() -> Self {
        let mut cfg = CaptchaConfig::default();
        if let Ok(base) = std::env::var("CAPTCHA_API_URL") {
            if !base.trim().is_empty() {
                cfg.api_base = base.trim().trim_end_matches('/').to_string();
            }
        }
        cfg.username = std::env::var("CAPTCHA_USER").unwrap_or_default();
        cfg.password = std::env::var("CAPTCHA_PASS").unwrap_or_default();
        cfg
    }
}

/// HTTP client for the token-solving service.
pub struct SolverClient {
    http: reqwest::Client,
    api_base: String,
    username: String,
    password: String,
    poll_interval: Duration,
    solve_timeout: Duration,
}

impl SolverClient {
    pub fn new(cfg: &CaptchaConfig, username: &str, password: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        SolverClient {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            poll_interval: cfg.poll_interval,
            solve_timeout: cfg.solve_timeout,
        }
    }

    /// Submit a token task and poll until the response token is available.
    /// Returns `None` on submission failure or poll timeout.
    pub async fn solve_token(&self, task: &CaptchaTask) -> Option<String> {
        let token_params = json!({
            "googlekey": task.site_key,
            "pageurl": task.page_url,
        });
        let body = [
            ("type", "4".to_string()),
            ("token_params", token_params.to_string()),
        ];

        let first: Value = match self
            .http
            .post(format!("{}/api/captcha", self.api_base))
            .basic_auth(&self.username, Some(&self.password))
            .form(&body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp.json().await.ok()?,
            Ok(resp) => {
                warn!("Solver task submission rejected: HTTP {}", resp.status());
                return None;
            }
            Err(e) => {
                warn!("Solver task submission failed: {e}");
                return None;
            }
        };

        // The id key varies across deployments.
        let id = ["captcha", "captcha_id", "id"]
            .iter()
            .find_map(|k| id_string(first.get(*k)))?;

        let deadline = Instant::now() + self.solve_timeout;
        while Instant::now() < deadline {
            if let Some(token) = self.poll_once(&id).await {
                return Some(token);
            }
            sleep(self.poll_interval).await;
        }
        warn!("Solver poll timed out for task {id}");
        None
    }

    async fn poll_once(&self, id: &str) -> Option<String> {
        let resp = self
            .http
            .get(format!("{}/api/captcha/{id}", self.api_base))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: Value = resp.json().await.ok()?;
        body.get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() && s.trim() != "0" => Some(s.trim().to_string()),
        Value::Number(n) if n.as_i64() != Some(0) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether a reCAPTCHA challenge sits in or near the target form.
pub async fn has_recaptcha(driver: &dyn PageDriver, form_index: usize) -> bool {
    if let Ok(n) = driver.count_in_form(form_index, FORM_MARKERS).await {
        if n > 0 {
            return true;
        }
    }
    matches!(
        driver.count_selector(FrameScope::Main, IFRAME_MARKER).await,
        Ok(n) if n > 0
    )
}

/// Pull the challenge site key from the DOM or the challenge iframe's query
/// string (`k`, `sitekey` or `render` parameter).
pub async fn extract_sitekey(driver: &dyn PageDriver) -> Option<String> {
    if let Ok(Some(key)) = driver.attribute("div.g-recaptcha", "data-sitekey").await {
        if !key.is_empty() {
            return Some(key);
        }
    }

    let frames = driver.frames().await.ok()?;
    let challenge = frames.iter().find(|f| f.url.contains("recaptcha"))?;
    sitekey_from_iframe_url(&challenge.url)
}

/// Site key from a challenge iframe URL like
/// `https://www.google.com/recaptcha/api2/anchor?ar=1&k=<sitekey>&...`.
fn sitekey_from_iframe_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    for param in ["k", "sitekey", "render"] {
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == param) {
            if !v.is_empty() {
                return Some(v.into_owned());
            }
        }
    }
    None
}

/// Single attempt at the reCAPTCHA v2 inline checkbox.
pub async fn click_inline_checkbox(driver: &dyn PageDriver) -> bool {
    let frames = match driver.frames().await {
        Ok(frames) => frames,
        Err(_) => return false,
    };
    for frame in frames.iter().filter(|f| f.url.contains("recaptcha")) {
        match driver
            .click_first_visible(FrameScope::Child(frame.index), "#recaptcha-anchor")
            .await
        {
            Ok(true) => return true,
            Ok(false) => continue,
            Err(e) => {
                debug!("Checkbox click failed in frame {}: {e}", frame.index);
                continue;
            }
        }
    }
    false
}

/// Make the host page observe the solved token: ensure the hidden response
/// textarea exists, set it, and dispatch a bubbling input event.
pub async fn inject_token(driver: &dyn PageDriver, token: &str) {
    let script = r#"
        const tkn = arguments[0];
        let ta = document.getElementById('g-recaptcha-response') ||
                 document.querySelector('textarea[name="g-recaptcha-response"]');
        if (!ta) {
            ta = document.createElement('textarea');
            ta.id = 'g-recaptcha-response';
            ta.name = 'g-recaptcha-response';
            ta.style.display = 'none';
            document.body.appendChild(ta);
        }
        ta.value = tkn;
        ta.dispatchEvent(new Event('input', { bubbles: true }));
    "#;
    if let Err(e) = driver.execute(script, vec![json!(token)]).await {
        debug!("Token injection failed: {e}");
    }
}

/// Detect and resolve a challenge on the target form.
///
/// Credentials are taken from the profile first (`captcha_username`/
/// `captcha_password`), then from the environment-level config.
pub async fn handle_captcha(
    driver: &dyn PageDriver,
    form_index: usize,
    profile: &Profile,
    cfg: &CaptchaConfig,
    use_solver: bool,
    log: &LogSink,
) -> CaptchaState {
    if !has_recaptcha(driver, form_index).await {
        return CaptchaState::None;
    }
    log.line("reCAPTCHA detected on form");

    let username = profile
        .get("captcha_username")
        .unwrap_or(cfg.username.as_str());
    let password = profile
        .get("captcha_password")
        .unwrap_or(cfg.password.as_str());
    let have_credentials = !username.is_empty() && !password.is_empty();

    if use_solver && have_credentials {
        let Some(site_key) = extract_sitekey(driver).await else {
            log.line("Could not find sitekey for token solve");
            return CaptchaState::Unsolved;
        };
        let page_url = driver.current_url().await.unwrap_or_default();
        log.line(format!(
            "Attempting solver token solve (sitekey={}..., url={page_url})",
            &site_key[..site_key.len().min(8)]
        ));

        let task = CaptchaTask { site_key, page_url };
        let client = SolverClient::new(cfg, username, password);
        match client.solve_token(&task).await {
            Some(token) => {
                inject_token(driver, &token).await;
                log.line("reCAPTCHA token injected");
                CaptchaState::SolvedToken
            }
            None => {
                log.line("Token solve failed");
                CaptchaState::Unsolved
            }
        }
    } else if click_inline_checkbox(driver).await {
        log.line("Clicked reCAPTCHA checkbox, proceeding to submit");
        CaptchaState::SolvedInline
    } else {
        log.line("captcha unsolved; solver disabled and checkbox not clickable");
        CaptchaState::Unsolved
    }
}

#[cfg(test)]
#[path = "captcha_test.rs"]
mod captcha_test;
