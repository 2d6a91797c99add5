//! WebDriver-backed implementation of the [`PageDriver`] capability.
//!
//! One [`Browser`] wraps one WebDriver session with a single page, which is
//! exactly the concurrency model the pipeline wants. DOM snapshots are read
//! with in-page scripts; clicks and keystrokes go through real WebDriver
//! element interactions so host pages observe trusted events.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::driver::{
    AnchorInfo, ControlInfo, DriverError, DriverResult, FormSnapshot, FrameInfo, FrameScope,
    PageDriver, SubmitWait,
};
use crate::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;

/// The one selector used to enumerate form controls. Planning and mutation
/// must both go through this, or plan indexes would drift off the DOM.
const CONTROL_SELECTOR: &str = "input:not([type=hidden]), textarea, select";

/// Submit-like controls, first match in document order wins.
const SUBMIT_SELECTOR: &str = "button[type=submit], input[type=submit], button:not([type])";

/// Supported browser types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

/// Browser session for WebDriver automation.
pub struct Browser {
    client: Client,
    http: reqwest::Client,
    trace: bool,
}

impl Browser {
    /// Connect to (auto-starting if needed) the WebDriver for `browser_type`
    /// and open a fresh session.
    pub async fn launch(
        browser_type: BrowserType,
        headless: bool,
        proxy: &str,
        trace: bool,
    ) -> Result<Self> {
        info!("Connecting to {:?} WebDriver", browser_type);

        let webdriver_url = GLOBAL_WEBDRIVER_MANAGER
            .ensure_driver(&browser_type)
            .await?;

        let caps = Self::build_capabilities(browser_type, headless, proxy);
        debug!("Connecting to WebDriver at {}", webdriver_url);

        let client = match ClientBuilder::rustls()
            .capabilities(caps.clone())
            .connect(&webdriver_url)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("Session is already started")
                    || error_str.contains("session not created")
                {
                    // Driver is in a bad state; restart it and retry once.
                    info!("WebDriver appears to be in a bad state, attempting recovery...");
                    GLOBAL_WEBDRIVER_MANAGER.kill_driver(&browser_type);
                    sleep(Duration::from_millis(500)).await;

                    let new_url = GLOBAL_WEBDRIVER_MANAGER
                        .ensure_driver(&browser_type)
                        .await
                        .context("Failed to restart WebDriver after recovery")?;
                    ClientBuilder::rustls()
                        .capabilities(caps)
                        .connect(&new_url)
                        .await
                        .context("Failed to connect to WebDriver after restart")?
                } else {
                    return Err(e).context("Failed to connect to WebDriver");
                }
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Ok(Browser {
            client,
            http,
            trace,
        })
    }

    fn build_capabilities(
        browser_type: BrowserType,
        headless: bool,
        proxy: &str,
    ) -> serde_json::Map<String, Value> {
        let mut caps = serde_json::Map::new();

        match browser_type {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                caps.insert(
                    "moz:firefoxOptions".to_string(),
                    json!({ "args": args }),
                );
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                caps.insert(
                    "goog:chromeOptions".to_string(),
                    json!({ "args": args }),
                );
            }
        }

        // Native dialogs must never block an unattended run.
        caps.insert("unhandledPromptBehavior".to_string(), json!("dismiss"));

        if !proxy.is_empty() {
            let server = proxy
                .trim_start_matches("http://")
                .trim_start_matches("https://");
            caps.insert(
                "proxy".to_string(),
                json!({
                    "proxyType": "manual",
                    "httpProxy": server,
                    "sslProxy": server,
                }),
            );
        }

        caps
    }

    /// Close the session. Safe to call exactly once on every exit path.
    pub async fn close(self) -> Result<()> {
        self.client.close().await.context("Failed to close session")
    }

    fn backend(e: impl std::fmt::Display) -> DriverError {
        DriverError::Backend(e.to_string())
    }

    async fn exec(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        if self.trace {
            debug!("execute: {}", script.lines().next().unwrap_or("").trim());
        }
        self.client
            .execute(script, args)
            .await
            .map_err(Self::backend)
    }

    /// Run a script inside a frame scope, always restoring the top-level
    /// browsing context afterwards.
    async fn exec_in_scope(
        &self,
        scope: FrameScope,
        script: &str,
        args: Vec<Value>,
    ) -> DriverResult<Value> {
        match scope {
            FrameScope::Main => self.exec(script, args).await,
            FrameScope::Child(index) => {
                self.client
                    .enter_frame(Some(index as u16))
                    .await
                    .map_err(Self::backend)?;
                let out = self.client.execute(script, args).await.map_err(Self::backend);
                // Back to the top-level frame no matter what happened.
                let _ = self.client.enter_frame(None).await;
                out
            }
        }
    }

    /// Wait until the document leaves the `loading` state or the deadline
    /// passes. Best-effort; some pages never settle.
    async fn wait_content_loaded(&self, deadline: Instant) -> bool {
        let script = "return document.readyState !== 'loading';";
        loop {
            match self.exec(script, vec![]).await {
                Ok(v) if v.as_bool().unwrap_or(false) => return true,
                _ => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    /// The nth control of the nth form, via the fixed enumeration selector.
    async fn control_element(
        &self,
        form_index: usize,
        control_index: usize,
    ) -> DriverResult<fantoccini::elements::Element> {
        let forms = self
            .client
            .find_all(Locator::Css("form"))
            .await
            .map_err(Self::backend)?;
        let form = forms
            .into_iter()
            .nth(form_index)
            .ok_or_else(|| DriverError::NotFound(format!("form #{form_index}")))?;
        let controls = form
            .find_all(Locator::Css(CONTROL_SELECTOR))
            .await
            .map_err(Self::backend)?;
        controls
            .into_iter()
            .nth(control_index)
            .ok_or_else(|| DriverError::NotFound(format!("form #{form_index} control #{control_index}")))
    }
}

#[async_trait]
impl PageDriver for Browser {
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()> {
        if self.trace {
            debug!("goto {url}");
        }
        let deadline = Instant::now() + timeout;
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(DriverError::Navigation(e.to_string())),
            Err(_) => return Err(DriverError::Timeout(format!("navigation to {url}"))),
        }
        self.wait_content_loaded(deadline).await;
        Ok(())
    }

    async fn open_if_ok(&self, url: &str, timeout: Duration) -> DriverResult<bool> {
        // WebDriver never exposes response status, so probe over HTTP first.
        let probe = match self.http.get(url).timeout(timeout).send().await {
            Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
            Err(_) => false,
        };
        if !probe {
            return Ok(false);
        }
        self.goto(url, timeout).await?;
        Ok(true)
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self
            .client
            .current_url()
            .await
            .map_err(Self::backend)?
            .to_string())
    }

    async fn body_text(&self) -> DriverResult<String> {
        let value = self
            .exec("return document.body ? document.body.innerText : '';", vec![])
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn anchors(&self, cap: usize) -> DriverResult<Vec<AnchorInfo>> {
        let script = r#"
            const cap = arguments[0];
            const els = document.querySelectorAll('a[href]');
            const out = [];
            for (let i = 0; i < els.length && i < cap; i++) {
                out.push({
                    index: i,
                    href: els[i].getAttribute('href') || '',
                    visible: els[i].getClientRects().length > 0,
                });
            }
            return out;
        "#;
        let value = self.exec(script, vec![json!(cap)]).await?;
        serde_json::from_value::<Vec<AnchorJson>>(value)
            .map(|anchors| {
                anchors
                    .into_iter()
                    .map(|a| AnchorInfo {
                        index: a.index,
                        href: a.href,
                        visible: a.visible,
                    })
                    .collect()
            })
            .map_err(Self::backend)
    }

    async fn click_anchor(&self, index: usize, timeout: Duration) -> DriverResult<()> {
        let anchors = self
            .client
            .find_all(Locator::Css("a[href]"))
            .await
            .map_err(Self::backend)?;
        let anchor = anchors
            .into_iter()
            .nth(index)
            .ok_or_else(|| DriverError::NotFound(format!("anchor #{index}")))?;
        anchor.click().await.map_err(Self::backend)?;
        self.wait_content_loaded(Instant::now() + timeout).await;
        Ok(())
    }

    async fn forms(&self) -> DriverResult<Vec<FormSnapshot>> {
        let script = r#"
            return Array.from(document.forms).map(f => f.outerHTML.toLowerCase());
        "#;
        let value = self.exec(script, vec![]).await?;
        let htmls: Vec<String> = serde_json::from_value(value).map_err(Self::backend)?;
        Ok(htmls
            .into_iter()
            .enumerate()
            .map(|(index, html)| FormSnapshot { index, html })
            .collect())
    }

    async fn form_controls(&self, form_index: usize) -> DriverResult<Vec<ControlInfo>> {
        let script = r#"
            const idx = arguments[0];
            const form = document.forms[idx];
            if (!form) return [];
            const els = form.querySelectorAll("input:not([type=hidden]), textarea, select");
            const out = [];
            els.forEach((el, i) => {
                const style = window.getComputedStyle(el);
                const visible = el.getClientRects().length > 0
                    && style.visibility !== 'hidden' && style.display !== 'none';
                let label = '';
                if (el.id) {
                    const lab = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
                    if (lab) label = lab.innerText || '';
                }
                const options = [];
                if (el.tagName.toLowerCase() === 'select') {
                    for (const opt of el.options) {
                        options.push({
                            label: (opt.label || opt.textContent || '').trim(),
                            value: opt.value || '',
                        });
                    }
                }
                out.push({
                    index: i,
                    tag: el.tagName.toLowerCase(),
                    input_type: (el.getAttribute('type') || '').toLowerCase(),
                    name: el.getAttribute('name') || '',
                    id: el.id || '',
                    class: el.getAttribute('class') || '',
                    placeholder: el.getAttribute('placeholder') || '',
                    aria_label: el.getAttribute('aria-label') || '',
                    title: el.getAttribute('title') || '',
                    label_text: label,
                    pattern: el.getAttribute('pattern') || '',
                    value_attr: el.getAttribute('value') || '',
                    visible: visible,
                    disabled: el.disabled === true,
                    checked: el.checked === true,
                    options: options,
                });
            });
            return out;
        "#;
        let value = self.exec(script, vec![json!(form_index)]).await?;
        serde_json::from_value(value).map_err(Self::backend)
    }

    async fn fill_control(
        &self,
        form_index: usize,
        control_index: usize,
        value: &str,
    ) -> DriverResult<()> {
        let element = self.control_element(form_index, control_index).await?;
        // Clearing can fail on exotic inputs; typing is what matters.
        let _ = element.clear().await;
        element.send_keys(value).await.map_err(Self::backend)
    }

    async fn select_option(
        &self,
        form_index: usize,
        control_index: usize,
        label: &str,
        value: &str,
    ) -> DriverResult<()> {
        let element = self.control_element(form_index, control_index).await?;
        if element.select_by_label(label).await.is_ok() {
            return Ok(());
        }
        element.select_by_value(value).await.map_err(Self::backend)
    }

    async fn check_control(&self, form_index: usize, control_index: usize) -> DriverResult<()> {
        let element = self.control_element(form_index, control_index).await?;
        let checked = element
            .prop("checked")
            .await
            .map_err(Self::backend)?
            .map(|v| v == "true")
            .unwrap_or(false);
        if !checked {
            element.click().await.map_err(Self::backend)?;
        }
        Ok(())
    }

    async fn form_text(&self, form_index: usize) -> DriverResult<String> {
        let script = r#"
            const f = document.forms[arguments[0]];
            return f ? (f.innerText || '') : '';
        "#;
        let value = self.exec(script, vec![json!(form_index)]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn submit_form(
        &self,
        form_index: usize,
        nav_timeout: Duration,
        settle: Duration,
    ) -> DriverResult<SubmitWait> {
        let forms = self
            .client
            .find_all(Locator::Css("form"))
            .await
            .map_err(Self::backend)?;
        let form = forms
            .into_iter()
            .nth(form_index)
            .ok_or_else(|| DriverError::NotFound(format!("form #{form_index}")))?;
        let submit = form
            .find(Locator::Css(SUBMIT_SELECTOR))
            .await
            .map_err(|e| DriverError::NotFound(format!("submit control: {e}")))?;

        let before = self.current_url().await.unwrap_or_default();
        submit.click().await.map_err(Self::backend)?;

        // Race a navigation against an AJAX-style in-place submission.
        let deadline = Instant::now() + nav_timeout;
        while Instant::now() < deadline {
            if let Ok(now) = self.current_url().await {
                if now != before {
                    self.wait_content_loaded(deadline).await;
                    return Ok(SubmitWait::Navigated);
                }
            }
            sleep(Duration::from_millis(250)).await;
        }
        sleep(settle).await;
        Ok(SubmitWait::Settled)
    }

    async fn frames(&self) -> DriverResult<Vec<FrameInfo>> {
        let script = r#"
            return Array.from(document.querySelectorAll('iframe'))
                .map((f, i) => ({ index: i, url: f.src || '' }));
        "#;
        let value = self.exec(script, vec![]).await?;
        let frames: Vec<FrameJson> = serde_json::from_value(value).map_err(Self::backend)?;
        Ok(frames
            .into_iter()
            .map(|f| FrameInfo {
                index: f.index,
                url: f.url,
            })
            .collect())
    }

    async fn count_selector(&self, scope: FrameScope, css: &str) -> DriverResult<usize> {
        let script = "return document.querySelectorAll(arguments[0]).length;";
        let value = self.exec_in_scope(scope, script, vec![json!(css)]).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn count_in_form(&self, form_index: usize, css: &str) -> DriverResult<usize> {
        let script = r#"
            const f = document.forms[arguments[0]];
            return f ? f.querySelectorAll(arguments[1]).length : 0;
        "#;
        let value = self
            .exec(script, vec![json!(form_index), json!(css)])
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn click_first_visible(&self, scope: FrameScope, css: &str) -> DriverResult<bool> {
        let script = r#"
            const els = document.querySelectorAll(arguments[0]);
            for (const el of els) {
                const style = window.getComputedStyle(el);
                if (el.getClientRects().length > 0 && style.visibility !== 'hidden') {
                    el.click();
                    return true;
                }
            }
            return false;
        "#;
        let value = self.exec_in_scope(scope, script, vec![json!(css)]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click_button_labeled(
        &self,
        scope: FrameScope,
        labels: &[&str],
    ) -> DriverResult<bool> {
        let script = r#"
            const labels = arguments[0];
            const els = document.querySelectorAll(
                "button, [role='button'], input[type='button'], input[type='submit']");
            for (const el of els) {
                const text = (el.innerText || el.value || '').trim().toLowerCase();
                if (!text || el.getClientRects().length === 0) continue;
                if (labels.includes(text)) {
                    el.click();
                    return true;
                }
            }
            return false;
        "#;
        let value = self
            .exec_in_scope(scope, script, vec![json!(labels)])
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn attribute(&self, css: &str, name: &str) -> DriverResult<Option<String>> {
        let element = match self.client.find(Locator::Css(css)).await {
            Ok(element) => element,
            Err(_) => return Ok(None),
        };
        element.attr(name).await.map_err(Self::backend)
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.exec(script, args).await
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.client.screenshot().await.map_err(Self::backend)
    }
}

#[derive(serde::Deserialize)]
struct AnchorJson {
    index: usize,
    href: String,
    visible: bool,
}

#[derive(serde::Deserialize)]
struct FrameJson {
    index: usize,
    url: String,
}
