//! Scripted in-memory PageDriver for pipeline tests.
//!
//! Pages are registered by exact URL; navigation succeeds only for
//! registered URLs. All interactions are recorded so tests can assert what
//! the pipeline actually did.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use sitereach::driver::{
    AnchorInfo, ControlInfo, DriverError, DriverResult, FormSnapshot, FrameInfo, FrameScope,
    PageDriver, SubmitWait,
};

/// One scripted page.
#[derive(Default, Clone)]
pub struct FakePage {
    pub body_text: String,
    /// Body text shown after the form is submitted.
    pub post_submit_body: Option<String>,
    pub anchors: Vec<AnchorInfo>,
    pub forms: Vec<FormSnapshot>,
    pub controls: HashMap<usize, Vec<ControlInfo>>,
    pub frames: Vec<FrameInfo>,
    /// Scripted answers for count_in_form(form, css) keyed by css.
    pub form_marker_counts: HashMap<String, usize>,
}

#[derive(Default)]
struct State {
    current: Option<String>,
    submitted: bool,
}

#[derive(Default)]
pub struct FakeDriver {
    pages: HashMap<String, FakePage>,
    state: Mutex<State>,
    /// Every URL handed to goto, in order.
    pub goto_log: Mutex<Vec<String>>,
    /// Every (form, control, value) fill, in order.
    pub fills: Mutex<Vec<(usize, usize, String)>>,
    pub submits: Mutex<Vec<usize>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        FakeDriver::default()
    }

    pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    fn current_page(&self) -> Option<FakePage> {
        let state = self.state.lock().unwrap();
        state
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
    }

    fn submitted(&self) -> bool {
        self.state.lock().unwrap().submitted
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str, _timeout: Duration) -> DriverResult<()> {
        self.goto_log.lock().unwrap().push(url.to_string());
        if self.pages.contains_key(url) {
            let mut state = self.state.lock().unwrap();
            state.current = Some(url.to_string());
            state.submitted = false;
            Ok(())
        } else {
            Err(DriverError::Navigation(format!("connection refused: {url}")))
        }
    }

    async fn open_if_ok(&self, url: &str, timeout: Duration) -> DriverResult<bool> {
        if self.pages.contains_key(url) {
            self.goto(url, timeout).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .current
            .clone()
            .unwrap_or_default())
    }

    async fn body_text(&self) -> DriverResult<String> {
        let page = self.current_page().unwrap_or_default();
        if self.submitted() {
            if let Some(post) = page.post_submit_body {
                return Ok(post);
            }
        }
        Ok(page.body_text)
    }

    async fn anchors(&self, cap: usize) -> DriverResult<Vec<AnchorInfo>> {
        let mut anchors = self.current_page().unwrap_or_default().anchors;
        anchors.truncate(cap);
        Ok(anchors)
    }

    async fn click_anchor(&self, index: usize, timeout: Duration) -> DriverResult<()> {
        let page = self.current_page().unwrap_or_default();
        let anchor = page
            .anchors
            .into_iter()
            .find(|a| a.index == index)
            .ok_or_else(|| DriverError::NotFound(format!("anchor #{index}")))?;
        if self.pages.contains_key(&anchor.href) {
            self.goto(&anchor.href, timeout).await
        } else {
            Err(DriverError::Navigation(anchor.href))
        }
    }

    async fn forms(&self) -> DriverResult<Vec<FormSnapshot>> {
        Ok(self.current_page().unwrap_or_default().forms)
    }

    async fn form_controls(&self, form_index: usize) -> DriverResult<Vec<ControlInfo>> {
        Ok(self
            .current_page()
            .unwrap_or_default()
            .controls
            .get(&form_index)
            .cloned()
            .unwrap_or_default())
    }

    async fn fill_control(
        &self,
        form_index: usize,
        control_index: usize,
        value: &str,
    ) -> DriverResult<()> {
        self.fills
            .lock()
            .unwrap()
            .push((form_index, control_index, value.to_string()));
        Ok(())
    }

    async fn select_option(
        &self,
        form_index: usize,
        control_index: usize,
        label: &str,
        _value: &str,
    ) -> DriverResult<()> {
        self.fills
            .lock()
            .unwrap()
            .push((form_index, control_index, format!("select:{label}")));
        Ok(())
    }

    async fn check_control(&self, form_index: usize, control_index: usize) -> DriverResult<()> {
        self.fills
            .lock()
            .unwrap()
            .push((form_index, control_index, "check".to_string()));
        Ok(())
    }

    async fn form_text(&self, _form_index: usize) -> DriverResult<String> {
        self.body_text().await
    }

    async fn submit_form(
        &self,
        form_index: usize,
        _nav_timeout: Duration,
        _settle: Duration,
    ) -> DriverResult<SubmitWait> {
        self.submits.lock().unwrap().push(form_index);
        self.state.lock().unwrap().submitted = true;
        Ok(SubmitWait::Settled)
    }

    async fn frames(&self) -> DriverResult<Vec<FrameInfo>> {
        Ok(self.current_page().unwrap_or_default().frames)
    }

    async fn count_selector(&self, _scope: FrameScope, css: &str) -> DriverResult<usize> {
        if css.contains("recaptcha") {
            let frames = self.current_page().unwrap_or_default().frames;
            return Ok(frames.iter().filter(|f| f.url.contains("recaptcha")).count());
        }
        Ok(0)
    }

    async fn count_in_form(&self, _form_index: usize, css: &str) -> DriverResult<usize> {
        Ok(self
            .current_page()
            .unwrap_or_default()
            .form_marker_counts
            .get(css)
            .copied()
            .unwrap_or(0))
    }

    async fn click_first_visible(&self, _scope: FrameScope, _css: &str) -> DriverResult<bool> {
        Ok(false)
    }

    async fn click_button_labeled(
        &self,
        _scope: FrameScope,
        _labels: &[&str],
    ) -> DriverResult<bool> {
        Ok(false)
    }

    async fn attribute(&self, _css: &str, _name: &str) -> DriverResult<Option<String>> {
        Ok(None)
    }

    async fn execute(&self, _script: &str, _args: Vec<Value>) -> DriverResult<Value> {
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        // A tiny stand-in; the pipeline only writes the bytes to disk.
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}
