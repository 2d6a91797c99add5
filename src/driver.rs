//! Abstract browser-driving capability.
//!
//! The whole pipeline is written against [`PageDriver`] rather than a
//! concrete automation client: the heuristics only ever see plain data
//! snapshots of the page (forms, controls, anchors, frames) and address DOM
//! mutations by `(form_index, control_index)` pairs taken from those
//! snapshots. The production implementation wraps a WebDriver session
//! ([`crate::webdriver::Browser`]); tests use a scripted fake.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by a [`PageDriver`] implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("no element matching: {0}")]
    NotFound(String),
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("driver backend error: {0}")]
    Backend(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// DOM query/click scope: the main document or one child frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScope {
    Main,
    Child(usize),
}

/// One child frame of the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub index: usize,
    pub url: String,
}

/// One anchor element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorInfo {
    pub index: usize,
    pub href: String,
    pub visible: bool,
}

/// One `<form>` element: its document-order index plus lowercased outer HTML
/// for the detection heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    pub index: usize,
    pub html: String,
}

/// One option of a `<select>` control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOptionInfo {
    pub label: String,
    pub value: String,
}

/// Snapshot of one form control.
///
/// Controls are enumerated with a single fixed selector
/// (`input:not([type=hidden]), textarea, select`, document order) and the
/// resulting index is the *only* way the pipeline addresses the control
/// later, so planning and mutation stay consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInfo {
    pub index: usize,
    /// Lowercased tag name: `input`, `textarea` or `select`.
    pub tag: String,
    /// Lowercased `type` attribute, empty for non-inputs.
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub class: String,
    pub placeholder: String,
    pub aria_label: String,
    pub title: String,
    /// Text of the associated `<label for=...>`, when resolvable.
    pub label_text: String,
    /// Declared `pattern` attribute, used for phone formatting.
    pub pattern: String,
    /// Declared `value` attribute (radio/checkbox option value).
    pub value_attr: String,
    pub visible: bool,
    pub disabled: bool,
    pub checked: bool,
    /// Options, for `<select>` controls only.
    pub options: Vec<SelectOptionInfo>,
}

impl ControlInfo {
    /// Whether the fill planner may target this control at all.
    pub fn fillable(&self) -> bool {
        self.visible && !self.disabled
    }
}

/// How a form submission concluded from the driver's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitWait {
    /// A navigation was observed after the submit click.
    Navigated,
    /// No navigation happened; the page was given time to settle (AJAX).
    Settled,
}

/// The browser-automation operations the pipeline needs, and nothing more.
///
/// Every operation is bounded: navigation takes an explicit timeout and all
/// other calls are bounded by the backend's own command timeouts.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait until the document content is loaded.
    async fn goto(&self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Navigate only if the URL answers with a 2xx/3xx-equivalent status.
    /// Returns whether navigation happened.
    async fn open_if_ok(&self, url: &str, timeout: Duration) -> DriverResult<bool>;

    async fn current_url(&self) -> DriverResult<String>;

    /// Visible text of the document body.
    async fn body_text(&self) -> DriverResult<String>;

    /// Scan anchors in document order, capped for very large pages.
    async fn anchors(&self, cap: usize) -> DriverResult<Vec<AnchorInfo>>;

    /// Click the anchor at `index` (from [`PageDriver::anchors`]) and wait
    /// for the resulting page to load.
    async fn click_anchor(&self, index: usize, timeout: Duration) -> DriverResult<()>;

    /// All `<form>` elements, in document order.
    async fn forms(&self) -> DriverResult<Vec<FormSnapshot>>;

    /// Controls of one form, in the fixed enumeration order.
    async fn form_controls(&self, form_index: usize) -> DriverResult<Vec<ControlInfo>>;

    async fn fill_control(
        &self,
        form_index: usize,
        control_index: usize,
        value: &str,
    ) -> DriverResult<()>;

    /// Select an option by label first, falling back to value.
    async fn select_option(
        &self,
        form_index: usize,
        control_index: usize,
        label: &str,
        value: &str,
    ) -> DriverResult<()>;

    async fn check_control(&self, form_index: usize, control_index: usize) -> DriverResult<()>;

    /// Visible text inside one form's scope.
    async fn form_text(&self, form_index: usize) -> DriverResult<String>;

    /// Click the form's primary submit control, then race a bounded wait for
    /// navigation against a bounded settle period for AJAX submissions.
    async fn submit_form(
        &self,
        form_index: usize,
        nav_timeout: Duration,
        settle: Duration,
    ) -> DriverResult<SubmitWait>;

    /// Child frames of the current page.
    async fn frames(&self) -> DriverResult<Vec<FrameInfo>>;

    /// Count elements matching a CSS selector within a frame scope.
    async fn count_selector(&self, scope: FrameScope, css: &str) -> DriverResult<usize>;

    /// Count elements matching a CSS selector within one form's subtree.
    async fn count_in_form(&self, form_index: usize, css: &str) -> DriverResult<usize>;

    /// Click the first visible element matching `css` in the scope.
    /// Returns whether anything was clicked.
    async fn click_first_visible(&self, scope: FrameScope, css: &str) -> DriverResult<bool>;

    /// Click the first visible button-like element whose trimmed text equals
    /// one of `labels` (case-insensitive). Returns whether anything was
    /// clicked.
    async fn click_button_labeled(&self, scope: FrameScope, labels: &[&str])
        -> DriverResult<bool>;

    /// First matching element's attribute value, if the element exists.
    async fn attribute(&self, css: &str, name: &str) -> DriverResult<Option<String>>;

    /// Run a script in the page, returning its JSON result.
    async fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value>;

    /// PNG screenshot of the current viewport.
    async fn screenshot(&self) -> DriverResult<Vec<u8>>;
}
