use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// User contact profile: semantic field name → scalar value.
///
/// Supplied once per run and never mutated afterwards. Values may be missing
/// or empty; the fill planner simply skips fields it has no value for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

impl Profile {
    /// Load a profile from a JSON object file. Non-string scalars (numbers,
    /// booleans) are stringified; nested values are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile file: {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Profile is not valid JSON: {}", path.display()))?;
        let obj = value
            .as_object()
            .context("Profile JSON must be an object of field → value")?;

        let mut fields = BTreeMap::new();
        for (key, val) in obj {
            let scalar = match val {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => continue,
            };
            fields.insert(key.clone(), scalar);
        }
        Ok(Profile { fields })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Profile {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a field value, treating empty/whitespace-only values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whether a boolean-shaped field holds an affirmative value.
    pub fn is_truthy(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("true" | "yes" | "y" | "1" | "on")
        )
    }

    /// Whether the field has a usable (non-empty, non-"false") value for
    /// filling. Boolean `false` means "do not touch this control".
    pub fn has_fill_value(&self, key: &str) -> bool {
        match self.get(key) {
            Some(v) => !v.eq_ignore_ascii_case("false"),
            None => false,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    /// The run-level message override wins over the stored profile message.
    pub fn with_message_override(mut self, message: &str) -> Self {
        let message = message.trim();
        if !message.is_empty() {
            self.set("message", message);
        }
        self
    }
}

/// One row of the input site list: 1-based index plus the raw cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRow {
    pub idx: usize,
    pub raw: String,
}

/// Which contact channel was ultimately used for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Form,
    Email,
    None,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Form => "form",
            ContactMethod::Email => "email",
            ContactMethod::None => "none",
        }
    }
}

/// Final classification for one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Success,
    Fail,
    EmailOnly,
    Skipped,
    NavFail,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Success => "success",
            SiteStatus::Fail => "fail",
            SiteStatus::EmailOnly => "email_only",
            SiteStatus::Skipped => "skipped",
            SiteStatus::NavFail => "nav_fail",
        }
    }
}

/// Evidence screenshot tags, at most one file per tag per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotTag {
    Loaded,
    Contact,
    Captcha,
    SubmitError,
    Postsubmit,
    NavFail,
}

impl ShotTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotTag::Loaded => "loaded",
            ShotTag::Contact => "contact",
            ShotTag::Captcha => "captcha",
            ShotTag::SubmitError => "submit_error",
            ShotTag::Postsubmit => "postsubmit",
            ShotTag::NavFail => "nav_fail",
        }
    }
}

/// Identifies the contact form on a page, by position in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInfo {
    pub has_form: bool,
    pub form_index: usize,
    pub has_textarea: bool,
    pub has_submit: bool,
}

/// Outcome of contact discovery on a single site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Whether discovery navigated away from the landing page.
    pub page_changed: bool,
    /// URL of the page discovery ended on.
    pub url: String,
    /// Email addresses found, deduplicated, in discovery order.
    pub emails: Vec<String>,
    pub form: FormInfo,
}

/// What to do with one form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillAction {
    Fill,
    Select,
    Check,
}

/// Addresses one control within one form, using the same enumeration the
/// driver uses for mutation, so the plan stays index-consistent with the
/// live DOM for the duration of filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTarget {
    pub form_index: usize,
    pub control_index: usize,
}

/// One precomputed assignment of a profile value to a form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillPlanEntry {
    pub target: PlanTarget,
    pub value: String,
    pub profile_key: String,
    pub action: FillAction,
}

/// The immutable record produced for every processed site row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteResult {
    pub idx: usize,
    pub input_url: String,
    pub final_url: String,
    pub method: ContactMethod,
    pub status: SiteStatus,
    pub reason: String,
    pub emails: Vec<String>,
    pub shots: BTreeMap<ShotTag, String>,
}

impl SiteResult {
    pub fn new(idx: usize, input_url: &str) -> Self {
        SiteResult {
            idx,
            input_url: input_url.to_string(),
            final_url: String::new(),
            method: ContactMethod::None,
            status: SiteStatus::Skipped,
            reason: String::new(),
            emails: Vec::new(),
            shots: BTreeMap::new(),
        }
    }
}

/// Per-run behavior switches, resolved once before the run starts.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Proxy server URL, empty for direct connections.
    pub proxy: String,
    /// Abort a site before submission when its CAPTCHA stays unsolved.
    pub halt_on_captcha: bool,
    /// Overrides the profile message when non-empty.
    pub message: String,
    /// Delegate CAPTCHA token solving to the external solver service.
    pub use_captcha_solver: bool,
    pub headless: bool,
    /// Verbose per-operation driver logging.
    pub trace: bool,
    /// Per-attempt navigation timeout in milliseconds.
    pub nav_timeout_ms: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            proxy: String::new(),
            halt_on_captcha: true,
            message: String::new(),
            use_captcha_solver: false,
            headless: true,
            trace: false,
            nav_timeout_ms: 15_000,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
