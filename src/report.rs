//! Run summary and report artifacts.
//!
//! After the last site, the accumulated results become three things: a
//! per-site one-liner for the log stream, aggregate counts, and a pair of
//! timestamped CSV/JSON report files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use url::Url;

use crate::types::{ContactMethod, ShotTag, SiteResult, SiteStatus};

/// Aggregate counts by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    pub form_success: usize,
    pub form_fail: usize,
    pub email_only: usize,
    pub skipped: usize,
    pub nav_fail: usize,
    pub total: usize,
}

impl RunSummary {
    pub fn to_line(&self) -> String {
        format!(
            "form_success={} | form_fail={} | email_only={} | skipped={} | nav_fail={} | total={}",
            self.form_success, self.form_fail, self.email_only, self.skipped, self.nav_fail, self.total
        )
    }
}

pub fn summarize(results: &[SiteResult]) -> RunSummary {
    let mut summary = RunSummary {
        total: results.len(),
        ..RunSummary::default()
    };
    for r in results {
        match (r.method, r.status) {
            (ContactMethod::Form, SiteStatus::Success) => summary.form_success += 1,
            (ContactMethod::Form, SiteStatus::Fail) => summary.form_fail += 1,
            (_, SiteStatus::EmailOnly) => summary.email_only += 1,
            (_, SiteStatus::NavFail) => summary.nav_fail += 1,
            (_, SiteStatus::Skipped) => summary.skipped += 1,
            _ => {}
        }
    }
    summary
}

/// Concise, human-readable one-liner for the log stream.
pub fn code_line(result: &SiteResult) -> String {
    let host = Url::parse(&result.final_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| result.input_url.clone());

    let code = match (result.method, result.status) {
        (ContactMethod::Form, SiteStatus::Success) => "FORM_SUCCESS".to_string(),
        (ContactMethod::Form, SiteStatus::Fail) => {
            let reason = if result.reason.is_empty() {
                "unknown"
            } else {
                &result.reason
            };
            format!("FORM_FAIL({reason})")
        }
        (_, SiteStatus::EmailOnly) => format!("EMAIL_ONLY({})", result.emails.len()),
        (_, SiteStatus::NavFail) => {
            let reason = if result.reason.is_empty() {
                "error"
            } else {
                &result.reason
            };
            format!("NAV_FAIL({reason})")
        }
        _ => "SKIPPED".to_string(),
    };

    format!("[{}] {host} — {code}", result.idx)
}

/// Columns of the CSV report, shots flattened to one column per tag.
const CSV_FIELDS: &[&str] = &[
    "idx",
    "input_url",
    "final_url",
    "method",
    "status",
    "reason",
    "emails_count",
    "shot_loaded",
    "shot_contact",
    "shot_captcha",
    "shot_submit_error",
    "shot_postsubmit",
    "shot_nav_fail",
];

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(result: &SiteResult) -> String {
    let shot = |tag: ShotTag| result.shots.get(&tag).cloned().unwrap_or_default();
    let cells = [
        result.idx.to_string(),
        result.input_url.clone(),
        result.final_url.clone(),
        result.method.as_str().to_string(),
        result.status.as_str().to_string(),
        result.reason.clone(),
        result.emails.len().to_string(),
        shot(ShotTag::Loaded),
        shot(ShotTag::Contact),
        shot(ShotTag::Captcha),
        shot(ShotTag::SubmitError),
        shot(ShotTag::Postsubmit),
        shot(ShotTag::NavFail),
    ];
    cells
        .iter()
        .map(|c| csv_escape(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write `summary_{ts}.csv` and `summary_{ts}.json` under `dir`, one
/// row/object per result. Returns the two paths.
pub fn write_reports(dir: &Path, results: &[SiteResult]) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create report dir: {}", dir.display()))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let csv_path = dir.join(format!("summary_{ts}.csv"));
    let json_path = dir.join(format!("summary_{ts}.json"));

    let mut csv = String::new();
    csv.push_str(&CSV_FIELDS.join(","));
    csv.push('\n');
    for result in results {
        csv.push_str(&csv_row(result));
        csv.push('\n');
    }
    std::fs::write(&csv_path, csv)
        .with_context(|| format!("Cannot write report: {}", csv_path.display()))?;

    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("Cannot write report: {}", json_path.display()))?;

    Ok((csv_path, json_path))
}

#[cfg(test)]
#[path = "report_test.rs"]
mod report_test;
