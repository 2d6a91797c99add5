//! Run orchestration.
//!
//! Owns the browser session for the whole run, walks the site list in row
//! order, funnels every row through the per-site pipeline, and closes with
//! aggregate counts plus CSV/JSON reports. The browser is released on every
//! exit path; no per-site failure ever aborts the run.

use std::path::PathBuf;

use crate::captcha::CaptchaConfig;
use crate::driver::PageDriver;
use crate::errors::RunError;
use crate::logsink::LogSink;
use crate::pipeline::{process_site, SiteContext};
use crate::report::{code_line, summarize, write_reports, RunSummary};
use crate::sitelist::{is_header_like, read_site_rows};
use crate::types::{Profile, RunOptions, SiteResult};
use crate::webdriver::{Browser, BrowserType};

/// Everything a run needs, resolved before it starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sites_file: PathBuf,
    pub profile: Profile,
    pub options: RunOptions,
    pub captcha: CaptchaConfig,
    pub browser: BrowserType,
    /// Root for screenshots and reports.
    pub out_dir: PathBuf,
}

impl RunConfig {
    pub fn shots_dir(&self) -> PathBuf {
        self.out_dir.join("shots")
    }
}

/// Iterate the site list against an already-launched driver.
///
/// Row order is preserved; empty cells and header-like tokens (`website`,
/// `url`, `domain`, `site`) are skipped wherever they occur and produce no
/// result. Everything else yields exactly one [`SiteResult`].
pub async fn run_sites(
    driver: &dyn PageDriver,
    config: &RunConfig,
    log: &LogSink,
) -> Result<(RunSummary, Vec<SiteResult>), RunError> {
    let rows = read_site_rows(&config.sites_file)?;
    log.line(format!(
        "Site list loaded: {} row(s) from {}",
        rows.len(),
        config.sites_file.display()
    ));

    let shots_dir = config.shots_dir();
    std::fs::create_dir_all(&shots_dir)
        .map_err(|e| RunError::Artifacts(format!("{}: {e}", shots_dir.display())))?;

    // The UI-provided message wins over the stored profile message.
    let profile = config
        .profile
        .clone()
        .with_message_override(&config.options.message);

    let ctx = SiteContext {
        driver,
        profile: &profile,
        options: &config.options,
        captcha: &config.captcha,
        shots_dir: &shots_dir,
        log,
    };

    let mut results: Vec<SiteResult> = Vec::new();
    for row in &rows {
        if row.raw.is_empty() || is_header_like(&row.raw) {
            continue;
        }
        let result = process_site(&ctx, row).await;
        log.line(code_line(&result));
        results.push(result);
    }

    let summary = summarize(&results);
    log.line("=== Summary ===");
    log.line(summary.to_line());

    let (csv_path, json_path) = write_reports(&config.out_dir, &results)
        .map_err(|e| RunError::Artifacts(e.to_string()))?;
    log.line(format!("Report: {}", csv_path.display()));
    log.line(format!("Report: {}", json_path.display()));

    Ok((summary, results))
}

/// Launch the browser, run the site list, and always release the session —
/// including when the run itself fails.
pub async fn execute_run(config: RunConfig, log: LogSink) -> Result<RunSummary, RunError> {
    let browser = Browser::launch(
        config.browser,
        config.options.headless,
        &config.options.proxy,
        config.options.trace,
    )
    .await
    .map_err(|e| {
        let err = RunError::BrowserLaunch(format!("{e:#}"));
        log.line(err.to_string());
        err
    })?;
    log.line(format!(
        "Browser launched: {:?} | headless={} | proxy={}",
        config.browser,
        config.options.headless,
        if config.options.proxy.is_empty() { "no" } else { "yes" }
    ));

    let outcome = run_sites(&browser, &config, &log).await;

    if let Err(e) = browser.close().await {
        log.line(format!("Browser close failed: {e}"));
    }

    match outcome {
        Ok((summary, _results)) => Ok(summary),
        Err(e) => {
            log.line(e.to_string());
            Err(e)
        }
    }
}
