//! # sitereach
#![allow(clippy::uninlined_format_args)]
//!
//! Automated contact-form outreach over a list of target websites.
//!
//! Given a site list and a user contact profile, sitereach drives a real
//! browser through each site: it normalizes the raw URL into navigation
//! candidates, dismisses cookie/consent popups, finds a contact channel
//! (a contact form, or visible/`mailto` email addresses as fallback), maps
//! profile fields onto the form's controls by heuristic scoring, handles
//! reCAPTCHA challenges inline or through an external token solver, submits,
//! and classifies the outcome strictly from on-page wording. Each site ends
//! as one immutable result with screenshot evidence; each run ends with
//! aggregate counts and CSV/JSON reports.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Submit the contact form of every site in the list
//! sitereach run --sites sites.csv --profile profile.json
//!
//! # Override the stored profile message for this run
//! sitereach run --sites sites.csv --profile profile.json \
//!     --message "Hi! We'd love to work with you."
//!
//! # Route through a proxy, keep going past unsolved CAPTCHAs
//! sitereach run --sites sites.csv --profile profile.json \
//!     --proxy http://127.0.0.1:8080 --halt-on-captcha false
//!
//! # Delegate CAPTCHA solving to the external token solver
//! CAPTCHA_USER=me CAPTCHA_PASS=secret \
//!     sitereach run --sites sites.csv --profile profile.json --use-captcha-solver
//!
//! # Watch the browser work (headful) with Chrome instead of Firefox
//! sitereach run --sites sites.csv --profile profile.json \
//!     --browser chrome --headless false
//! ```
//!
//! The site list is one URL per row (first CSV cell); header-like cells
//! (`website`, `url`, `domain`, `site`) are skipped wherever they appear.
//! The profile is a flat JSON object, e.g.:
//!
//! ```json
//! {
//!   "first_name": "Jane",
//!   "last_name": "Doe",
//!   "email": "jane@example.com",
//!   "phone_number": "+1 555 123 4567",
//!   "message": "Hello! ..."
//! }
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use sitereach::{spawn_run, BrowserType, CaptchaConfig, Profile, RunConfig, RunOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RunConfig {
//!     sites_file: "sites.csv".into(),
//!     profile: Profile::from_pairs([("email", "jane@example.com")]),
//!     options: RunOptions::default(),
//!     captcha: CaptchaConfig::from_env(),
//!     browser: BrowserType::Firefox,
//!     out_dir: "artifacts".into(),
//! };
//!
//! // Fire and forget: the handle returns immediately, progress arrives on
//! // the log stream, the summary on wait().
//! let job = spawn_run(config);
//! let mut logs = job.log_stream();
//! tokio::spawn(async move {
//!     while let Ok(line) = logs.recv().await {
//!         println!("{line}");
//!     }
//! });
//! let summary = job.wait().await?;
//! println!("{}", summary.to_line());
//! # Ok(())
//! # }
//! ```
//!
//! The processing core is written against the abstract
//! [`driver::PageDriver`] capability; [`webdriver::Browser`] is the
//! WebDriver-backed production implementation, and tests drive the same
//! pipeline with a scripted fake.

/// CAPTCHA detection, inline checkbox handling and token solving
pub mod captcha;

/// Contact-channel discovery (contact links, common paths, emails)
pub mod discovery;

/// Abstract browser-driving capability and DOM snapshots
pub mod driver;

/// Site-level and run-level error taxonomy
pub mod errors;

/// Contact-form detection and heuristic fill planning
pub mod forms;

/// Fire-and-forget run jobs
pub mod job;

/// Run-owned log/event sink
pub mod logsink;

/// Candidate-list navigation
pub mod navigate;

/// Per-site processing pipeline
pub mod pipeline;

/// Conservative cookie/consent dismissal
pub mod popups;

/// Summary aggregation and CSV/JSON reports
pub mod report;

/// Run orchestration and configuration
pub mod runner;

/// Site-list input
pub mod sitelist;

/// Plan application, submission and outcome classification
pub mod submit;

/// Core data model
pub mod types;

/// URL sanitization and candidate generation
pub mod urlnorm;

/// WebDriver-backed browser implementation
pub mod webdriver;

/// Automatic WebDriver process management
pub mod webdriver_manager;

pub use captcha::{CaptchaConfig, CaptchaState};
pub use driver::{DriverError, PageDriver};
pub use errors::{RunError, SiteError};
pub use job::{spawn_run, RunJob};
pub use logsink::LogSink;
pub use report::RunSummary;
pub use runner::{execute_run, run_sites, RunConfig};
pub use types::{
    ContactMethod, DiscoveryResult, FormInfo, Profile, RunOptions, ShotTag, SiteResult, SiteRow,
    SiteStatus,
};
pub use webdriver::{Browser, BrowserType};
