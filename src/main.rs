#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitereach::captcha::CaptchaConfig;
use sitereach::errors::RunError;
use sitereach::job::spawn_run;
use sitereach::runner::RunConfig;
use sitereach::types::{Profile, RunOptions};
use sitereach::webdriver::BrowserType;

const EXIT_SUCCESS: i32 = 0;
const EXIT_COMMAND_ERROR: i32 = 1;

#[derive(Parser)]
#[command(name = "sitereach")]
#[command(about = "Automated contact-form outreach over a site list", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a site list: discover each site's contact channel, fill and
    /// submit its contact form, and write reports
    Run {
        /// Site list file (one URL per row; first CSV cell is used)
        #[arg(long)]
        sites: PathBuf,

        /// Contact profile JSON file (flat object of field → value)
        #[arg(long)]
        profile: PathBuf,

        /// Proxy server URL (empty for a direct connection)
        #[arg(long, default_value = "")]
        proxy: String,

        /// Fail a site before submission when its CAPTCHA stays unsolved
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        halt_on_captcha: bool,

        /// Message for this run; overrides the profile message when set
        #[arg(long, default_value = "")]
        message: String,

        /// Delegate CAPTCHA token solving to the external solver service
        #[arg(long)]
        use_captcha_solver: bool,

        /// Browser to drive (firefox, chrome); falls back to $BROWSER
        #[arg(long)]
        browser: Option<String>,

        /// Run the browser headless; defaults to true unless HEADFUL=1
        #[arg(long, action = ArgAction::Set)]
        headless: Option<bool>,

        /// Verbose per-operation driver logging
        #[arg(long)]
        trace: bool,

        /// Output directory for screenshots and reports
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Per-attempt navigation timeout in milliseconds
        #[arg(long, default_value_t = 15_000)]
        nav_timeout_ms: u64,
    },
}

/// Headless unless the user said otherwise, here or via HEADFUL=1.
fn resolve_headless(explicit: Option<bool>) -> bool {
    match explicit {
        Some(value) => value,
        None => std::env::var("HEADFUL").map(|v| v != "1").unwrap_or(true),
    }
}

fn resolve_browser(explicit: Option<String>) -> Result<BrowserType> {
    let name = explicit
        .or_else(|| std::env::var("BROWSER").ok())
        .unwrap_or_else(|| "firefox".to_string());
    BrowserType::from_str(&name)
}

fn default_out_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sitereach"))
        .unwrap_or_else(|| PathBuf::from("sitereach_artifacts"))
}

async fn run() -> Result<(), RunError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            sites,
            profile,
            proxy,
            halt_on_captcha,
            message,
            use_captcha_solver,
            browser,
            headless,
            trace,
            out_dir,
            nav_timeout_ms,
        } => {
            let profile = Profile::load(&profile)
                .map_err(|e| RunError::Profile(format!("{e:#}")))?;
            let browser = resolve_browser(browser)
                .map_err(|e| RunError::BrowserLaunch(e.to_string()))?;

            let config = RunConfig {
                sites_file: sites,
                profile,
                options: RunOptions {
                    proxy,
                    halt_on_captcha,
                    message,
                    use_captcha_solver,
                    headless: resolve_headless(headless),
                    trace,
                    nav_timeout_ms,
                },
                captcha: CaptchaConfig::from_env(),
                browser,
                out_dir: out_dir.unwrap_or_else(default_out_dir),
            };

            // The run is detached; this process is just one observer of its
            // log stream.
            let job = spawn_run(config);
            let mut logs = job.log_stream();
            let printer = tokio::spawn(async move {
                loop {
                    match logs.recv().await {
                        Ok(line) => println!("{line}"),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            let summary = job.wait().await?;
            // The job handle is gone, so the log stream closes and the
            // printer drains the remaining lines before exiting.
            let _ = printer.await;
            println!("{}", summary.to_line());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so report/summary output on stdout stays clean.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitereach=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    match run().await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("Error: {err}");
            let code = err.exit_code();
            std::process::exit(if code == 0 { EXIT_COMMAND_ERROR } else { code });
        }
    }
}
