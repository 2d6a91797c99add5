//! Automatic WebDriver process management.
//!
//! A run needs exactly one driver process (geckodriver or chromedriver).
//! An externally started driver on the standard port is preferred; when none
//! answers, one is spawned and kept for the lifetime of the process.

use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::webdriver::BrowserType;

lazy_static! {
    pub static ref GLOBAL_WEBDRIVER_MANAGER: WebDriverManager = WebDriverManager::new();
}

/// Manages WebDriver processes (geckodriver, chromedriver).
pub struct WebDriverManager {
    managed: Mutex<Vec<ManagedDriver>>,
}

struct ManagedDriver {
    browser_type: BrowserType,
    child: Child,
    url: String,
}

impl WebDriverManager {
    pub fn new() -> Self {
        WebDriverManager {
            managed: Mutex::new(Vec::new()),
        }
    }

    fn standard_url(browser_type: &BrowserType) -> &'static str {
        match browser_type {
            BrowserType::Firefox => "http://localhost:4444",
            BrowserType::Chrome => "http://localhost:9515",
        }
    }

    fn driver_binary(browser_type: &BrowserType) -> &'static str {
        match browser_type {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }

    /// Ensure a WebDriver is reachable for the browser type; returns its
    /// base URL. Spawns the driver binary when nothing answers.
    pub async fn ensure_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let managed_url = {
            let managed = self.managed.lock().unwrap();
            managed
                .iter()
                .find(|d| d.browser_type == *browser_type)
                .map(|d| d.url.clone())
        };
        if let Some(url) = managed_url {
            if Self::is_driver_running(&url).await {
                debug!("Using existing managed WebDriver at {}", url);
                return Ok(url);
            }
        }

        let standard = Self::standard_url(browser_type);
        if Self::is_driver_running(standard).await {
            debug!("Found external WebDriver at {}", standard);
            return Ok(standard.to_string());
        }

        info!("WebDriver not detected, attempting to start automatically...");
        self.start_driver(browser_type).await
    }

    async fn start_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let binary = Self::driver_binary(browser_type);
        let url = Self::standard_url(browser_type).to_string();
        let port = url.rsplit(':').next().unwrap_or("4444").to_string();

        let args = match browser_type {
            BrowserType::Firefox => vec!["--port".to_string(), port],
            BrowserType::Chrome => vec![format!("--port={port}")],
        };

        info!("Starting {} on {}", binary, url);
        let child = Command::new(binary)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| {
                format!(
                    "{binary} not found in PATH. Please install it:\n\
                       macOS: brew install {binary}\n\
                       Linux: download from the official releases"
                )
            })?;

        // Give the driver a bounded window to come up.
        for _ in 0..25 {
            if Self::is_driver_running(&url).await {
                self.managed.lock().unwrap().push(ManagedDriver {
                    browser_type: *browser_type,
                    child,
                    url: url.clone(),
                });
                return Ok(url);
            }
            sleep(Duration::from_millis(200)).await;
        }

        anyhow::bail!("{binary} started but never answered on {url}")
    }

    /// Kill the managed driver for a browser type, if any. Used for session
    /// recovery when the driver wedges.
    pub fn kill_driver(&self, browser_type: &BrowserType) {
        let mut managed = self.managed.lock().unwrap();
        managed.retain_mut(|d| {
            if d.browser_type == *browser_type {
                if let Err(e) = d.child.kill() {
                    warn!("Could not kill {}: {e}", Self::driver_binary(browser_type));
                }
                let _ = d.child.wait();
                false
            } else {
                true
            }
        });
    }

    async fn is_driver_running(url: &str) -> bool {
        let status_url = format!("{url}/status");
        match reqwest::get(&status_url).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

impl Default for WebDriverManager {
    fn default() -> Self {
        Self::new()
    }
}
