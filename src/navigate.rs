//! Candidate-list navigation.

use std::time::Duration;

use crate::driver::PageDriver;
use crate::errors::SiteError;
use crate::logsink::LogSink;

/// Try each candidate URL in order with a fixed per-attempt timeout and stop
/// at the first one whose page reaches the content-loaded state.
///
/// Exhausting the list is not an exception: the accumulated last error comes
/// back as [`SiteError::NavigationFailure`] for the caller to turn into a
/// `nav_fail` result.
pub async fn navigate_candidates(
    driver: &dyn PageDriver,
    candidates: &[String],
    timeout: Duration,
    log: &LogSink,
) -> Result<String, SiteError> {
    let mut last_error = String::new();

    for (attempt, url) in candidates.iter().enumerate() {
        log.line(format!("Navigating (attempt {}): {url}", attempt + 1));
        match driver.goto(url, timeout).await {
            Ok(()) => {
                let landed = driver.current_url().await.unwrap_or_else(|_| url.clone());
                log.line(format!("Loaded: {landed}"));
                return Ok(landed);
            }
            Err(e) => {
                log.line(format!("Attempt {} failed: {e}", attempt + 1));
                last_error = e.to_string();
            }
        }
    }

    Err(SiteError::NavigationFailure(last_error))
}
