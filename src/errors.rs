use thiserror::Error;

/// Failures that can end the processing of a single site.
///
/// These never escape the per-site pipeline: the orchestrator boundary
/// converts every variant into a [`crate::types::SiteResult`] with an
/// appropriate status and reason string. Only programmer errors panic.
#[derive(Debug, Error)]
pub enum SiteError {
    /// No valid host could be recovered from the raw input.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Every candidate URL failed to load; carries the last error.
    #[error("navigation failed: {0}")]
    NavigationFailure(String),

    /// Contact discovery broke; non-fatal, degrades to "no form/no email".
    #[error("contact discovery failed: {0}")]
    DiscoveryFailure(String),

    /// A CAPTCHA was detected and could not be solved.
    #[error("captcha")]
    CaptchaUnsolved,

    /// The submit control could not be clicked.
    #[error("submit_click: {0}")]
    SubmitClickFailure(String),
}

/// Failures fatal to a whole run. Surfaced to the run's log stream and the
/// job result; never retried automatically.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot read site list: {0}")]
    SiteList(String),

    #[error("cannot read profile: {0}")]
    Profile(String),

    #[error("cannot launch browser automation: {0}")]
    BrowserLaunch(String),

    #[error("cannot write run artifacts: {0}")]
    Artifacts(String),

    /// The detached run task died without producing a result.
    #[error("run ended unexpectedly: {0}")]
    Aborted(String),
}

impl RunError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::SiteList(_) | RunError::Profile(_) => 2,
            RunError::BrowserLaunch(_) => 4,
            RunError::Artifacts(_) | RunError::Aborted(_) => 1,
        }
    }
}
