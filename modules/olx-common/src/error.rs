use thiserror::Error;

/// Error taxonomy for the scraping core.
///
/// A blocking signal (captcha page, 403/429) is deliberately NOT a
/// variant here: it is an internal condition that triggers escalation
/// to rendering. Only terminal outcomes surface to callers.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("retrieval failed for {url}: {reason}")]
    Retrieval { url: String, reason: String },

    #[error("upstream returned status {code} for {url}")]
    Status { code: u16, url: String },

    #[error("headless rendering failed for {url}: {reason}")]
    Render { url: String, reason: String },

    #[error("headless rendering is disabled and the direct request was blocked")]
    RenderDisabled,

    #[error("unexpected payload from {url}: {reason}")]
    Payload { url: String, reason: String },
}

impl ScrapeError {
    /// Status code carried by the error, if any. The route layer uses
    /// this to map an upstream 404 onto a not-found response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ScrapeError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}
