//! One-shot headless Chromium rendering, used only as the escalation
//! path after a blocking signal.

use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use olx_common::ScrapeError;

const RENDER_TIMEOUT: Duration = Duration::from_secs(30);
/// Virtual-time budget granted after navigation, in ms. Acts as the
/// settle delay for late-running scripts before the DOM is dumped.
const SETTLE_BUDGET_MS: u32 = 2000;

pub struct Renderer {
    chrome_bin: String,
}

impl Renderer {
    pub fn new(chrome_bin: impl Into<String>) -> Self {
        Self {
            chrome_bin: chrome_bin.into(),
        }
    }

    /// Render `url` in an isolated browser process and return the DOM.
    ///
    /// Teardown is guaranteed on every exit path: the process exits on
    /// its own after `--dump-dom`, is killed if the timeout drops the
    /// future, and the profile directory is removed when the guard
    /// goes out of scope.
    pub async fn render(&self, url: &str) -> Result<String, ScrapeError> {
        let parsed = url::Url::parse(url).map_err(|e| ScrapeError::Render {
            url: url.to_string(),
            reason: format!("invalid URL: {e}"),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ScrapeError::Render {
                url: url.to_string(),
                reason: format!("unsupported scheme: {}", parsed.scheme()),
            });
        }

        let profile_dir = tempfile::tempdir().map_err(|e| ScrapeError::Render {
            url: url.to_string(),
            reason: format!("failed to create profile dir: {e}"),
        })?;

        info!(url, "Escalating to headless rendering");

        let mut cmd = Command::new(&self.chrome_bin);
        cmd.args([
            "--headless",
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            &format!("--user-data-dir={}", profile_dir.path().display()),
            &format!("--virtual-time-budget={SETTLE_BUDGET_MS}"),
            "--dump-dom",
            url,
        ]);
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(RENDER_TIMEOUT, cmd.output())
            .await
            .map_err(|_| ScrapeError::Render {
                url: url.to_string(),
                reason: format!("timed out after {}s", RENDER_TIMEOUT.as_secs()),
            })?
            .map_err(|e| ScrapeError::Render {
                url: url.to_string(),
                reason: format!("failed to launch {}: {e}", self.chrome_bin),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, %stderr, "Chromium exited with error");
            return Err(ScrapeError::Render {
                url: url.to_string(),
                reason: format!("chromium exited with {}", output.status),
            });
        }
        if output.stdout.is_empty() {
            return Err(ScrapeError::Render {
                url: url.to_string(),
                reason: "empty DOM output".to_string(),
            });
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        info!(url, bytes = html.len(), "Rendered page captured");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let renderer = Renderer::new("chromium");
        let err = renderer.render("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Render { .. }));
    }

    #[tokio::test]
    async fn rejects_unparseable_urls() {
        let renderer = Renderer::new("chromium");
        assert!(renderer.render("not a url").await.is_err());
    }
}
