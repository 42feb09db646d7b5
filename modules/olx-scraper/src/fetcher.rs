//! Paced, identity-rotating page retrieval with a single escalation to
//! headless rendering on a blocking signal.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{header, redirect, StatusCode};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use olx_common::{Config, ScrapeError};

use crate::renderer::Renderer;

/// Retrieval seam. The aggregator and route layer depend on this trait
/// so tests can drive them with canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn retrieve(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Extra random delay added on top of the configured base, in ms.
const JITTER_WINDOW_MS: u64 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_REDIRECTS: usize = 5;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:126.0) Gecko/20100101 Firefox/126.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
];

/// Outcome of one direct retrieval attempt. Blocking is a signal that
/// drives escalation, not an error.
enum FetchOutcome {
    Delivered(String),
    Blocked,
}

pub struct Fetcher {
    client: reqwest::Client,
    renderer: Renderer,
    render_enabled: bool,
    base_delay: Duration,
    /// Instant the previous request was sent. The mutex is held across
    /// the whole pacing gate so the read-sleep-write sequence of two
    /// callers never interleaves.
    last_sent: Mutex<Option<Instant>>,
}

impl Fetcher {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            renderer: Renderer::new(config.chrome_bin.clone()),
            render_enabled: config.render_enabled,
            base_delay: Duration::from_millis(config.request_delay_ms),
            last_sent: Mutex::new(None),
        }
    }

    /// Suspend until at least `base_delay + random jitter` has passed
    /// since the previous send, then claim the current instant. Every
    /// request from every caller serializes through this gate.
    async fn pace(&self) {
        let mut last = self.last_sent.lock().await;
        let jitter = rand::rng().random_range(0..JITTER_WINDOW_MS);
        let min_delay = self.base_delay + Duration::from_millis(jitter);
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < min_delay {
                tokio::time::sleep(min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn pick_user_agent() -> &'static str {
        USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())]
    }

    async fn attempt(&self, url: &str) -> Result<FetchOutcome, ScrapeError> {
        self.pace().await;

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, Self::pick_user_agent())
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "pl-PL,pl;q=0.9,en-US;q=0.5,en;q=0.3")
            .header(header::REFERER, "https://www.olx.pl/")
            .header(header::CACHE_CONTROL, "max-age=0")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "same-origin")
            .header("Sec-Fetch-User", "?1")
            .send()
            .await
            .map_err(|e| ScrapeError::Retrieval {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(url, status = status.as_u16(), "Blocked by status code");
            return Ok(FetchOutcome::Blocked);
        }
        if !status.is_success() {
            return Err(ScrapeError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| ScrapeError::Retrieval {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(classify_body(url, body))
    }

    /// Run the blocked branch of the state machine: fail fast when
    /// rendering is administratively off, otherwise make the single
    /// escalation attempt.
    async fn escalate(&self, url: &str) -> Result<String, ScrapeError> {
        if !self.render_enabled {
            return Err(ScrapeError::RenderDisabled);
        }
        // One escalation only: the rendered result is final even if
        // it still carries challenge markers.
        self.renderer.render(url).await
    }
}

/// Classify a delivered body. A challenge page can arrive with a 200,
/// so this runs on every success status.
fn classify_body(url: &str, body: String) -> FetchOutcome {
    if is_challenge(&body) {
        warn!(url, "Challenge marker in response body");
        return FetchOutcome::Blocked;
    }
    debug!(url, bytes = body.len(), "Page delivered");
    FetchOutcome::Delivered(body)
}

/// Challenge markers that mean the source is withholding the real page.
fn is_challenge(body: &str) -> bool {
    body.contains("captcha") || body.contains("cf-challenge")
}

#[async_trait]
impl PageFetcher for Fetcher {
    async fn retrieve(&self, url: &str) -> Result<String, ScrapeError> {
        match self.attempt(url).await? {
            FetchOutcome::Delivered(body) => Ok(body),
            FetchOutcome::Blocked => self.escalate(url).await,
        }
    }
}
