use std::env;

/// Service configuration loaded from environment variables.
///
/// Everything has a default; the service comes up with no environment
/// at all and only misbehaving values panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum spacing between outbound requests, before jitter.
    pub request_delay_ms: u64,
    /// Whether the headless-rendering escalation path is allowed.
    pub render_enabled: bool,
    /// Chromium binary used for rendering.
    pub chrome_bin: String,

    // Web server
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            request_delay_ms: env::var("REQUEST_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .expect("REQUEST_DELAY_MS must be a number"),
            render_enabled: env::var("RENDER_ENABLED")
                .map(|v| v != "false")
                .unwrap_or(true),
            chrome_bin: env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a number"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_delay_ms: 2000,
            render_enabled: true,
            chrome_bin: "chromium".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}
