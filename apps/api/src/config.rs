use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Resolved once at startup and passed explicitly via `AppState` —
/// no component reads configuration from a global.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub postmark_server_token: String,
    pub email_from: String,
    /// Base URL of the employee-facing portal, used for registration links.
    pub public_base_url: String,
    /// Explicit Chromium binary for the PDF renderer. Defaults to whatever
    /// the browser launcher can discover on PATH.
    pub chrome_executable: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            postmark_server_token: require_env("POSTMARK_SERVER_TOKEN")?,
            email_from: require_env("EMAIL_FROM")?,
            public_base_url: require_env("PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
