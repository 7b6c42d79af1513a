//! Shared HTTP client with User-Agent rotation for upstream requests.
//!
//! The Ministry page sits behind a CDN that occasionally rejects obvious
//! non-browser clients, so requests carry realistic browser headers.

use crate::config::SourceConfig;
use crate::error::SourceError;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Realistic browser User-Agent strings, rotated per client.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Build a [`reqwest::Client`] for upstream requests.
///
/// The client has:
/// - Cookie store enabled (the Ministry page sets a session cookie)
/// - Timeout from config, applied to the whole request including body
/// - Random User-Agent from the rotation list (or custom if configured)
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SourceConfig) -> Result<reqwest::Client, SourceError> {
    let ua = match config.user_agent {
        Some(ref custom) => custom.clone(),
        None => random_user_agent().to_owned(),
    };

    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // SAFETY: USER_AGENTS is a non-empty const array, choose only returns None on empty slices
        .unwrap_or(USER_AGENTS[0])
}

/// GET `url` and return the body as text, bounded by `timeout`.
///
/// The outer [`tokio::time::timeout`] guards against servers that trickle
/// a body slowly enough to dodge the client's own timer.
pub(crate) async fn get_text(
    client: &reqwest::Client,
    url: url::Url,
    timeout: Duration,
    context: &str,
) -> Result<String, SourceError> {
    tracing::trace!(%url, "upstream request");

    let request = async {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(context, e))?
            .error_for_status()
            .map_err(|e| SourceError::from_reqwest(context, e))?;
        response
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(context, e))
    };

    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(format!(
            "{context}: no response within {}s",
            timeout.as_secs()
        ))),
    }
}
