use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::json;

struct SecretString(String);

impl SecretString {
    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Somewhere to publish a toot.
#[async_trait]
pub trait Poster: Send + Sync {
    async fn post(&self, text: &str) -> Result<()>;
}

#[derive(Debug)]
pub struct MastodonClient {
    access_token: SecretString,
    base_url: String,
    client: Client,
}

impl MastodonClient {
    pub fn new(access_token: String, base_url: &str, client: Client) -> Self {
        Self {
            access_token: SecretString(access_token),
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        }
    }

    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("MASTODON_ACCESS_TOKEN")
            .context("MASTODON_ACCESS_TOKEN env var not set")?;

        let base_url =
            std::env::var("MASTODON_BASE_URL").context("MASTODON_BASE_URL env var not set")?;

        Ok(Self::new(access_token, &base_url, Client::new()))
    }

    fn statuses_url(&self) -> String {
        format!("{}/api/v1/statuses", self.base_url)
    }
}

#[async_trait]
impl Poster for MastodonClient {
    async fn post(&self, text: &str) -> Result<()> {
        debug!("Posting {} chars to {}", text.chars().count(), self.base_url);

        self.client
            .post(self.statuses_url())
            .bearer_auth(self.access_token.expose())
            .json(&json!({ "status": text }))
            .send()
            .await?
            .error_for_status()
            .context("Mastodon rejected status")?;

        info!("Posted status to {}", self.base_url);

        Ok(())
    }
}

/// Logs toots instead of publishing them.
#[derive(Debug, Default)]
pub struct DryRunPoster;

#[async_trait]
impl Poster for DryRunPoster {
    async fn post(&self, text: &str) -> Result<()> {
        info!("Dry run, not posting:\n{text}");
        Ok(())
    }
}
