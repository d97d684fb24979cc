use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const DEFAULT_LOOKUP_URL: &str = "https://service-alerts.cct-datascience.xyz/alerts";

/// Source of pre-written toot text for an alert.
#[async_trait]
pub trait AlertLookup: Send + Sync {
    /// Public link for the alert, also used as the toot's attribution.
    fn alert_url(&self, alert_id: &str) -> String;

    async fn toot_text(&self, alert_id: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct PublishedAlert {
    toot_text: Option<String>,
}

pub struct HttpAlertLookup {
    base_url: String,
    client: Client,
}

impl HttpAlertLookup {
    pub fn new(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("SERVICE_ALERTS_LOOKUP_URL")
            .unwrap_or_else(|_| DEFAULT_LOOKUP_URL.to_owned());

        Self::new(&base_url, Client::new())
    }
}

#[async_trait]
impl AlertLookup for HttpAlertLookup {
    fn alert_url(&self, alert_id: &str) -> String {
        format!("{}/{}.json", self.base_url, alert_id)
    }

    async fn toot_text(&self, alert_id: &str) -> Result<Option<String>> {
        let url = self.alert_url(alert_id);

        let status = self.client.head(&url).send().await?.status();
        if status != StatusCode::OK {
            debug!("No published alert at {url} ({status})");
            return Ok(None);
        }

        let alert: PublishedAlert = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(alert.toot_text.filter(|text| !text.trim().is_empty()))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use httpmock::Method::{GET, HEAD};
    use httpmock::MockServer;
    use serde_json::json;
    use std::collections::HashMap;

    pub(crate) const TEST_LOOKUP_URL: &str = "https://alerts.example.com/alerts";

    /// In-memory lookup keyed by alert id.
    #[derive(Default)]
    pub(crate) struct StaticLookup {
        pub texts: HashMap<String, String>,
        pub fail: bool,
    }

    #[async_trait]
    impl AlertLookup for StaticLookup {
        fn alert_url(&self, alert_id: &str) -> String {
            format!("{TEST_LOOKUP_URL}/{alert_id}.json")
        }

        async fn toot_text(&self, alert_id: &str) -> Result<Option<String>> {
            if self.fail {
                anyhow::bail!("connection reset");
            }
            Ok(self.texts.get(alert_id).cloned())
        }
    }

    #[test]
    fn test_alert_url() {
        let lookup = HttpAlertLookup::new(DEFAULT_LOOKUP_URL, Client::new());
        assert_eq!(
            lookup.alert_url("1234"),
            "https://service-alerts.cct-datascience.xyz/alerts/1234.json"
        );
    }

    #[test]
    fn test_published_alert_without_toot_text() -> anyhow::Result<()> {
        let alert: PublishedAlert = serde_json::from_str(r#"{"Id": 1234, "title": "Outage"}"#)?;
        assert_eq!(alert.toot_text, None);

        Ok(())
    }

    #[test]
    fn test_published_alert_with_toot_text() -> anyhow::Result<()> {
        let alert: PublishedAlert =
            serde_json::from_str(r#"{"Id": 1234, "toot_text": "Water is off"}"#)?;
        assert_eq!(alert.toot_text.as_deref(), Some("Water is off"));

        Ok(())
    }

    fn server_lookup(server: &MockServer) -> HttpAlertLookup {
        HttpAlertLookup::new(&format!("{}/alerts", server.base_url()), Client::new())
    }

    #[tokio::test]
    async fn test_toot_text_missing_alert_skips_get() -> anyhow::Result<()> {
        let server = MockServer::start();
        let head = server.mock(|when, then| {
            when.method(HEAD).path("/alerts/1234.json");
            then.status(404);
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/alerts/1234.json");
            then.status(200).json_body(json!({ "toot_text": "Unexpected" }));
        });

        assert_eq!(server_lookup(&server).toot_text("1234").await?, None);
        assert_eq!(head.calls(), 1);
        assert_eq!(get.calls(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_toot_text_present() -> anyhow::Result<()> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/alerts/1234.json");
            then.status(200);
        });
        let get = server.mock(|when, then| {
            when.method(GET).path("/alerts/1234.json");
            then.status(200)
                .json_body(json!({ "Id": 1234, "toot_text": "Water is off in Obs." }));
        });

        assert_eq!(
            server_lookup(&server).toot_text("1234").await?.as_deref(),
            Some("Water is off in Obs.")
        );
        assert_eq!(get.calls(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_toot_text_absent_from_published_alert() -> anyhow::Result<()> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/alerts/1234.json");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/alerts/1234.json");
            then.status(200).json_body(json!({ "Id": 1234, "title": "Outage" }));
        });

        assert_eq!(server_lookup(&server).toot_text("1234").await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_toot_text_blank_is_ignored() -> anyhow::Result<()> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/alerts/1234.json");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/alerts/1234.json");
            then.status(200).json_body(json!({ "toot_text": "   " }));
        });

        assert_eq!(server_lookup(&server).toot_text("1234").await?, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_toot_text_get_failure_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/alerts/1234.json");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/alerts/1234.json");
            then.status(500);
        });

        assert!(server_lookup(&server).toot_text("1234").await.is_err());
    }
}
