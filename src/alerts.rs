use aws_config::BehaviorVersion;
use log::{debug, info, warn};
use serde_json::Value;

use crate::archive::{Archive, S3Archive};
use crate::compose::{body_budget, build_prompt, compose_toot, fallback_toot};
use crate::error::BotError;
use crate::generate::{BedrockCompletion, TextGenerator};
use crate::lookup::{AlertLookup, HttpAlertLookup};
use crate::mastodon::Poster;
use crate::sanitize::sanitize_alert;
use crate::types::{Alert, HandlerResponse, SnsEvent, parse_alerts};

const ID_FIELD: &str = "Id";
const TOOT_TEXT_FIELD: &str = "toot_text";

/// Turns service alert records into toots.
///
/// Sourcing the text is best-effort: if neither the lookup endpoint nor the generator produces
/// usable text, a fallback notice pointing at the alert link is posted instead. An alert whose link
/// is too long for even the fallback notice is skipped. Any other failure (a malformed event or
/// record, archiving, posting) aborts the rest of the batch.
pub struct ServiceAlertsBot {
    poster: Box<dyn Poster>,
    lookup: Box<dyn AlertLookup>,
    generator: TextGenerator,
    archive: Option<Box<dyn Archive>>,
}

impl ServiceAlertsBot {
    pub fn new(
        poster: Box<dyn Poster>,
        lookup: Box<dyn AlertLookup>,
        generator: TextGenerator,
        archive: Option<Box<dyn Archive>>,
    ) -> Self {
        Self {
            poster,
            lookup,
            generator,
            archive,
        }
    }

    /// Wires up the production lookup, Bedrock generator and (if configured) S3 archive.
    pub async fn from_env(poster: Box<dyn Poster>, with_archive: bool) -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;

        let generator = TextGenerator::new(Box::new(BedrockCompletion::from_env(&sdk_config)));
        let archive = if with_archive {
            S3Archive::from_env(&sdk_config).map(|a| Box::new(a) as Box<dyn Archive>)
        } else {
            None
        };

        Self::new(
            poster,
            Box::new(HttpAlertLookup::from_env()),
            generator,
            archive,
        )
    }

    pub async fn handle_event(&self, event: &Value) -> HandlerResponse {
        let result = async {
            let message = SnsEvent::from_value(event)?.into_message()?;
            let alerts = parse_alerts(&message)?;
            self.process_alerts(alerts).await
        }
        .await;

        if let Err(e) = &result {
            warn!("Aborting batch with {}: {}", e.kind(), e);
        }

        HandlerResponse::from(result)
    }

    pub async fn process_alerts(&self, alerts: Vec<Alert>) -> Result<(), BotError> {
        info!("Processing {} alerts", alerts.len());

        for alert in alerts {
            self.process_alert(alert).await?;
        }

        Ok(())
    }

    async fn process_alert(&self, mut alert: Alert) -> Result<(), BotError> {
        let alert_id = alert_id(&alert)?;
        let link = self.lookup.alert_url(&alert_id);
        debug!("Processing alert {alert_id}");

        let fallback = match fallback_toot(&link) {
            Ok(toot) => toot,
            Err(e) => {
                warn!("Skipping alert '{alert_id}', its link leaves no room for a toot: {e}");
                return Ok(());
            }
        };

        sanitize_alert(&mut alert)?;

        let body = match self.prewritten_text(&alert_id).await {
            Some(text) => Some(text),
            None => self.generated_text(&alert, &alert_id, &link).await,
        };

        let toot = match body.as_deref().map(|b| compose_toot(b, &link)) {
            Some(Ok(toot)) => toot,
            Some(Err(e)) => {
                warn!("Text for '{alert_id}' does not fit: {e}");
                fallback
            }
            None => fallback,
        };

        if let Some(archive) = &self.archive {
            let key = archive.key_for(&alert_id);
            alert.insert(TOOT_TEXT_FIELD.to_owned(), Value::String(toot.clone()));

            archive
                .store(&key, &Value::Object(alert))
                .await
                .map_err(BotError::Archive)?;
            debug!("Archived alert {alert_id} to {key}");
        }

        self.poster.post(&toot).await.map_err(BotError::Post)?;
        info!("Posted toot for alert {alert_id}");

        Ok(())
    }

    async fn prewritten_text(&self, alert_id: &str) -> Option<String> {
        match self.lookup.toot_text(alert_id).await {
            Ok(Some(text)) => {
                info!("Using pre-written text for '{alert_id}'");
                Some(text)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to look up text for '{alert_id}': {e:#}");
                None
            }
        }
    }

    async fn generated_text(&self, alert: &Alert, alert_id: &str, link: &str) -> Option<String> {
        let toot_length = body_budget(link);

        let prompt = match build_prompt(alert, toot_length) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to build prompt for '{alert_id}': {e}");
                return None;
            }
        };
        debug!("Prompt: {prompt}");

        match self.generator.generate(&prompt, toot_length).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(
                    "Failed to generate toot text for '{alert_id}' because {}",
                    e.kind()
                );
                None
            }
        }
    }
}

fn alert_id(alert: &Alert) -> Result<String, BotError> {
    match alert.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(BotError::Event(format!(
            "alert record has no usable {ID_FIELD}"
        ))),
    }
}
