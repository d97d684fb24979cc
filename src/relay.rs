use log::{debug, info};
use serde_json::Value;

use crate::compose::TOOT_MAX_LENGTH;
use crate::error::BotError;
use crate::mastodon::Poster;
use crate::types::{HandlerResponse, SnsEvent};

/// Posts `message` verbatim if it fits in a toot. Returns whether anything was posted.
pub async fn relay(poster: &dyn Poster, message: &str) -> Result<bool, BotError> {
    let length = message.chars().count();
    if length >= TOOT_MAX_LENGTH {
        info!("Skipping message of {length} chars, limit is {TOOT_MAX_LENGTH}");
        return Ok(false);
    }

    debug!("Relaying: {message}");
    poster.post(message).await.map_err(BotError::Post)?;

    Ok(true)
}

pub async fn handle_relay_event(poster: &dyn Poster, event: &Value) -> HandlerResponse {
    let result = async {
        let message = SnsEvent::from_value(event)?.into_message()?;
        relay(poster, &message).await.map(|_| ())
    }
    .await;

    HandlerResponse::from(result)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mastodon::test::RecordingPoster;
    use serde_json::json;

    fn sns_event(message: &str) -> Value {
        json!({ "Records": [{ "Sns": { "Message": message } }] })
    }

    #[tokio::test]
    async fn test_relay_short_message() {
        let poster = RecordingPoster::default();
        let message = "Load-shedding Stage 2 from 16:00";

        let response = handle_relay_event(&poster, &sns_event(message)).await;

        assert_eq!(response, HandlerResponse::ok());
        assert_eq!(poster.posts(), vec![message.to_owned()]);
    }

    #[tokio::test]
    async fn test_relay_just_under_limit() {
        let poster = RecordingPoster::default();
        let message = "x".repeat(TOOT_MAX_LENGTH - 1);

        let response = handle_relay_event(&poster, &sns_event(&message)).await;

        assert_eq!(response, HandlerResponse::ok());
        assert_eq!(poster.posts(), vec![message]);
    }

    #[tokio::test]
    async fn test_relay_at_limit_is_skipped() {
        let poster = RecordingPoster::default();
        let message = "x".repeat(TOOT_MAX_LENGTH);

        let response = handle_relay_event(&poster, &sns_event(&message)).await;

        assert_eq!(response, HandlerResponse::ok());
        assert!(poster.posts().is_empty());
    }

    #[tokio::test]
    async fn test_relay_long_message_is_skipped() {
        let poster = RecordingPoster::default();

        assert!(!relay(&poster, &"x".repeat(2 * TOOT_MAX_LENGTH)).await.unwrap());
        assert!(poster.posts().is_empty());
    }

    #[tokio::test]
    async fn test_relay_counts_chars() {
        let poster = RecordingPoster::default();
        // 499 chars, but well over 500 bytes
        let message = "ë".repeat(TOOT_MAX_LENGTH - 1);

        assert!(relay(&poster, &message).await.unwrap());
    }

    #[tokio::test]
    async fn test_relay_post_failure() {
        let poster = RecordingPoster::failing();

        let response = handle_relay_event(&poster, &sns_event("Stage 4")).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(response.data.unwrap().error, "PostError");
    }

    #[tokio::test]
    async fn test_relay_malformed_event() {
        let poster = RecordingPoster::default();

        let response = handle_relay_event(&poster, &json!({ "detail": {} })).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(response.data.unwrap().error, "EventError");
        assert!(poster.posts().is_empty());
    }
}
