use thiserror::Error;

use crate::types::Alert;

pub const TOOT_MAX_LENGTH: usize = 500;

pub const FALLBACK_TEXT: &str = "Content failed to generate. Please consult link below";

const REQUEST_NUMBER_FIELD: &str = "request_number";
const REQUEST_NUMBER_INSTRUCTION: &str =
    "Encourage the use of the request_number value when contacting the City.";

#[derive(Debug, Error)]
#[error("toot is {length} chars, over the {max} char limit")]
pub struct ComposeError {
    pub length: usize,
    pub max: usize,
}

fn prompt_template(json_str: &str, toot_length: usize) -> String {
    format!(
        "Please draft a toot about a potential City of Cape Town service outage or update on an outage \
         in a concerned and helpful tone, using the details in the following JSON. \
         The \"service_area\" field refers to the responsible department.\n\
         \n\
         {json_str}\n\
         \n\
         Keep it strictly under {toot_length} chars in length. Only return the content of the toot."
    )
}

fn attribution(link: &str) -> String {
    format!("\n\nContent generated automatically from {link}")
}

/// How many chars the body of a toot may use once the attribution for `link` is appended.
pub fn body_budget(link: &str) -> usize {
    TOOT_MAX_LENGTH.saturating_sub(attribution(link).chars().count())
}

pub fn build_prompt(alert: &Alert, toot_length: usize) -> serde_json::Result<String> {
    let json_str = serde_json::to_string(alert)?;
    let mut prompt = prompt_template(&json_str, toot_length);

    if alert.contains_key(REQUEST_NUMBER_FIELD) {
        prompt.push(' ');
        prompt.push_str(REQUEST_NUMBER_INSTRUCTION);
    }

    Ok(prompt)
}

pub fn compose_toot(body: &str, link: &str) -> Result<String, ComposeError> {
    let toot = format!("{}{}", body, attribution(link));

    let length = toot.chars().count();
    if length > TOOT_MAX_LENGTH {
        return Err(ComposeError {
            length,
            max: TOOT_MAX_LENGTH,
        });
    }

    Ok(toot)
}

pub fn fallback_toot(link: &str) -> Result<String, ComposeError> {
    compose_toot(FALLBACK_TEXT, link)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::{Value, json};

    const LINK: &str = "https://service-alerts.cct-datascience.xyz/alerts/1234.json";

    fn make_alert(value: Value) -> Alert {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_prompt_embeds_alert_and_length() -> anyhow::Result<()> {
        let alert = make_alert(json!({ "service_area": "Electricity", "area": "Bishop Lavis" }));
        let prompt = build_prompt(&alert, 420)?;

        assert!(prompt.contains(r#""area":"Bishop Lavis""#));
        assert!(prompt.contains(r#""service_area":"Electricity""#));
        assert!(prompt.contains("strictly under 420 chars"));

        Ok(())
    }

    #[test]
    fn test_prompt_with_request_number() -> anyhow::Result<()> {
        let alert = make_alert(json!({ "service_area": "Water", "request_number": "9109876543" }));
        let prompt = build_prompt(&alert, 420)?;

        assert!(prompt.ends_with(REQUEST_NUMBER_INSTRUCTION));

        Ok(())
    }

    #[test]
    fn test_prompt_without_request_number() -> anyhow::Result<()> {
        let alert = make_alert(json!({ "service_area": "Water" }));
        let prompt = build_prompt(&alert, 420)?;

        assert!(!prompt.contains(REQUEST_NUMBER_INSTRUCTION));

        Ok(())
    }

    #[test]
    fn test_compose_toot() -> anyhow::Result<()> {
        assert_eq!(
            compose_toot("Water outage in Observatory.", LINK)?,
            format!(
                "Water outage in Observatory.\n\nContent generated automatically from {LINK}"
            )
        );

        Ok(())
    }

    #[test]
    fn test_body_budget_fills_toot_exactly() -> anyhow::Result<()> {
        let body = "x".repeat(body_budget(LINK));
        let toot = compose_toot(&body, LINK)?;

        assert_eq!(toot.chars().count(), TOOT_MAX_LENGTH);

        Ok(())
    }

    #[test]
    fn test_compose_toot_too_long() {
        let body = "x".repeat(body_budget(LINK) + 1);

        let error = compose_toot(&body, LINK).unwrap_err();
        assert_eq!(error.length, TOOT_MAX_LENGTH + 1);
    }

    #[test]
    fn test_compose_counts_chars_not_bytes() {
        let body = "é".repeat(body_budget(LINK));

        assert!(compose_toot(&body, LINK).is_ok());
    }

    #[test]
    fn test_fallback_toot() -> anyhow::Result<()> {
        let toot = fallback_toot(LINK)?;

        assert!(toot.starts_with(FALLBACK_TEXT));
        assert!(toot.ends_with(LINK));

        Ok(())
    }
}
