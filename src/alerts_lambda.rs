use coctbots::APP_NAME;
use coctbots::alerts::ServiceAlertsBot;
use coctbots::mastodon::MastodonClient;
use jluszcz_rust_utils::lambda;
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    lambda::init(APP_NAME, module_path!(), false).await?;

    let mastodon = MastodonClient::from_env()?;
    let bot = ServiceAlertsBot::from_env(Box::new(mastodon), true).await;
    let bot = &bot;

    let func = service_fn(move |event: LambdaEvent<Value>| async move {
        handler(bot, event).await
    });
    lambda_runtime::run(func).await?;
    Ok(())
}

async fn handler(
    bot: &ServiceAlertsBot,
    event: LambdaEvent<Value>,
) -> Result<Value, lambda_runtime::Error> {
    let response = bot.handle_event(&event.payload).await;

    Ok(serde_json::to_value(response)?)
}
