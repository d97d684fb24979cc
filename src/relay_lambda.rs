use coctbots::APP_NAME;
use coctbots::mastodon::MastodonClient;
use coctbots::relay::handle_relay_event;
use jluszcz_rust_utils::lambda;
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    lambda::init(APP_NAME, module_path!(), false).await?;

    let mastodon = MastodonClient::from_env()?;
    let mastodon = &mastodon;

    let func = service_fn(move |event: LambdaEvent<Value>| async move {
        handler(mastodon, event).await
    });
    lambda_runtime::run(func).await?;
    Ok(())
}

async fn handler(
    mastodon: &MastodonClient,
    event: LambdaEvent<Value>,
) -> Result<Value, lambda_runtime::Error> {
    let response = handle_relay_event(mastodon, &event.payload).await;

    Ok(serde_json::to_value(response)?)
}
