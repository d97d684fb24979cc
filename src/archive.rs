use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::primitives::ByteStream;
use log::{debug, info};
use serde_json::Value;

const DEFAULT_PREFIX: &str = "alerts";

/// Object storage for processed alerts. Writes overwrite whatever is already at `key`.
#[async_trait]
pub trait Archive: Send + Sync {
    fn key_for(&self, alert_id: &str) -> String;

    async fn store(&self, key: &str, document: &Value) -> Result<()>;
}

pub struct S3Archive {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Archive {
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Archiving is only enabled when a bucket is configured.
    pub fn from_env(sdk_config: &aws_config::SdkConfig) -> Option<Self> {
        let Ok(bucket) = std::env::var("SERVICE_ALERTS_BUCKET") else {
            info!("SERVICE_ALERTS_BUCKET not set, archiving disabled");
            return None;
        };
        let prefix =
            std::env::var("SERVICE_ALERTS_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_owned());

        Some(Self::new(Client::from_conf(s3_config(sdk_config)), bucket, prefix))
    }
}

/// A failed write aborts the batch rather than being retried underneath the caller.
fn s3_config(sdk_config: &aws_config::SdkConfig) -> aws_sdk_s3::Config {
    aws_sdk_s3::config::Builder::from(sdk_config)
        .retry_config(RetryConfig::disabled())
        .build()
}

fn archive_key(prefix: &str, alert_id: &str) -> String {
    format!("{}/{}.json", prefix.trim_end_matches('/'), alert_id)
}

#[async_trait]
impl Archive for S3Archive {
    fn key_for(&self, alert_id: &str) -> String {
        archive_key(&self.prefix, alert_id)
    }

    async fn store(&self, key: &str, document: &Value) -> Result<()> {
        let body = serde_json::to_vec(document)?;
        debug!("Writing {} bytes to s3://{}/{}", body.len(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await?;

        Ok(())
    }
}
