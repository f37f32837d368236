//! Alert Notifications
//!
//! Publishes fired alerts to an SNS topic. Without a configured topic the
//! relay uses [`DisabledNotifier`], which only logs.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::error::SdkError;
use aws_sdk_sns::operation::publish::PublishError as SnsPublishError;

use crate::application::ports::{Notifier, NotifyError};
use crate::domain::alert::AlertRecord;
use crate::infrastructure::config::NotificationSettings;

/// Notification adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// SNS rejected or failed the publish.
    #[error("SNS publish failed: {0}")]
    Publish(#[from] SdkError<SnsPublishError>),
}

impl From<NotificationError> for NotifyError {
    fn from(err: NotificationError) -> Self {
        Self::Service(err.to_string())
    }
}

/// Subject line for an alert notification.
#[must_use]
pub fn compose_subject(record: &AlertRecord) -> String {
    format!("IoT Alert: {}", record.topic())
}

/// Human-readable body for an alert notification.
#[must_use]
pub fn compose_message(record: &AlertRecord) -> String {
    format!(
        "Alert triggered on {topic}\nValue: {value}\nDate: {date}\nTime: {time}\nLocation: {location}",
        topic = record.topic(),
        value = record.value(),
        date = record.date(),
        time = record.time(),
        location = record.location(),
    )
}

// =============================================================================
// SNS
// =============================================================================

/// Publishes alerts to an SNS topic.
#[derive(Debug, Clone)]
pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsNotifier {
    /// Create a notifier from an SDK client.
    #[must_use]
    pub const fn new(client: aws_sdk_sns::Client, topic_arn: String) -> Self {
        Self { client, topic_arn }
    }

    async fn publish(&self, record: &AlertRecord) -> Result<String, NotificationError> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(compose_subject(record))
            .message(compose_message(record))
            .send()
            .await?;
        Ok(output.message_id().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn notify(&self, record: &AlertRecord) -> Result<(), NotifyError> {
        let message_id = self.publish(record).await?;
        tracing::info!(topic = record.topic(), %message_id, "Alert notification sent");
        Ok(())
    }
}

// =============================================================================
// Disabled
// =============================================================================

/// Stand-in used when no SNS topic is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, record: &AlertRecord) -> Result<(), NotifyError> {
        tracing::info!(
            topic = record.topic(),
            value = %record.value(),
            "Notifications disabled, alert not forwarded"
        );
        Ok(())
    }
}

/// Build the notifier for the loaded settings.
///
/// Static credentials win over the default AWS provider chain when both
/// halves are configured.
pub async fn build_notifier(settings: &NotificationSettings) -> Arc<dyn Notifier> {
    let Some(topic_arn) = settings.topic_arn.clone() else {
        tracing::info!("SNS_TOPIC_ARN not set, alert notifications disabled");
        return Arc::new(DisabledNotifier);
    };

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));
    if let Some(creds) = &settings.credentials {
        loader = loader.credentials_provider(aws_credential_types::Credentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            None,
            None,
            "relay-config",
        ));
    }
    let sdk_config = loader.load().await;

    tracing::info!(region = %settings.region, topic_arn = %topic_arn, "SNS notifications enabled");
    Arc::new(SnsNotifier::new(aws_sdk_sns::Client::new(&sdk_config), topic_arn))
}
