//! AMQP publisher for reply batches and matchup events

use crate::amqp::messages::{
    MessageEnvelope, MATCHUP_EVENTS_EXCHANGE, MATCHUP_FORMED_ROUTING_KEY, REPLIES_ROUTING_KEY,
    REPLY_EXCHANGE,
};
use crate::error::{QueueError, Result};
use crate::types::*;
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Trait for delivering replies and matchup events to the chat gateway
#[async_trait]
pub trait ReplyPublisher: Send + Sync {
    /// Publish the ordered reply messages for one command
    async fn publish_replies(&self, batch: ReplyBatch) -> Result<()>;

    /// Publish a MatchupFormed event
    async fn publish_matchup_formed(&self, event: MatchupFormed) -> Result<()>;
}

/// Configuration for event publishing
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub reply_exchange: String,
    pub matchup_exchange: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            reply_exchange: REPLY_EXCHANGE.to_string(),
            matchup_exchange: MATCHUP_EVENTS_EXCHANGE.to_string(),
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// AMQP-based publisher implementation
pub struct AmqpReplyPublisher {
    channel: Channel,
    config: PublisherConfig,
}

impl AmqpReplyPublisher {
    /// Create a new publisher and declare its exchanges
    pub async fn new(channel: Channel, config: PublisherConfig) -> Result<Self> {
        let publisher = Self { channel, config };

        publisher.setup_exchanges().await?;

        Ok(publisher)
    }

    /// Set up AMQP exchanges for replies and events
    async fn setup_exchanges(&self) -> Result<()> {
        for exchange in [&self.config.reply_exchange, &self.config.matchup_exchange] {
            let args = ExchangeDeclareArguments::new(exchange, "topic");
            self.channel.exchange_declare(args).await.map_err(|e| {
                QueueError::AmqpConnectionFailed {
                    message: format!("Failed to declare exchange {}: {}", exchange, e),
                }
            })?;
        }

        info!(
            "Successfully set up AMQP exchanges: {}, {}",
            self.config.reply_exchange, self.config.matchup_exchange
        );
        Ok(())
    }

    /// Generic method to publish to an exchange with retry logic
    async fn publish_to_exchange<T>(
        &self,
        exchange: &str,
        envelope: &MessageEnvelope<T>,
    ) -> Result<()>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let mut retry_count = 0;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);

        loop {
            match self.try_publish(exchange, envelope).await {
                Ok(_) => {
                    debug!(
                        "Successfully published message {} to exchange {}",
                        envelope.correlation_id, exchange
                    );
                    return Ok(());
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.config.max_retries {
                        error!(
                            "Failed to publish message {} after {} retries: {}",
                            envelope.correlation_id, self.config.max_retries, e
                        );
                        return Err(e);
                    }

                    warn!(
                        "Publish attempt {} failed for message {}: {}. Retrying in {:?}",
                        retry_count, envelope.correlation_id, e, delay
                    );

                    sleep(delay).await;
                    delay = next_retry_delay(delay);
                }
            }
        }
    }

    /// Single publish attempt
    async fn try_publish<T>(&self, exchange: &str, envelope: &MessageEnvelope<T>) -> Result<()>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let payload = envelope.to_bytes()?;

        let args = BasicPublishArguments::new(exchange, &envelope.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&envelope.correlation_id)
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_content_type("application/json");

        self.channel
            .basic_publish(properties, payload, args)
            .await
            .map_err(|e| QueueError::AmqpConnectionFailed {
                message: format!("Failed to publish message: {}", e),
            })?;

        Ok(())
    }
}

/// Double the delay between publish attempts, capped at five seconds
fn next_retry_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_RETRY_DELAY)
}

#[async_trait]
impl ReplyPublisher for AmqpReplyPublisher {
    async fn publish_replies(&self, batch: ReplyBatch) -> Result<()> {
        let envelope = MessageEnvelope::new(batch, REPLIES_ROUTING_KEY.to_string());
        self.publish_to_exchange(&self.config.reply_exchange, &envelope)
            .await
    }

    async fn publish_matchup_formed(&self, event: MatchupFormed) -> Result<()> {
        let envelope = MessageEnvelope::new(event, MATCHUP_FORMED_ROUTING_KEY.to_string());
        self.publish_to_exchange(&self.config.matchup_exchange, &envelope)
            .await
    }
}

/// Mock publisher that records everything it is asked to publish
#[derive(Debug, Default)]
pub struct MockReplyPublisher {
    published_events: std::sync::Mutex<Vec<QueueEvent>>,
}

impl MockReplyPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all published events (for testing)
    pub fn get_published_events(&self) -> Vec<QueueEvent> {
        self.published_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count events of a specific type
    pub fn count_events_of_type(&self, event_type: &str) -> usize {
        self.get_published_events()
            .iter()
            .filter(|event| match event {
                QueueEvent::ReplyBatch(_) => event_type == "ReplyBatch",
                QueueEvent::MatchupFormed(_) => event_type == "MatchupFormed",
            })
            .count()
    }

    /// Clear published events (for testing)
    pub fn clear_events(&self) {
        if let Ok(mut events) = self.published_events.lock() {
            events.clear();
        }
    }
}

#[async_trait]
impl ReplyPublisher for MockReplyPublisher {
    async fn publish_replies(&self, batch: ReplyBatch) -> Result<()> {
        if let Ok(mut events) = self.published_events.lock() {
            events.push(QueueEvent::ReplyBatch(batch));
        }
        Ok(())
    }

    async fn publish_matchup_formed(&self, event: MatchupFormed) -> Result<()> {
        if let Ok(mut events) = self.published_events.lock() {
            events.push(QueueEvent::MatchupFormed(event));
        }
        Ok(())
    }
}
