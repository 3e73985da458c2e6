//! AMQP consumer for inbound queue commands
//!
//! Each delivery on the command queue is one `CommandRequest`. Deliveries are
//! acknowledged once handled; malformed payloads are acknowledged too, since a
//! redelivery would fail the same way.

use crate::amqp::messages::MessageUtils;
use crate::error::{QueueError, Result};
use crate::types::CommandRequest;
use amqprs::{
    channel::{BasicAckArguments, BasicCancelArguments, BasicConsumeArguments, Channel},
    consumer::AsyncConsumer,
    BasicProperties, Deliver,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Trait defining the interface for handling inbound commands
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle one queue command from the chat gateway
    async fn handle_command(&self, request: CommandRequest) -> Result<()>;

    /// Handle processing errors
    async fn handle_error(&self, error: QueueError, message_data: &[u8]);
}

/// Consumer for the command queue
pub struct CommandConsumer {
    handler: Arc<dyn CommandHandler>,
    channel: Channel,
    consumer_tag: String,
}

impl CommandConsumer {
    pub fn new(handler: Arc<dyn CommandHandler>, channel: Channel) -> Self {
        let consumer_tag = format!("scrim-consumer-{}", uuid::Uuid::new_v4());

        Self {
            handler,
            channel,
            consumer_tag,
        }
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// Start consuming messages from the queue
    pub async fn start_consuming(&self, queue_name: &str) -> Result<()> {
        let args = BasicConsumeArguments::new(queue_name, &self.consumer_tag)
            .manual_ack(true)
            .finish();

        self.channel
            .basic_consume(CommandDeliveryConsumer::new(self.handler.clone()), args)
            .await
            .map_err(|e| QueueError::AmqpConnectionFailed {
                message: format!("Failed to start consuming: {}", e),
            })?;

        info!("Started consuming messages from queue: {}", queue_name);
        Ok(())
    }

    /// Stop consuming messages
    pub async fn stop_consuming(&self) -> Result<()> {
        let args = BasicCancelArguments::new(&self.consumer_tag);

        self.channel
            .basic_cancel(args)
            .await
            .map_err(|e| QueueError::AmqpConnectionFailed {
                message: format!("Failed to stop consuming: {}", e),
            })?;

        info!("Stopped consuming messages");
        Ok(())
    }
}

/// Internal consumer implementation
struct CommandDeliveryConsumer {
    handler: Arc<dyn CommandHandler>,
}

impl CommandDeliveryConsumer {
    fn new(handler: Arc<dyn CommandHandler>) -> Self {
        Self { handler }
    }

    async fn process_message(&self, content: &[u8]) -> Result<()> {
        let request = MessageUtils::deserialize_command_request(content)?;

        debug!(
            "Command parsed - scope: '{}', command: {}",
            request.scope_id, request.command
        );

        self.handler.handle_command(request).await
    }
}

#[async_trait]
impl AsyncConsumer for CommandDeliveryConsumer {
    async fn consume(
        &mut self,
        channel: &Channel,
        deliver: Deliver,
        _basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let delivery_tag = deliver.delivery_tag();

        debug!(
            "AMQP message received - delivery_tag: {}, routing_key: '{}', size: {} bytes",
            delivery_tag,
            deliver.routing_key(),
            content.len()
        );

        let start_time = std::time::Instant::now();

        match self.process_message(&content).await {
            Ok(_) => {
                debug!(
                    "Message processed - delivery_tag: {}, processing_time: {:.2}ms",
                    delivery_tag,
                    start_time.elapsed().as_secs_f64() * 1000.0
                );
            }
            Err(e) => {
                error!(
                    "Message processing failed - delivery_tag: {}, processing_time: {:.2}ms, error: {}",
                    delivery_tag,
                    start_time.elapsed().as_secs_f64() * 1000.0,
                    e
                );
                let error = match e.downcast::<QueueError>() {
                    Ok(queue_error) => queue_error,
                    Err(other) => QueueError::InternalError {
                        message: other.to_string(),
                    },
                };
                self.handler.handle_error(error, &content).await;
            }
        }

        if let Err(e) = channel
            .basic_ack(BasicAckArguments::new(delivery_tag, false))
            .await
        {
            warn!("Failed to ack delivery {}: {}", delivery_tag, e);
        }
    }
}

/// Mock command handler for testing
#[derive(Default)]
pub struct MockCommandHandler {
    pub received_requests: Arc<tokio::sync::Mutex<Vec<CommandRequest>>>,
    pub received_errors: Arc<tokio::sync::Mutex<Vec<String>>>,
}

impl MockCommandHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommandHandler for MockCommandHandler {
    async fn handle_command(&self, request: CommandRequest) -> Result<()> {
        self.received_requests.lock().await.push(request);
        Ok(())
    }

    async fn handle_error(&self, error: QueueError, _message_data: &[u8]) {
        self.received_errors.lock().await.push(error.to_string());
    }
}
