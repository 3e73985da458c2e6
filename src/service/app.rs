//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the queue
//! manager to AMQP, the health server, and background tasks.

use crate::amqp::connection::{AmqpConfig, AmqpConnection};
use crate::amqp::handlers::{CommandConsumer, CommandHandler};
use crate::amqp::publisher::{AmqpReplyPublisher, PublisherConfig};
use crate::config::AppConfig;
use crate::error::{QueueError, Result as QueueResult};
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector};
use crate::queue::{MatchupEngine, QueueManager};
use crate::service::health::HealthContext;
use crate::types::CommandRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("AMQP connection error: {message}")]
    AmqpConnection { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Production command handler that routes deliveries into the QueueManager
struct ProductionCommandHandler {
    queue_manager: Arc<QueueManager>,
    metrics_collector: Arc<MetricsCollector>,
}

impl ProductionCommandHandler {
    fn new(queue_manager: Arc<QueueManager>, metrics_collector: Arc<MetricsCollector>) -> Self {
        Self {
            queue_manager,
            metrics_collector,
        }
    }
}

#[async_trait]
impl CommandHandler for ProductionCommandHandler {
    async fn handle_command(&self, request: CommandRequest) -> QueueResult<()> {
        let timer = self.metrics_collector.start_timer();
        let scope_id = request.scope_id.clone();
        let command = request.command.name();

        let result = self.queue_manager.handle_command(request).await;
        let duration = timer.stop();
        self.metrics_collector
            .record_amqp_operation("consume", result.is_ok(), duration);

        match result {
            Ok(batch) => {
                debug!(
                    "Command '{}' handled for scope '{}' - {} replies, {:.2}ms",
                    command,
                    scope_id,
                    batch.messages.len(),
                    duration.as_secs_f64() * 1000.0
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    "Command '{}' failed for scope '{}' after {:.2}ms: {}",
                    command,
                    scope_id,
                    duration.as_secs_f64() * 1000.0,
                    e
                );
                Err(e)
            }
        }
    }

    async fn handle_error(&self, error: QueueError, message_data: &[u8]) {
        error!(
            "Command handler error - type: '{}', message_size: {} bytes",
            error,
            message_data.len()
        );

        if !message_data.is_empty() {
            let preview_len = std::cmp::min(100, message_data.len());
            let preview = String::from_utf8_lossy(&message_data[..preview_len]);
            error!("Message preview: {:?}", preview);
        }
    }
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Queue state and command dispatch
    queue_manager: Arc<QueueManager>,

    /// AMQP connection for message handling
    amqp_connection: Arc<AmqpConnection>,

    /// Prometheus registry shared with the queue manager
    metrics_collector: Arc<MetricsCollector>,

    /// HTTP server for health probes and metrics
    health_server: Arc<HealthServer>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// AMQP consumer for queue commands
    command_consumer: Option<CommandConsumer>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing scrim-queue service");
        info!(
            "Configuration: service={}, amqp_url={}",
            config.service.name, config.amqp.url
        );

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let amqp_connection = Self::initialize_amqp(&config).await?;

        let queue_manager =
            Self::initialize_queue_manager(&config, &amqp_connection, metrics_collector.clone())
                .await?;

        let is_running = Arc::new(RwLock::new(false));

        let context = HealthContext {
            service_name: config.service.name.clone(),
            queue_manager: queue_manager.clone(),
            is_running: is_running.clone(),
            amqp_connection: Some(amqp_connection.clone()),
        };
        let health_server =
            Self::initialize_health_server(&config, metrics_collector.clone(), context);

        Ok(Self {
            config,
            queue_manager,
            amqp_connection,
            metrics_collector,
            health_server,
            background_tasks: Vec::new(),
            command_consumer: None,
            is_running,
        })
    }

    /// Start all background services and message consumption
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting scrim-queue service");

        *self.is_running.write().await = true;

        self.start_health_server().await?;
        self.start_amqp_consumption().await?;
        self.start_background_tasks();

        info!("✅ Scrim-queue service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of scrim-queue service");

        *self.is_running.write().await = false;

        if let Some(consumer) = self.command_consumer.take() {
            if let Err(e) = consumer.stop_consuming().await {
                warn!("Failed to stop AMQP consumer: {}", e);
            } else {
                info!("✅ AMQP message consumption stopped");
            }
        }

        if let Err(e) = self.health_server.stop().await {
            warn!("Failed to stop health server: {}", e);
        } else {
            info!("✅ Health server stopped");
        }

        self.stop_background_tasks().await;

        let final_stats =
            self.queue_manager
                .get_stats()
                .map_err(|e| ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Scrim-queue service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn queue_manager(&self) -> Arc<QueueManager> {
        self.queue_manager.clone()
    }

    /// Context for health probes outside the HTTP server
    pub fn health_context(&self) -> HealthContext {
        HealthContext {
            service_name: self.config.service.name.clone(),
            queue_manager: self.queue_manager.clone(),
            is_running: self.is_running.clone(),
            amqp_connection: Some(self.amqp_connection.clone()),
        }
    }

    fn initialize_health_server(
        config: &AppConfig,
        metrics_collector: Arc<MetricsCollector>,
        context: HealthContext,
    ) -> Arc<HealthServer> {
        info!(
            "Initializing health server on port {}",
            config.service.health_port
        );

        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };

        Arc::new(HealthServer::new(health_config, metrics_collector, context))
    }

    async fn start_health_server(&mut self) -> Result<(), ServiceError> {
        let health_server = self.health_server.clone();
        let port = self.config.service.health_port;

        let server_handle = tokio::spawn(async move {
            if let Err(e) = health_server.start().await {
                error!("Health server failed: {}", e);
            } else {
                info!("Health server task completed");
            }
        });

        self.background_tasks.push(server_handle);

        // Give the server a moment to bind
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("✅ Health server started on port {}", port);
        Ok(())
    }

    /// Initialize AMQP connection with retry logic
    async fn initialize_amqp(config: &AppConfig) -> Result<Arc<AmqpConnection>, ServiceError> {
        info!("Connecting to AMQP broker: {}", config.amqp.url);

        let mut amqp_config =
            AmqpConfig::from_url(&config.amqp.url).map_err(|e| ServiceError::Configuration {
                message: format!("Failed to parse AMQP URL: {}", e),
            })?;
        amqp_config.max_retries = config.amqp.max_retry_attempts;
        amqp_config.retry_delay_ms = config.amqp_retry_delay().as_millis() as u64;
        amqp_config.connection_timeout_ms = config.amqp_connection_timeout().as_millis() as u64;

        let connection =
            AmqpConnection::new(amqp_config)
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: format!("Failed to connect to AMQP: {}", e),
                })?;

        Ok(Arc::new(connection))
    }

    /// Build the engine, publisher and queue manager
    async fn initialize_queue_manager(
        config: &AppConfig,
        amqp_connection: &AmqpConnection,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Arc<QueueManager>, ServiceError> {
        let match_config = config.match_config();
        match_config
            .validate()
            .map_err(|e| ServiceError::Configuration {
                message: e.to_string(),
            })?;

        let engine = match config.matchmaking.shuffle_seed {
            Some(seed) => {
                warn!("Using fixed shuffle seed {} - team draws are reproducible", seed);
                MatchupEngine::with_seed(match_config, seed)
            }
            None => MatchupEngine::new(match_config),
        };

        let channel = amqp_connection
            .connection()
            .open_channel(None)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to open AMQP channel: {}", e),
            })?;

        let publisher_config = PublisherConfig {
            reply_exchange: config.amqp.reply_exchange.clone(),
            matchup_exchange: config.amqp.matchup_exchange.clone(),
            max_retries: config.amqp.max_retry_attempts,
            retry_delay_ms: config.amqp.retry_delay_ms,
            ..PublisherConfig::default()
        };
        let reply_publisher = Arc::new(
            AmqpReplyPublisher::new(channel, publisher_config)
                .await
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to initialize reply publisher: {}", e),
                })?,
        );

        info!(
            "Queue manager ready - match size {}, team size {}",
            match_config.match_size, match_config.team_size
        );

        Ok(Arc::new(QueueManager::with_engine(
            engine,
            reply_publisher,
            metrics_collector,
        )))
    }

    /// Start AMQP message consumption
    async fn start_amqp_consumption(&mut self) -> Result<(), ServiceError> {
        let queue_name = self.config.amqp.command_queue.clone();

        let channel = self
            .amqp_connection
            .connection()
            .open_channel(None)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to open consumer channel: {}", e),
            })?;

        let queue_declare_args = amqprs::channel::QueueDeclareArguments::new(&queue_name)
            .durable(true)
            .auto_delete(false)
            .finish();

        channel
            .queue_declare(queue_declare_args)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to declare queue {}: {}", queue_name, e),
            })?;

        info!("Queue '{}' declared successfully", queue_name);

        let handler = Arc::new(ProductionCommandHandler::new(
            self.queue_manager.clone(),
            self.metrics_collector.clone(),
        ));
        let consumer = CommandConsumer::new(handler, channel);

        consumer
            .start_consuming(&queue_name)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: format!("Failed to start consuming messages: {}", e),
            })?;

        self.command_consumer = Some(consumer);

        info!(
            "AMQP message consumption started on queue '{}'",
            queue_name
        );
        Ok(())
    }

    /// Start background maintenance tasks
    fn start_background_tasks(&mut self) {
        let metrics_task = {
            let queue_manager = self.queue_manager.clone();
            let metrics_collector = self.metrics_collector.clone();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(30));
                info!("Queue metrics update task started");

                while *is_running.read().await {
                    interval.tick().await;

                    match queue_manager.get_stats() {
                        Ok(stats) => {
                            debug!(
                                "Updating metrics - scopes: {}, queued: {}, high-priority: {}",
                                stats.active_scopes,
                                stats.players_queued,
                                stats.players_high_priority
                            );
                            metrics_collector.update_from_queue_stats(&stats);
                        }
                        Err(e) => {
                            warn!("Failed to get queue stats for metrics update: {}", e);
                        }
                    }
                }

                info!("Queue metrics update task stopped");
            })
        };

        let health_metrics_task = {
            let metrics_collector = self.metrics_collector.clone();
            let amqp_connection = self.amqp_connection.clone();
            let is_running = self.is_running.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                let start_time = tokio::time::Instant::now();

                while *is_running.read().await {
                    interval.tick().await;

                    metrics_collector
                        .service()
                        .uptime_seconds
                        .set(start_time.elapsed().as_secs() as i64);

                    let amqp_alive = amqp_connection.is_alive();
                    metrics_collector.update_component_health("amqp", amqp_alive);
                    metrics_collector.update_component_health("queue_manager", true);
                    metrics_collector.update_health_status(if amqp_alive { 2 } else { 0 });
                }

                info!("Health metrics task stopped");
            })
        };

        self.background_tasks.push(metrics_task);
        self.background_tasks.push(health_metrics_task);

        info!("Background maintenance tasks started");
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for task in self.background_tasks.drain(..) {
            task.abort();
        }

        // Give tasks time to clean up gracefully
        tokio::time::sleep(Duration::from_millis(500)).await;

        info!("✅ All {} background tasks stopped", task_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::publisher::MockReplyPublisher;
    use crate::config::MatchConfig;
    use crate::types::{QueueCommand, UserIdentity};

    fn create_handler() -> (ProductionCommandHandler, Arc<MockReplyPublisher>) {
        let publisher = Arc::new(MockReplyPublisher::new());
        let collector = Arc::new(MetricsCollector::default());
        let manager = Arc::new(QueueManager::with_engine(
            MatchupEngine::with_seed(MatchConfig::default(), 1),
            publisher.clone(),
            collector.clone(),
        ));
        (ProductionCommandHandler::new(manager, collector), publisher)
    }

    #[tokio::test]
    async fn test_production_handler_publishes_replies() {
        let (handler, publisher) = create_handler();

        handler
            .handle_command(CommandRequest::new(
                "guild-1",
                QueueCommand::Join {
                    user: UserIdentity::new("1", "<@1>"),
                },
            ))
            .await
            .unwrap();

        assert_eq!(publisher.count_events_of_type("ReplyBatch"), 1);
        let consumed = handler
            .metrics_collector
            .service()
            .amqp_messages_total
            .with_label_values(&["consume", "success"])
            .get();
        assert_eq!(consumed, 1);
    }

    #[tokio::test]
    async fn test_production_handler_propagates_failures() {
        let (handler, publisher) = create_handler();

        let result = handler
            .handle_command(CommandRequest::new("", QueueCommand::Status))
            .await;

        assert!(result.is_err());
        assert!(publisher.get_published_events().is_empty());
        assert_eq!(
            handler
                .metrics_collector
                .service()
                .amqp_errors_total
                .with_label_values(&["consume"])
                .get(),
            1
        );
    }
}
