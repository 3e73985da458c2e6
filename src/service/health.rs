//! Health check functionality
//!
//! This module provides health checks for the scrim-queue service,
//! including readiness and liveness probes.

use crate::amqp::connection::AmqpConnection;
use crate::queue::QueueManager;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Everything a health probe needs to look at
#[derive(Clone)]
pub struct HealthContext {
    pub service_name: String,
    pub queue_manager: Arc<QueueManager>,
    pub is_running: Arc<RwLock<bool>>,
    /// `None` when running without a broker
    pub amqp_connection: Option<Arc<AmqpConnection>>,
}

impl HealthContext {
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub active_scopes: usize,
    pub players_queued: usize,
    pub players_high_priority: usize,
    pub commands_processed: u64,
    pub matchups_formed: u64,
    pub players_matched: u64,
    pub players_carried_over: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(context: &HealthContext) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(context).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        for check in [
            Self::check_queue_manager(context),
            Self::check_amqp_health(context),
        ] {
            if check.status == HealthStatus::Unhealthy {
                overall_status = HealthStatus::Unhealthy;
            } else if check.status == HealthStatus::Degraded
                && overall_status == HealthStatus::Healthy
            {
                overall_status = HealthStatus::Degraded;
            }
            checks.push(check);
        }

        Ok(HealthCheck {
            status: overall_status,
            service: context.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(context),
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(context: &HealthContext) -> Result<HealthStatus> {
        if context.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify service can handle commands
    pub async fn readiness_check(context: &HealthContext) -> Result<HealthStatus> {
        if !context.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        let queue_status = Self::check_queue_manager(context).status;
        let amqp_status = Self::check_amqp_health(context).status;

        Ok(match (queue_status, amqp_status) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        })
    }

    async fn check_service_running(context: &HealthContext) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if context.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_queue_manager(context: &HealthContext) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match context.queue_manager.get_stats() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Queue manager stats check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Stats check failed: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "queue_manager".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_amqp_health(context: &HealthContext) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = match &context.amqp_connection {
            Some(connection) if connection.is_alive() => (HealthStatus::Healthy, None),
            Some(_) => (
                HealthStatus::Unhealthy,
                Some("AMQP connection is closed".to_string()),
            ),
            None => (
                HealthStatus::Degraded,
                Some("No AMQP connection attached".to_string()),
            ),
        };

        ComponentCheck {
            name: "amqp_connection".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(context: &HealthContext) -> ServiceStats {
        match context.queue_manager.get_stats() {
            Ok(stats) => ServiceStats {
                active_scopes: stats.active_scopes,
                players_queued: stats.players_queued,
                players_high_priority: stats.players_high_priority,
                commands_processed: stats.commands_processed,
                matchups_formed: stats.matchups_formed,
                players_matched: stats.players_matched,
                players_carried_over: stats.players_carried_over,
            },
            Err(_) => ServiceStats::default(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::publisher::MockReplyPublisher;
    use crate::config::MatchConfig;
    use crate::types::UserIdentity;

    fn create_context(running: bool) -> HealthContext {
        HealthContext {
            service_name: "scrim-queue".to_string(),
            queue_manager: Arc::new(QueueManager::new(
                MatchConfig::default(),
                Arc::new(MockReplyPublisher::new()),
            )),
            is_running: Arc::new(RwLock::new(running)),
            amqp_connection: None,
        }
    }

    #[tokio::test]
    async fn test_liveness_follows_running_flag() {
        let context = create_context(true);
        assert_eq!(
            HealthCheck::liveness_check(&context).await.unwrap(),
            HealthStatus::Healthy
        );

        *context.is_running.write().await = false;
        assert_eq!(
            HealthCheck::liveness_check(&context).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_missing_broker_is_degraded_but_ready() {
        let context = create_context(true);

        assert_eq!(
            HealthCheck::readiness_check(&context).await.unwrap(),
            HealthStatus::Degraded
        );

        let health = HealthCheck::check(&context).await.unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.checks.len(), 3);
    }

    #[tokio::test]
    async fn test_stats_reflect_queue_state() {
        let context = create_context(true);
        context
            .queue_manager
            .handle_join("g", UserIdentity::new("1", "<@1>"))
            .unwrap();

        let health = HealthCheck::check(&context).await.unwrap();
        assert_eq!(health.stats.active_scopes, 1);
        assert_eq!(health.stats.players_queued, 1);

        let json = health.to_json().unwrap();
        assert!(json.contains("\"players_queued\": 1"));
    }

    #[tokio::test]
    async fn test_stopped_service_is_unhealthy() {
        let context = create_context(false);
        let health = HealthCheck::check(&context).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
    }
}
