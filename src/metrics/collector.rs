//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the scrim-queue service
//! using Prometheus metrics.

use crate::queue::{Matchup, QueueManagerStats};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the queue service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue and matchup metrics
    queue_metrics: QueueMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Total AMQP messages processed
    pub amqp_messages_total: IntCounterVec,

    /// AMQP message processing errors
    pub amqp_errors_total: IntCounterVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Queue and matchup metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Commands handled, by command and outcome
    pub commands_total: IntCounterVec,

    /// Total matchups formed
    pub matchups_formed_total: IntCounter,

    /// Total users placed on a team
    pub players_matched_total: IntCounter,

    /// Total users promoted to a high-priority list
    pub players_carried_over_total: IntCounter,

    /// Scopes known to the service
    pub active_scopes: IntGauge,

    /// Users currently waiting in normal queues
    pub players_queued: IntGauge,

    /// Users currently waiting in high-priority lists
    pub players_high_priority: IntGauge,

    /// Pool size at the moment a matchup formed
    pub matchup_pool_size: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Command processing time
    pub command_processing_duration: HistogramVec,

    /// AMQP operation durations
    pub amqp_operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Update the current-state gauges from queue manager stats
    pub fn update_from_queue_stats(&self, stats: &QueueManagerStats) {
        self.queue_metrics
            .active_scopes
            .set(stats.active_scopes as i64);
        self.queue_metrics
            .players_queued
            .set(stats.players_queued as i64);
        self.queue_metrics
            .players_high_priority
            .set(stats.players_high_priority as i64);
    }

    /// Record one command being handled
    pub fn record_command(&self, command: &str, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };

        self.queue_metrics
            .commands_total
            .with_label_values(&[command, status])
            .inc();

        self.performance_metrics
            .command_processing_duration
            .with_label_values(&[command])
            .observe(duration.as_secs_f64());
    }

    /// Record a matchup being formed
    pub fn record_matchup(&self, matchup: &Matchup) {
        let selected = matchup.selected().count();
        let leftover = matchup.leftover.len();

        self.queue_metrics.matchups_formed_total.inc();
        self.queue_metrics
            .players_matched_total
            .inc_by(selected as u64);
        self.queue_metrics
            .players_carried_over_total
            .inc_by(leftover as u64);
        self.queue_metrics
            .matchup_pool_size
            .observe((selected + leftover) as f64);
    }

    /// Record AMQP operation
    pub fn record_amqp_operation(&self, operation: &str, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };

        self.service_metrics
            .amqp_messages_total
            .with_label_values(&[operation, status])
            .inc();

        if !success {
            self.service_metrics
                .amqp_errors_total
                .with_label_values(&[operation])
                .inc();
        }

        self.performance_metrics
            .amqp_operation_duration
            .with_label_values(&[operation, status])
            .observe(duration.as_secs_f64());
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("scrim_queue_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let amqp_messages_total = IntCounterVec::new(
            Opts::new(
                "scrim_queue_amqp_messages_total",
                "Total AMQP messages processed",
            ),
            &["operation", "status"],
        )?;
        registry.register(Box::new(amqp_messages_total.clone()))?;

        let amqp_errors_total = IntCounterVec::new(
            Opts::new("scrim_queue_amqp_errors_total", "Total AMQP errors"),
            &["operation"],
        )?;
        registry.register(Box::new(amqp_errors_total.clone()))?;

        let health_status = IntGauge::new(
            "scrim_queue_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("scrim_queue_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            amqp_messages_total,
            amqp_errors_total,
            health_status,
            component_health,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let commands_total = IntCounterVec::new(
            Opts::new("scrim_queue_commands_total", "Total queue commands handled"),
            &["command", "status"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let matchups_formed_total =
            IntCounter::new("scrim_queue_matchups_formed_total", "Total matchups formed")?;
        registry.register(Box::new(matchups_formed_total.clone()))?;

        let players_matched_total = IntCounter::new(
            "scrim_queue_players_matched_total",
            "Total users placed on a team",
        )?;
        registry.register(Box::new(players_matched_total.clone()))?;

        let players_carried_over_total = IntCounter::new(
            "scrim_queue_players_carried_over_total",
            "Total users promoted to a high-priority list",
        )?;
        registry.register(Box::new(players_carried_over_total.clone()))?;

        let active_scopes = IntGauge::new("scrim_queue_active_scopes", "Known queue scopes")?;
        registry.register(Box::new(active_scopes.clone()))?;

        let players_queued = IntGauge::new(
            "scrim_queue_players_queued",
            "Users currently waiting in normal queues",
        )?;
        registry.register(Box::new(players_queued.clone()))?;

        let players_high_priority = IntGauge::new(
            "scrim_queue_players_high_priority",
            "Users currently waiting in high-priority lists",
        )?;
        registry.register(Box::new(players_high_priority.clone()))?;

        let matchup_pool_size = Histogram::with_opts(
            HistogramOpts::new(
                "scrim_queue_matchup_pool_size",
                "Pool size when a matchup formed",
            )
            .buckets(vec![12.0, 13.0, 14.0, 16.0, 20.0, 24.0]),
        )?;
        registry.register(Box::new(matchup_pool_size.clone()))?;

        Ok(Self {
            commands_total,
            matchups_formed_total,
            players_matched_total,
            players_carried_over_total,
            active_scopes,
            players_queued,
            players_high_priority,
            matchup_pool_size,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let command_processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "scrim_queue_command_processing_duration_seconds",
                "Command processing time",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["command"],
        )?;
        registry.register(Box::new(command_processing_duration.clone()))?;

        let amqp_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "scrim_queue_amqp_operation_duration_seconds",
                "AMQP operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation", "status"],
        )?;
        registry.register(Box::new(amqp_operation_duration.clone()))?;

        Ok(Self {
            command_processing_duration,
            amqp_operation_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
