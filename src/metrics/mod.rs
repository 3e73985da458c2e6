//! Metrics and monitoring for the scrim-queue service
//!
//! This module provides Prometheus metrics collection and the HTTP server
//! exposing health probes, metrics and statistics.

pub mod collector;
pub mod health;

pub use collector::{MetricsCollector, PerformanceMetrics, QueueMetrics, ServiceMetrics};
pub use health::{HealthServer, HealthServerConfig};

