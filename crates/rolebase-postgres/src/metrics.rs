//! Pool metrics and health reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PoolConfig;

/// Snapshot of connection pool metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolMetrics {
    /// Current number of connections in the pool.
    pub pool_size: u32,
    /// Number of idle connections available.
    pub num_idle: u32,
    /// Number of connections checked out.
    pub num_active: u32,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Pool utilization (0.0 - 1.0).
    pub utilization: f64,
}

impl PoolMetrics {
    pub fn new(pool_size: u32, num_idle: u32, config: &PoolConfig) -> Self {
        let num_active = pool_size.saturating_sub(num_idle);
        let max_connections = config.max_connections;

        let utilization = if max_connections > 0 {
            (num_active as f64) / (max_connections as f64)
        } else {
            0.0
        };

        Self {
            pool_size,
            num_idle,
            num_active,
            max_connections,
            min_connections: config.min_connections,
            utilization,
        }
    }

    /// Check if the pool is approaching saturation (>80% utilization).
    pub fn is_near_saturation(&self) -> bool {
        self.utilization > 0.8
    }

    /// Check if every allowed connection is checked out.
    pub fn is_saturated(&self) -> bool {
        self.max_connections > 0 && self.num_active >= self.max_connections
    }
}

/// Result of `PoolManager::health_report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// The round-trip query succeeded.
    pub is_healthy: bool,
    /// A pool exists (connected or lazily created).
    pub is_connected: bool,
    pub is_near_saturation: bool,
    pub check_latency_ms: u64,
    pub error: Option<String>,
    pub metrics: PoolMetrics,
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: u32) -> PoolConfig {
        PoolConfig {
            max_connections: max,
            ..PoolConfig::default()
        }
    }

    #[test]
    fn test_metrics_utilization() {
        let metrics = PoolMetrics::new(4, 1, &config(5));
        assert_eq!(metrics.num_active, 3);
        assert!((metrics.utilization - 0.6).abs() < f64::EPSILON);
        assert!(!metrics.is_near_saturation());
        assert!(!metrics.is_saturated());
    }

    #[test]
    fn test_metrics_saturated() {
        let metrics = PoolMetrics::new(5, 0, &config(5));
        assert!(metrics.is_near_saturation());
        assert!(metrics.is_saturated());
    }

    #[test]
    fn test_metrics_idle_exceeding_size_does_not_underflow() {
        let metrics = PoolMetrics::new(0, 2, &config(0));
        assert_eq!(metrics.num_active, 0);
        assert_eq!(metrics.utilization, 0.0);
        assert!(!metrics.is_saturated());
    }
}
