//! Health report types for the `/health` endpoint
//!
//! The report is healthy while at least 80% of its components are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall health of the service
///
/// # Example
/// ```
/// use bookingsync_api::utils::health::{ComponentHealth, HealthStatus};
/// use chrono::Utc;
///
/// let mut status = HealthStatus::new(Utc::now())
///     .add_component(ComponentHealth::healthy("store"))
///     .add_component(ComponentHealth::unhealthy("calendar", "connection refused"));
/// status.calculate_score();
///
/// assert_eq!(status.score, 0.5);
/// assert!(!status.ok);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,

    /// `healthy_components / total_components`, 1.0 with no components.
    pub score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub components: Vec<ComponentHealth>,

    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { ok: true, score: 1.0, message: None, components: Vec::new(), timestamp }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Recompute `score` and `ok`. Call after all components are added.
    pub fn calculate_score(&mut self) {
        if self.components.is_empty() {
            return;
        }

        let healthy_count = self.components.iter().filter(|c| c.ok).count();

        self.score = healthy_count as f64 / self.components.len() as f64;
        self.ok = self.score >= 0.8;
        if !self.ok {
            self.message = Some(format!(
                "{} of {} components unhealthy",
                self.components.len() - healthy_count,
                self.components.len()
            ));
        }
    }
}

/// Health of one dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), ok: true, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), ok: false, message: Some(message.into()) }
    }
}
