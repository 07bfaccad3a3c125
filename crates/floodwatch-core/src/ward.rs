//! Ward records: the raw per-ward attributes every view is derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::risk::{RiskLevel, classify};

/// Highest rainfall observed for a ward, with when it fell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakRainfall {
    pub value_mm: f64,
    pub recorded_at: DateTime<Utc>,
}

/// One administrative ward's flood-risk state.
///
/// Risk levels are never stored on the record; [`WardRecord::current_risk`]
/// and [`WardRecord::historical_risk`] recompute them from the attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardRecord {
    pub id: String,
    pub name: String,
    /// Grouping key, shared by many wards.
    pub zone: String,
    #[serde(default)]
    pub population: Option<String>,

    // Live
    /// mm/hr
    pub current_rainfall: f64,
    /// Percent, 0-100.
    pub drain_capacity: f64,
    pub active_incidents: u32,
    #[serde(default)]
    pub last_flood: Option<DateTime<Utc>>,
    /// When the live attributes were last refreshed upstream.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    // Historical
    pub flood_frequency: u32,
    pub severe_floods: u32,
    pub peak_rainfall: PeakRainfall,
    /// Percent, 0-100.
    pub avg_drain_capacity: f64,
}

impl WardRecord {
    /// Check the record's invariants. Pure components assume this has passed.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fail = |reason: String| {
            Err(CoreError::InvalidRecord {
                id: self.id.clone(),
                reason,
            })
        };
        if self.id.trim().is_empty() {
            return fail("id is empty".into());
        }
        if self.severe_floods > self.flood_frequency {
            return fail(format!(
                "severe_floods ({}) exceeds flood_frequency ({})",
                self.severe_floods, self.flood_frequency
            ));
        }
        if !(0.0..=100.0).contains(&self.drain_capacity) {
            return fail(format!("drain_capacity {} outside [0, 100]", self.drain_capacity));
        }
        if !(0.0..=100.0).contains(&self.avg_drain_capacity) {
            return fail(format!(
                "avg_drain_capacity {} outside [0, 100]",
                self.avg_drain_capacity
            ));
        }
        if !self.current_rainfall.is_finite() || self.current_rainfall < 0.0 {
            return fail(format!("current_rainfall {} is not a non-negative number", self.current_rainfall));
        }
        if !self.peak_rainfall.value_mm.is_finite() || self.peak_rainfall.value_mm < 0.0 {
            return fail(format!(
                "peak_rainfall {} is not a non-negative number",
                self.peak_rainfall.value_mm
            ));
        }
        Ok(())
    }

    pub fn live_score(&self, config: &EngineConfig) -> f64 {
        config.live.score(self)
    }

    pub fn historical_score(&self, config: &EngineConfig) -> f64 {
        config.historical.score(self)
    }

    pub fn current_risk(&self, config: &EngineConfig) -> RiskLevel {
        classify(self.live_score(config), &config.severity_scale)
    }

    pub fn historical_risk(&self, config: &EngineConfig) -> RiskLevel {
        classify(self.historical_score(config), &config.severity_scale)
    }

    /// Probability to report when the model cannot be asked.
    ///
    /// The live category is carried over to the probability scale as the
    /// floor of the matching band, so the fallback reads as the same level.
    pub fn fallback_probability(&self, config: &EngineConfig) -> f64 {
        config.probability_scale.floor(self.current_risk(config))
    }
}
