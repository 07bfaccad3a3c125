//! Engine configuration: risk scales, scoring weights, staleness and overrides.
//!
//! Everything here deserialises from JSON and has a `Default` matching the
//! values the dashboard shipped with, so a partial config file only needs to
//! name what it changes.

use serde::{Deserialize, Serialize};

use crate::prediction::PredictionOverride;
use crate::risk::RiskThresholds;
use crate::ward::WardRecord;

/// How live attributes combine into a 0-100 score.
///
/// Each term is normalised to `[0, 1]` and the weighted mean is scaled to 100.
/// Rainfall and incidents push the score up; drain capacity pulls it down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveScoring {
    /// Rainfall (mm/hr) at which the rainfall term saturates.
    pub rainfall_ceiling_mm: f64,
    /// Incident count at which the incident term saturates.
    pub incident_ceiling: f64,
    pub rainfall_weight: f64,
    pub incident_weight: f64,
    pub drainage_weight: f64,
}

impl Default for LiveScoring {
    fn default() -> Self {
        Self {
            rainfall_ceiling_mm: 60.0,
            incident_ceiling: 5.0,
            rainfall_weight: 0.4,
            incident_weight: 0.3,
            drainage_weight: 0.3,
        }
    }
}

impl LiveScoring {
    pub fn score(&self, ward: &WardRecord) -> f64 {
        let rain = ratio(ward.current_rainfall, self.rainfall_ceiling_mm);
        let incidents = ratio(ward.active_incidents as f64, self.incident_ceiling);
        let drain = 1.0 - ratio(ward.drain_capacity, 100.0);
        weighted_score(&[
            (self.rainfall_weight, rain),
            (self.incident_weight, incidents),
            (self.drainage_weight, drain),
        ])
    }
}

/// How historical attributes combine into a 0-100 score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalScoring {
    /// Lifetime flood count at which the frequency term saturates.
    pub frequency_ceiling: f64,
    pub frequency_weight: f64,
    /// Weight of the severe share (`severe_floods / flood_frequency`).
    pub severity_weight: f64,
    pub drainage_weight: f64,
}

impl Default for HistoricalScoring {
    fn default() -> Self {
        Self {
            frequency_ceiling: 50.0,
            frequency_weight: 0.5,
            severity_weight: 0.2,
            drainage_weight: 0.3,
        }
    }
}

impl HistoricalScoring {
    pub fn score(&self, ward: &WardRecord) -> f64 {
        let frequency = ratio(ward.flood_frequency as f64, self.frequency_ceiling);
        let severe = if ward.flood_frequency == 0 {
            0.0
        } else {
            ratio(ward.severe_floods as f64, ward.flood_frequency as f64)
        };
        let drain = 1.0 - ratio(ward.avg_drain_capacity, 100.0);
        weighted_score(&[
            (self.frequency_weight, frequency),
            (self.severity_weight, severe),
            (self.drainage_weight, drain),
        ])
    }
}

/// `value / ceiling` clamped to `[0, 1]`; a non-positive ceiling saturates.
fn ratio(value: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return if value > 0.0 { 1.0 } else { 0.0 };
    }
    (value / ceiling).clamp(0.0, 1.0)
}

fn weighted_score(terms: &[(f64, f64)]) -> f64 {
    let total: f64 = terms.iter().map(|(w, _)| w.max(0.0)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let sum: f64 = terms.iter().map(|(w, v)| w.max(0.0) * v).sum();
    100.0 * sum / total
}

/// Terrain covariates sent to the inference endpoint for wards without
/// surveyed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainDefaults {
    /// Metres above sea level.
    pub elevation_m: f64,
    /// Drain siltation, percent.
    pub siltation_pct: f64,
}

impl Default for TerrainDefaults {
    fn default() -> Self {
        Self {
            elevation_m: 215.0,
            siltation_pct: 0.0,
        }
    }
}

/// Top-level configuration for one evaluation of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scale for live and historical ward scores.
    pub severity_scale: RiskThresholds,
    /// Scale for model probabilities.
    pub probability_scale: RiskThresholds,
    pub live: LiveScoring,
    pub historical: HistoricalScoring,
    /// Live data older than this many seconds is flagged stale.
    pub stale_after_secs: i64,
    /// Agreement tolerance for cross-source verification, in the readings' unit.
    pub verify_tolerance: f64,
    pub overrides: Vec<PredictionOverride>,
    pub terrain: TerrainDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            severity_scale: RiskThresholds::severity(),
            probability_scale: RiskThresholds::probability(),
            live: LiveScoring::default(),
            historical: HistoricalScoring::default(),
            stale_after_secs: 600,
            verify_tolerance: 5.0,
            overrides: Vec::new(),
            terrain: TerrainDefaults::default(),
        }
    }
}

impl EngineConfig {
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs.max(0))
    }

    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
