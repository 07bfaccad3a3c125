//! Live and historical projections of a ward record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::risk::{RiskLevel, classify};
use crate::ward::{PeakRainfall, WardRecord};

/// Which face of a ward the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Live,
    Historical,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Historical => "historical",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// There is no default mode: anything but `live` or `historical` is an error.
impl FromStr for ViewMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "historical" => Ok(Self::Historical),
            other => Err(CoreError::InvalidViewMode(other.to_string())),
        }
    }
}

/// Mode-specific fields of a [`WardView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ViewDetail {
    #[serde(rename_all = "camelCase")]
    Live {
        current_rainfall: f64,
        drain_capacity: f64,
        active_incidents: u32,
        last_flood: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    Historical {
        flood_frequency: u32,
        severe_floods: u32,
        peak_rainfall: PeakRainfall,
        avg_drain_capacity: f64,
    },
}

/// Display-ready projection of one ward in one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardView {
    pub id: String,
    pub name: String,
    pub zone: String,
    /// `current_risk` for live views, `historical_risk` for historical ones.
    pub risk: RiskLevel,
    /// Score fed to the classifier, rounded to one decimal.
    pub score: f64,
    /// Live data missing a freshness stamp or older than the configured limit.
    pub stale: bool,
    pub detail: ViewDetail,
}

impl WardView {
    pub fn mode(&self) -> ViewMode {
        match self.detail {
            ViewDetail::Live { .. } => ViewMode::Live,
            ViewDetail::Historical { .. } => ViewMode::Historical,
        }
    }
}

/// Projects ward records under one engine configuration.
pub struct Projector<'a> {
    config: &'a EngineConfig,
}

impl<'a> Projector<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Project `record` in `mode`, judging staleness against `now`.
    pub fn project(&self, record: &WardRecord, mode: ViewMode, now: DateTime<Utc>) -> WardView {
        let (score, detail, stale) = match mode {
            ViewMode::Live => (
                record.live_score(self.config),
                ViewDetail::Live {
                    current_rainfall: record.current_rainfall,
                    drain_capacity: record.drain_capacity,
                    active_incidents: record.active_incidents,
                    last_flood: record.last_flood,
                },
                self.is_stale(record.updated_at, now),
            ),
            ViewMode::Historical => (
                record.historical_score(self.config),
                ViewDetail::Historical {
                    flood_frequency: record.flood_frequency,
                    severe_floods: record.severe_floods,
                    peak_rainfall: record.peak_rainfall.clone(),
                    avg_drain_capacity: record.avg_drain_capacity,
                },
                false,
            ),
        };

        WardView {
            id: record.id.clone(),
            name: record.name.clone(),
            zone: record.zone.clone(),
            risk: classify(score, &self.config.severity_scale),
            score: round1(score),
            stale,
            detail,
        }
    }

    /// Like [`project`](Self::project) with the mode given as text.
    pub fn project_named(
        &self,
        record: &WardRecord,
        mode: &str,
        now: DateTime<Utc>,
    ) -> Result<WardView, CoreError> {
        let mode: ViewMode = mode.parse()?;
        Ok(self.project(record, mode, now))
    }

    /// Project every record in `mode`, preserving input order.
    pub fn project_all(&self, records: &[WardRecord], mode: ViewMode, now: DateTime<Utc>) -> Vec<WardView> {
        records.iter().map(|r| self.project(r, mode, now)).collect()
    }

    fn is_stale(&self, updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match updated_at {
            None => true,
            Some(ts) => now.signed_duration_since(ts) > self.config.stale_after(),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
