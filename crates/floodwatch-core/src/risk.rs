//! Risk categories and threshold-based classification.
//!
//! A [`RiskThresholds`] scale partitions `[0, 100]` into four ordered bands.
//! Two scales are in use and each semantic domain sticks to one of them:
//!
//! - **severity** (ward scores): critical ≥ 76, high ≥ 51, moderate ≥ 26
//! - **probability** (model output): critical ≥ 80, high ≥ 60, moderate ≥ 40

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ordinal flood-risk category. Ordering follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels, least severe first.
    pub const ALL: [RiskLevel; 4] = [Self::Low, Self::Moderate, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Intensity used when plotting the level on a heat layer.
    pub fn heat_weight(&self) -> f64 {
        match self {
            Self::Low => 0.25,
            Self::Moderate => 0.5,
            Self::High => 0.75,
            Self::Critical => 1.0,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::UnknownRiskLevel(other.to_string())),
        }
    }
}

/// One band of a scale: scores at or above `lower_bound` map to `level`
/// unless a higher band also matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBand {
    pub lower_bound: f64,
    pub level: RiskLevel,
}

impl RiskBand {
    pub fn new(lower_bound: f64, level: RiskLevel) -> Self {
        Self { lower_bound, level }
    }
}

/// A named, validated partition of `[0, 100]` into risk bands.
///
/// Bands are stored in ascending order of lower bound. The first bound is
/// always `0` and the last band is open-ended upward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds", into = "RawThresholds")]
pub struct RiskThresholds {
    name: String,
    bands: Vec<RiskBand>,
}

#[derive(Serialize, Deserialize)]
struct RawThresholds {
    name: String,
    bands: Vec<RiskBand>,
}

impl TryFrom<RawThresholds> for RiskThresholds {
    type Error = CoreError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        RiskThresholds::new(raw.name, raw.bands)
    }
}

impl From<RiskThresholds> for RawThresholds {
    fn from(t: RiskThresholds) -> Self {
        RawThresholds {
            name: t.name,
            bands: t.bands,
        }
    }
}

impl RiskThresholds {
    /// Build a scale, rejecting anything that is not a gap-free partition.
    pub fn new(name: impl Into<String>, bands: Vec<RiskBand>) -> Result<Self, CoreError> {
        let name = name.into();
        let first = bands
            .first()
            .ok_or_else(|| CoreError::InvalidThresholds(format!("{name}: no bands")))?;
        if first.lower_bound != 0.0 {
            return Err(CoreError::InvalidThresholds(format!(
                "{name}: first band must start at 0, got {}",
                first.lower_bound
            )));
        }
        for band in &bands {
            if !band.lower_bound.is_finite() || band.lower_bound > 100.0 {
                return Err(CoreError::InvalidThresholds(format!(
                    "{name}: bound {} outside [0, 100]",
                    band.lower_bound
                )));
            }
        }
        for pair in bands.windows(2) {
            if pair[1].lower_bound <= pair[0].lower_bound {
                return Err(CoreError::InvalidThresholds(format!(
                    "{name}: bounds must be strictly ascending ({} then {})",
                    pair[0].lower_bound, pair[1].lower_bound
                )));
            }
            if pair[1].level <= pair[0].level {
                return Err(CoreError::InvalidThresholds(format!(
                    "{name}: levels must be strictly ascending ({} then {})",
                    pair[0].level, pair[1].level
                )));
            }
        }
        Ok(Self { name, bands })
    }

    fn fixed(name: &str, moderate: f64, high: f64, critical: f64) -> Self {
        Self {
            name: name.to_string(),
            bands: vec![
                RiskBand::new(0.0, RiskLevel::Low),
                RiskBand::new(moderate, RiskLevel::Moderate),
                RiskBand::new(high, RiskLevel::High),
                RiskBand::new(critical, RiskLevel::Critical),
            ],
        }
    }

    /// Scale for derived ward scores.
    pub fn severity() -> Self {
        Self::fixed("severity", 26.0, 51.0, 76.0)
    }

    /// Scale for model flood probabilities.
    pub fn probability() -> Self {
        Self::fixed("probability", 40.0, 60.0, 80.0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bands(&self) -> &[RiskBand] {
        &self.bands
    }

    /// Least severe level on this scale.
    pub fn lowest(&self) -> RiskLevel {
        // Non-empty by construction.
        self.bands.first().map_or(RiskLevel::Low, |b| b.level)
    }

    /// Smallest score that classifies as `level`.
    ///
    /// A level missing from this scale maps to the bound of the nearest band
    /// below it, or `0` if there is none.
    pub fn floor(&self, level: RiskLevel) -> f64 {
        self.bands
            .iter()
            .rev()
            .find(|b| b.level <= level)
            .map_or(0.0, |b| b.lower_bound)
    }
}

/// Map a score to its risk level on `thresholds`.
///
/// Bands are checked from the highest lower bound down and the first one the
/// score meets wins. Scores below every bound, and NaN, land in the lowest band.
pub fn classify(score: f64, thresholds: &RiskThresholds) -> RiskLevel {
    thresholds
        .bands
        .iter()
        .rev()
        .find(|band| score >= band.lower_bound)
        .map_or_else(|| thresholds.lowest(), |band| band.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_scale_boundaries() {
        let t = RiskThresholds::severity();
        assert_eq!(classify(0.0, &t), RiskLevel::Low);
        assert_eq!(classify(25.9, &t), RiskLevel::Low);
        assert_eq!(classify(26.0, &t), RiskLevel::Moderate);
        assert_eq!(classify(50.99, &t), RiskLevel::Moderate);
        assert_eq!(classify(51.0, &t), RiskLevel::High);
        assert_eq!(classify(75.0, &t), RiskLevel::High);
        assert_eq!(classify(76.0, &t), RiskLevel::Critical);
        assert_eq!(classify(100.0, &t), RiskLevel::Critical);
    }

    #[test]
    fn probability_scale_boundaries() {
        let t = RiskThresholds::probability();
        assert_eq!(classify(39.0, &t), RiskLevel::Low);
        assert_eq!(classify(40.0, &t), RiskLevel::Moderate);
        assert_eq!(classify(60.0, &t), RiskLevel::High);
        assert_eq!(classify(79.9, &t), RiskLevel::High);
        assert_eq!(classify(80.0, &t), RiskLevel::Critical);
    }

    #[test]
    fn out_of_range_scores_fall_into_end_buckets() {
        let t = RiskThresholds::severity();
        assert_eq!(classify(-40.0, &t), RiskLevel::Low);
        assert_eq!(classify(250.0, &t), RiskLevel::Critical);
        assert_eq!(classify(f64::INFINITY, &t), RiskLevel::Critical);
        assert_eq!(classify(f64::NAN, &t), RiskLevel::Low);
    }

    #[test]
    fn classification_is_monotonic() {
        for t in [RiskThresholds::severity(), RiskThresholds::probability()] {
            let mut prev = classify(-1.0, &t);
            for step in 0..=1100 {
                let score = step as f64 / 10.0;
                let level = classify(score, &t);
                assert!(level >= prev, "{} dropped from {prev} to {level} at {score}", t.name());
                prev = level;
            }
        }
    }

    #[test]
    fn custom_scale_with_three_bands() {
        let t = RiskThresholds::new(
            "coarse",
            vec![
                RiskBand::new(0.0, RiskLevel::Low),
                RiskBand::new(50.0, RiskLevel::High),
                RiskBand::new(90.0, RiskLevel::Critical),
            ],
        )
        .unwrap();
        assert_eq!(classify(49.0, &t), RiskLevel::Low);
        assert_eq!(classify(50.0, &t), RiskLevel::High);
        assert_eq!(classify(95.0, &t), RiskLevel::Critical);
    }

    #[test]
    fn rejects_gap_at_zero() {
        let err = RiskThresholds::new(
            "gappy",
            vec![RiskBand::new(10.0, RiskLevel::Low)],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidThresholds(_)));
    }

    #[test]
    fn rejects_unordered_bounds_and_levels() {
        let unordered_bounds = RiskThresholds::new(
            "bad",
            vec![
                RiskBand::new(0.0, RiskLevel::Low),
                RiskBand::new(60.0, RiskLevel::Moderate),
                RiskBand::new(60.0, RiskLevel::High),
            ],
        );
        assert!(unordered_bounds.is_err());

        let unordered_levels = RiskThresholds::new(
            "bad",
            vec![
                RiskBand::new(0.0, RiskLevel::High),
                RiskBand::new(60.0, RiskLevel::Moderate),
            ],
        );
        assert!(unordered_levels.is_err());
    }

    #[test]
    fn rejects_bounds_above_100_and_empty() {
        assert!(RiskThresholds::new(
            "bad",
            vec![
                RiskBand::new(0.0, RiskLevel::Low),
                RiskBand::new(120.0, RiskLevel::Critical),
            ],
        )
        .is_err());
        assert!(RiskThresholds::new("empty", vec![]).is_err());
    }

    #[test]
    fn thresholds_deserialize_through_validation() {
        let ok = r#"{"name":"s","bands":[{"lower_bound":0,"level":"low"},{"lower_bound":50,"level":"critical"}]}"#;
        let parsed: RiskThresholds = serde_json::from_str(ok).unwrap();
        assert_eq!(classify(55.0, &parsed), RiskLevel::Critical);

        let bad = r#"{"name":"s","bands":[{"lower_bound":5,"level":"low"}]}"#;
        assert!(serde_json::from_str::<RiskThresholds>(bad).is_err());
    }

    #[test]
    fn floor_classifies_back_to_its_level() {
        for t in [RiskThresholds::severity(), RiskThresholds::probability()] {
            for level in RiskLevel::ALL {
                assert_eq!(classify(t.floor(level), &t), level, "{}", t.name());
            }
        }
        assert_eq!(RiskThresholds::probability().floor(RiskLevel::High), 60.0);
        assert_eq!(RiskThresholds::severity().floor(RiskLevel::Low), 0.0);
    }

    #[test]
    fn floor_of_missing_level_uses_band_below() {
        let t = RiskThresholds::new(
            "coarse",
            vec![
                RiskBand::new(0.0, RiskLevel::Low),
                RiskBand::new(50.0, RiskLevel::High),
            ],
        )
        .unwrap();
        assert_eq!(t.floor(RiskLevel::Moderate), 0.0);
        assert_eq!(t.floor(RiskLevel::Critical), 50.0);
    }

    #[test]
    fn heat_weights_rise_with_severity() {
        let weights: Vec<f64> = RiskLevel::ALL.iter().map(RiskLevel::heat_weight).collect();
        assert_eq!(weights, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn risk_level_parse_and_display() {
        for level in RiskLevel::ALL {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
            assert_eq!(level.to_string(), level.as_str());
        }
        assert!("severe".parse::<RiskLevel>().is_err());
        assert!(RiskLevel::Critical > RiskLevel::High);
        assert!(RiskLevel::Moderate > RiskLevel::Low);
    }
}
