//! Prediction results from the inference endpoint.
//!
//! Endpoint output is untrusted. [`normalize`] validates and clamps it; the
//! [`OverrideTable`] is the one place a ward's model probability may be
//! replaced, and every replacement is tagged and logged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;
use crate::risk::{RiskLevel, RiskThresholds, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Stable,
    Falling,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Stable => "stable",
            Self::Falling => "falling",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rising" => Ok(Self::Rising),
            "stable" => Ok(Self::Stable),
            "falling" => Ok(Self::Falling),
            other => Err(CoreError::MalformedPrediction(format!("unknown trend {other:?}"))),
        }
    }
}

/// Where a prediction's probability came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Model,
    Fallback,
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub ward_name: String,
    /// Percent, clamped to 0-100.
    pub probability: f64,
    /// Percent, clamped to 0-100.
    pub confidence: f64,
    pub trend: Trend,
    #[serde(default)]
    pub timeframe: Option<String>,
    pub source: PredictionSource,
    #[serde(default)]
    pub override_reason: Option<String>,
    /// The model was fed substitute weather, not live observations.
    #[serde(default)]
    pub degraded_inputs: bool,
}

impl PredictionResult {
    /// A deterministic stand-in for when the endpoint cannot be used.
    ///
    /// Confidence is zero so the value never reads as a model answer.
    pub fn fallback(ward_name: impl Into<String>, probability: f64) -> Self {
        Self {
            ward_name: ward_name.into(),
            probability: clamp_percent(probability),
            confidence: 0.0,
            trend: Trend::Stable,
            timeframe: None,
            source: PredictionSource::Fallback,
            override_reason: None,
            degraded_inputs: false,
        }
    }

    pub fn risk(&self, scale: &RiskThresholds) -> RiskLevel {
        classify(self.probability, scale)
    }

    pub fn is_fallback(&self) -> bool {
        self.source == PredictionSource::Fallback
    }

    /// Flag a model answer computed from fallback inputs.
    pub fn mark_degraded(mut self) -> Self {
        if !self.degraded_inputs {
            warn!(ward = %self.ward_name, "prediction built on fallback weather");
        }
        self.degraded_inputs = true;
        self
    }
}

fn clamp_percent(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

fn finite_field(obj: &serde_json::Map<String, Value>, key: &str) -> Result<f64, CoreError> {
    let value = obj
        .get(key)
        .ok_or_else(|| CoreError::MalformedPrediction(format!("missing {key}")))?;
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoreError::MalformedPrediction(format!("{key} is not a finite number: {value}")))
}

/// Validate a raw endpoint response and clamp its percentages.
///
/// The ward name may be given as `ward`, `wardName` or `ward_name`.
pub fn normalize(raw: &Value) -> Result<PredictionResult, CoreError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| CoreError::MalformedPrediction(format!("expected an object, got {raw}")))?;

    let ward_name = ["ward", "wardName", "ward_name"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::MalformedPrediction("missing ward name".into()))?;

    let probability = finite_field(obj, "probability")?;
    let confidence = finite_field(obj, "confidence")?;

    let trend = obj
        .get("trend")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::MalformedPrediction("missing trend".into()))?
        .parse::<Trend>()?;

    let timeframe = obj
        .get("timeframe")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(PredictionResult {
        ward_name: ward_name.to_string(),
        probability: clamp_percent(probability),
        confidence: clamp_percent(confidence),
        trend,
        timeframe,
        source: PredictionSource::Model,
        override_reason: None,
        degraded_inputs: false,
    })
}

/// An explicit, audited replacement of one ward's probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOverride {
    pub ward: String,
    pub probability: f64,
    /// Why the override exists; carried onto every result it touches.
    pub reason: String,
}

/// The set of configured overrides, matched on ward name ignoring ASCII case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    entries: Vec<PredictionOverride>,
}

impl OverrideTable {
    pub fn new(entries: Vec<PredictionOverride>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PredictionOverride] {
        &self.entries
    }

    pub fn lookup(&self, ward: &str) -> Option<&PredictionOverride> {
        self.entries
            .iter()
            .find(|e| e.ward.eq_ignore_ascii_case(ward.trim()))
    }

    /// Apply the matching entry, if any. Unmatched results pass through unchanged.
    pub fn apply(&self, mut result: PredictionResult) -> PredictionResult {
        if let Some(entry) = self.lookup(&result.ward_name) {
            warn!(
                ward = %result.ward_name,
                model_probability = result.probability,
                override_probability = entry.probability,
                reason = %entry.reason,
                "prediction overridden"
            );
            result.probability = clamp_percent(entry.probability);
            result.source = PredictionSource::Override;
            result.override_reason = Some(entry.reason.clone());
        }
        result
    }
}
