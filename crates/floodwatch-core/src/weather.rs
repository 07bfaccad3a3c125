//! Weather payloads from the weather proxy, and the fixed fallback payload
//! substituted when the proxy cannot be reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verify::SourceReading;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastItem {
    pub time: String,
    /// °C
    pub temperature: f64,
    /// mm over the slot
    pub rainfall: f64,
    pub description: String,
    pub icon: String,
}

/// Current conditions plus a short forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: String,
    /// °C
    pub temperature: f64,
    /// Percent
    pub humidity: f64,
    /// km/h
    pub wind_speed: f64,
    /// mm
    pub rainfall: f64,
    pub description: String,
    pub icon: String,
    /// hPa
    pub pressure: f64,
    /// km
    pub visibility: f64,
    /// Percent cloud cover
    pub clouds: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub forecast: Vec<ForecastItem>,
    /// Set when this is the substitute payload, not live data.
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn slot(time: &str, temperature: f64, rainfall: f64, description: &str, icon: &str) -> ForecastItem {
    ForecastItem {
        time: time.to_string(),
        temperature,
        rainfall,
        description: description.to_string(),
        icon: icon.to_string(),
    }
}

impl WeatherReport {
    /// The fixed substitute payload, stamped `now` and tagged as a fallback.
    pub fn fallback_payload(now: DateTime<Utc>, error: Option<String>) -> Self {
        Self {
            location: "Delhi".to_string(),
            temperature: 28.0,
            humidity: 89.0,
            wind_speed: 24.0,
            rainfall: 42.0,
            description: "moderate rain".to_string(),
            icon: "10d".to_string(),
            pressure: 1008.0,
            visibility: 5.0,
            clouds: 75.0,
            timestamp: now,
            forecast: vec![
                slot("3:00 PM", 28.0, 15.0, "light rain", "10d"),
                slot("6:00 PM", 26.0, 25.0, "moderate rain", "10n"),
                slot("9:00 PM", 24.0, 35.0, "heavy rain", "10n"),
                slot("12:00 AM", 23.0, 20.0, "moderate rain", "10n"),
            ],
            fallback: true,
            error,
        }
    }

    /// Current rainfall as a reading for cross-source verification.
    pub fn rainfall_reading(&self, source_id: &str, entity_id: &str) -> SourceReading {
        SourceReading {
            source_id: source_id.to_string(),
            entity_id: entity_id.to_string(),
            value: self.rainfall,
            observed_at: self.timestamp,
        }
    }

    /// Total forecast rainfall across all slots.
    pub fn forecast_rainfall(&self) -> f64 {
        self.forecast.iter().map(|f| f.rainfall).sum()
    }
}
