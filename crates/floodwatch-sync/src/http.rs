//! HTTP clients for the flood inference endpoint and the weather proxy.

use std::time::Duration;

use chrono::Utc;
use floodwatch_core::{
    CoreError, OverrideTable, PredictionResult, TerrainDefaults, WardRecord, WeatherReport, normalize,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::fallback::{FetchOutcome, fetch_or_fallback};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed response: {0}")]
    Malformed(#[from] CoreError),
}

/// Request body for `POST {base}/predict`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloodInput {
    pub ward_name: String,
    /// 1-12
    pub month: u32,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub cloud_cover: f64,
    /// Metres above sea level.
    pub elevation: f64,
    /// Drain siltation, percent.
    pub siltation: f64,
    /// Percent of design capacity.
    pub drainage_capacity: f64,
    /// Weather fields came from the fallback payload.
    #[serde(skip)]
    pub degraded: bool,
}

impl FloodInput {
    /// Fill the weather fields from a report, leaving ward terrain to the caller.
    pub fn from_weather(ward_name: impl Into<String>, month: u32, weather: &WeatherReport) -> Self {
        Self {
            ward_name: ward_name.into(),
            month,
            temperature: weather.temperature,
            humidity: weather.humidity,
            pressure: weather.pressure,
            cloud_cover: weather.clouds,
            elevation: 0.0,
            siltation: 0.0,
            drainage_capacity: 0.0,
            degraded: weather.fallback,
        }
    }

    /// Full input for one ward: weather from the report, drainage from the
    /// record, terrain from the configured defaults.
    pub fn for_ward(ward: &WardRecord, month: u32, weather: &WeatherReport, terrain: &TerrainDefaults) -> Self {
        Self {
            elevation: terrain.elevation_m,
            siltation: terrain.siltation_pct,
            drainage_capacity: ward.drain_capacity,
            ..Self::from_weather(&ward.name, month, weather)
        }
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

/// Client for the flood probability model.
pub struct InferenceClient {
    client: reqwest::Client,
    base_url: String,
    overrides: OverrideTable,
    timeout: Duration,
}

impl InferenceClient {
    /// `base_url` is like `http://localhost:8000`; a trailing slash is dropped.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            overrides: OverrideTable::default(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    /// Bound used by [`Self::predict_or_fallback`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the model for one ward. The response is validated and then any
    /// configured override is applied.
    pub async fn predict(&self, input: &FloodInput) -> Result<PredictionResult, SyncError> {
        let url = format!("{}/predict", self.base_url);

        debug!(url = %url, ward = %input.ward_name, "requesting prediction");
        let resp = self.client.post(&url).json(input).send().await?;
        let resp = check_status(resp).await?;

        let raw: serde_json::Value = resp.json().await?;
        self.interpret(&raw, input)
    }

    /// Validate a raw response, apply overrides, and flag answers computed
    /// from fallback weather.
    fn interpret(&self, raw: &serde_json::Value, input: &FloodInput) -> Result<PredictionResult, SyncError> {
        let result = normalize(raw)?;
        info!(
            ward = %result.ward_name,
            probability = result.probability,
            trend = %result.trend,
            "prediction received"
        );
        let result = self.overrides.apply(result);
        Ok(if input.degraded { result.mark_degraded() } else { result })
    }

    /// Like [`Self::predict`], but any failure or a response slower than the
    /// client timeout yields `fallback` instead.
    pub async fn predict_or_fallback(&self, input: &FloodInput, fallback: PredictionResult) -> PredictionResult {
        fetch_or_fallback(self.predict(input), fallback, self.timeout)
            .await
            .into_value()
    }
}

/// Client for the weather proxy.
pub struct WeatherClient {
    client: reqwest::Client,
    url: String,
}

impl WeatherClient {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub async fn current(&self) -> Result<WeatherReport, SyncError> {
        debug!(url = %self.url, "fetching weather");
        let resp = self.client.get(&self.url).send().await?;
        let resp = check_status(resp).await?;
        let report: WeatherReport = resp.json().await?;
        info!(
            location = %report.location,
            rainfall = report.rainfall,
            fallback = report.fallback,
            "weather received"
        );
        Ok(report)
    }

    /// Current weather, or the fixed fallback payload tagged with the error.
    pub async fn current_or_fallback(&self, timeout: Duration) -> WeatherReport {
        let fallback = WeatherReport::fallback_payload(Utc::now(), None);
        match fetch_or_fallback(self.current(), fallback, timeout).await {
            FetchOutcome::Fresh(report) => report,
            FetchOutcome::Fallback { mut value, reason } => {
                value.error = Some(reason.to_string());
                value
            }
        }
    }
}
