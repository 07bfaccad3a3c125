//! Ward risk engine: classification, view projection, cross-source
//! verification, priority ranking and prediction normalisation.

pub mod config;
pub mod dataset;
mod error;
pub mod prediction;
pub mod rank;
pub mod risk;
pub mod verify;
pub mod view;
pub mod ward;
pub mod weather;

pub use config::{EngineConfig, HistoricalScoring, LiveScoring, TerrainDefaults};
pub use error::CoreError;
pub use prediction::{
    OverrideTable, PredictionOverride, PredictionResult, PredictionSource, Trend, normalize,
};
pub use rank::{RankedWard, RiskSummary, rank, response_list, summarize, summarize_by_zone};
pub use risk::{RiskBand, RiskLevel, RiskThresholds, classify};
pub use verify::{SourcePairReport, SourceReading, VerificationResult, verify, verify_sources};
pub use view::{Projector, ViewDetail, ViewMode, WardView};
pub use ward::{PeakRainfall, WardRecord};
pub use weather::{ForecastItem, WeatherReport};
