//! Endpoint layer: bounded calls with fallback, fixed-interval pollers, and
//! HTTP clients for the inference endpoint and weather proxy.

pub mod fallback;
pub mod poller;

#[cfg(feature = "http")]
pub mod http;

pub use fallback::{FallbackReason, FetchOutcome, fetch_or_fallback, with_fallback};
pub use poller::{PollCycle, PollError, PollPhase, PollReport, Poller, PollerConfig, PollerHandle};

#[cfg(feature = "http")]
pub use http::{FloodInput, InferenceClient, SyncError, WeatherClient};
