mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use floodwatch_core::dataset::{delhi_wards, find_ward};
use floodwatch_core::{
    EngineConfig, OverrideTable, PredictionResult, Projector, RiskLevel, SourceReading,
    TerrainDefaults, ViewMode, WardRecord, WeatherReport, response_list, summarize,
    summarize_by_zone, verify_sources,
};
use floodwatch_sync::{FloodInput, InferenceClient, Poller, PollerConfig, SyncError, WeatherClient};

#[derive(Parser, Debug)]
#[command(name = "floodwatch", version, about = "Ward-level flood risk for Delhi")]
struct Cli {
    /// Engine configuration (JSON). Missing fields take their defaults.
    #[arg(short, long, env = "FLOODWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ranked response list of wards
    Wards {
        #[arg(long)]
        view: ViewMode,
        /// Drop wards below this level
        #[arg(long, default_value = "low")]
        min_level: RiskLevel,
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Card for one ward
    Ward {
        name: String,
        #[arg(long)]
        view: ViewMode,
    },
    /// Ward counts per risk level, overall and per zone
    Summary {
        #[arg(long)]
        view: ViewMode,
    },
    /// Compare two JSON files of source readings
    Verify {
        a: PathBuf,
        b: PathBuf,
        /// Agreement tolerance; defaults to the configured value
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// One prediction from the inference endpoint
    Predict {
        #[arg(long, env = "FLOODWATCH_INFERENCE_URL")]
        endpoint: String,
        #[arg(long)]
        ward: String,
        /// Month 1-12; defaults to the current month
        #[arg(long)]
        month: Option<u32>,
        /// Metres above sea level; defaults to the configured terrain
        #[arg(long)]
        elevation: Option<f64>,
        /// Drain siltation, percent; defaults to the configured terrain
        #[arg(long)]
        siltation: Option<f64>,
        /// Weather proxy; without it the fallback payload is used and the
        /// prediction is flagged as degraded
        #[arg(long, env = "FLOODWATCH_WEATHER_URL")]
        weather_url: Option<String>,
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Poll the inference endpoint for every ward
    Watch {
        #[arg(long, env = "FLOODWATCH_INFERENCE_URL")]
        endpoint: String,
        #[arg(long, default_value_t = PollerConfig::predictions().interval.as_secs())]
        interval_secs: u64,
        #[arg(long, default_value_t = PollerConfig::predictions().timeout.as_secs())]
        timeout_secs: u64,
        /// Weather proxy, queried every cycle
        #[arg(long, env = "FLOODWATCH_WEATHER_URL")]
        weather_url: Option<String>,
        /// Stop after this many completed cycles
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Current weather, or the fallback payload if the proxy fails
    Weather {
        #[arg(long, env = "FLOODWATCH_WEATHER_URL")]
        url: String,
        #[arg(long, default_value_t = PollerConfig::weather().timeout.as_secs())]
        timeout_secs: u64,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn load_readings(path: &Path) -> anyhow::Result<Vec<SourceReading>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing readings in {}", path.display()))
}

fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Deterministic stand-in carrying the ward's live category.
fn fallback_for(ward: &WardRecord, config: &EngineConfig) -> PredictionResult {
    PredictionResult::fallback(&ward.name, ward.fallback_probability(config))
}

async fn weather_or_fallback(client: Option<&WeatherClient>, timeout: Duration) -> WeatherReport {
    match client {
        Some(client) => client.current_or_fallback(timeout).await,
        None => WeatherReport::fallback_payload(Utc::now(), Some("no weather source configured".into())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    tracing::debug!("floodwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;
    let now = Utc::now();
    let wards = delhi_wards(now);
    for ward in &wards {
        ward.validate()?;
    }
    let projector = Projector::new(&config);

    match cli.command {
        Command::Wards {
            view,
            min_level,
            limit,
            json,
        } => {
            let views = projector.project_all(&wards, view, now);
            let list = response_list(&views, min_level, limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                print!("{}", display::ranked_table(&list));
            }
        }
        Command::Ward { name, view } => {
            let Some(record) = find_ward(&wards, &name) else {
                bail!("no ward named {name:?}");
            };
            let projected = projector.project(record, view, now);
            print!("{}", display::ward_card(record, &projected, now));
        }
        Command::Summary { view } => {
            let views = projector.project_all(&wards, view, now);
            print!("{}", display::summary(&summarize(&views), &summarize_by_zone(&views)));
        }
        Command::Verify { a, b, tolerance } => {
            let left = load_readings(&a)?;
            let right = load_readings(&b)?;
            let (name_a, name_b) = (source_name(&a), source_name(&b));
            let reports = verify_sources(
                &[(name_a.as_str(), left.as_slice()), (name_b.as_str(), right.as_slice())],
                tolerance.unwrap_or(config.verify_tolerance),
                now,
            );
            print!("{}", display::verification(&reports));
        }
        Command::Predict {
            endpoint,
            ward,
            month,
            elevation,
            siltation,
            weather_url,
            timeout_secs,
        } => {
            let Some(record) = find_ward(&wards, &ward) else {
                bail!("no ward named {ward:?}");
            };
            let timeout = Duration::from_secs(timeout_secs);
            let weather_client = weather_url.map(WeatherClient::new);
            let weather = weather_or_fallback(weather_client.as_ref(), timeout).await;
            let month = month.unwrap_or_else(|| now.month());
            if !(1..=12).contains(&month) {
                bail!("month must be 1-12, got {month}");
            }

            let client = InferenceClient::new(endpoint)
                .with_overrides(OverrideTable::new(config.overrides.clone()))
                .with_timeout(timeout);
            let terrain = TerrainDefaults {
                elevation_m: elevation.unwrap_or(config.terrain.elevation_m),
                siltation_pct: siltation.unwrap_or(config.terrain.siltation_pct),
            };
            let input = FloodInput::for_ward(record, month, &weather, &terrain);
            let result = client
                .predict_or_fallback(&input, fallback_for(record, &config))
                .await;
            let level = result.risk(&config.probability_scale);
            print!("{}", display::prediction(&result, level));
        }
        Command::Watch {
            endpoint,
            interval_secs,
            timeout_secs,
            weather_url,
            cycles,
        } => {
            let poll = PollerConfig {
                interval: Duration::from_secs(interval_secs),
                timeout: Duration::from_secs(timeout_secs),
            };
            let client = Arc::new(
                InferenceClient::new(endpoint)
                    .with_overrides(OverrideTable::new(config.overrides.clone()))
                    .with_timeout(poll.timeout),
            );
            if weather_url.is_none() {
                tracing::warn!("no weather source configured, predictions will be flagged as degraded");
            }
            let weather_client = Arc::new(weather_url.map(WeatherClient::new));
            let weather_timeout = poll.timeout / 2;
            let terrain = config.terrain.clone();
            let month = now.month();
            let fallback: Vec<PredictionResult> = wards.iter().map(|w| fallback_for(w, &config)).collect();
            let wards = Arc::new(wards);

            let handle = Poller::spawn(
                "predictions",
                move || {
                    let client = Arc::clone(&client);
                    let weather_client = Arc::clone(&weather_client);
                    let wards = Arc::clone(&wards);
                    let terrain = terrain.clone();
                    async move {
                        let weather = weather_or_fallback(weather_client.as_ref().as_ref(), weather_timeout).await;
                        let mut results = Vec::with_capacity(wards.len());
                        for ward in wards.iter() {
                            let input = FloodInput::for_ward(ward, month, &weather, &terrain);
                            results.push(client.predict(&input).await?);
                        }
                        Ok::<_, SyncError>(results)
                    }
                },
                fallback,
                poll,
            );

            let mut reports = handle.subscribe();
            let mut seen = 0u64;
            loop {
                tokio::select! {
                    changed = reports.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let report = reports.borrow_and_update().clone();
                        if let Some(report) = report {
                            print!("{}", display::poll_report(&report));
                            seen += 1;
                        }
                        if cycles.is_some_and(|n| seen >= n) {
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("interrupted");
                        break;
                    }
                }
            }
            handle.shutdown().await;
        }
        Command::Weather { url, timeout_secs } => {
            let report = WeatherClient::new(url)
                .current_or_fallback(Duration::from_secs(timeout_secs))
                .await;
            print!("{}", display::weather(&report));
        }
    }

    Ok(())
}
