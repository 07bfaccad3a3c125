//! Text rendering for ward cards, ranked lists and endpoint results.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use floodwatch_core::{
    PredictionResult, RankedWard, RiskLevel, RiskSummary, SourcePairReport, ViewDetail, WardRecord,
    WardView, WeatherReport,
};
use floodwatch_sync::PollReport;

fn field(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<26} {}", label, value);
}

fn section(out: &mut String, header: &str) {
    let _ = writeln!(out, "{header}");
}

fn ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let d = now.signed_duration_since(ts);
    if d.num_days() >= 1 {
        format!("{} days ago", d.num_days())
    } else if d.num_hours() >= 1 {
        format!("{} hours ago", d.num_hours())
    } else {
        format!("{} min ago", d.num_minutes().max(0))
    }
}

/// Vertical card for one ward, grouped by section.
pub fn ward_card(record: &WardRecord, view: &WardView, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", view.name);
    let _ = writeln!(out, "{} zone, {} view", view.zone, view.mode());
    out.push('\n');

    section(&mut out, "Identity");
    field(&mut out, "id", &view.id);
    field(&mut out, "zone", &view.zone);
    if let Some(pop) = &record.population {
        field(&mut out, "population", pop);
    }

    section(&mut out, "Risk");
    field(&mut out, "risk", view.risk);
    field(&mut out, "score", format!("{:.1}", view.score));
    if view.stale {
        field(&mut out, "stale", "yes");
    }

    match &view.detail {
        ViewDetail::Live {
            current_rainfall,
            drain_capacity,
            active_incidents,
            last_flood,
        } => {
            section(&mut out, "Current Conditions");
            field(&mut out, "rainfall", format!("{current_rainfall:.0} mm"));
            field(&mut out, "drain_capacity", format!("{drain_capacity:.0}%"));
            field(&mut out, "active_incidents", active_incidents);
            if let Some(ts) = last_flood {
                field(&mut out, "last_flood", ago(*ts, now));
            }
        }
        ViewDetail::Historical {
            flood_frequency,
            severe_floods,
            peak_rainfall,
            avg_drain_capacity,
        } => {
            section(&mut out, "Flood History");
            field(&mut out, "flood_frequency", flood_frequency);
            field(&mut out, "severe_floods", severe_floods);
            field(
                &mut out,
                "peak_rainfall",
                format!(
                    "{:.0} mm ({})",
                    peak_rainfall.value_mm,
                    peak_rainfall.recorded_at.format("%Y-%m-%d")
                ),
            );
            field(&mut out, "avg_drain_capacity", format!("{avg_drain_capacity:.0}%"));
        }
    }

    if let Some(ts) = record.updated_at {
        section(&mut out, "Timestamps");
        field(&mut out, "updated_at", ts.to_rfc3339());
    }
    out
}

/// Ranked table, one ward per line.
pub fn ranked_table(list: &[RankedWard]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>4}  {:<18} {:<12} {:<10} {:>6}", "#", "ward", "zone", "risk", "score");
    for entry in list {
        let v = &entry.view;
        let _ = writeln!(
            out,
            "{:>4}  {:<18} {:<12} {:<10} {:>6.1}{}",
            entry.rank,
            v.name,
            v.zone,
            v.risk,
            v.score,
            if v.stale { "  (stale)" } else { "" }
        );
    }
    if list.is_empty() {
        out.push_str("  (no wards at or above the requested level)\n");
    }
    out
}

fn summary_lines(out: &mut String, s: &RiskSummary) {
    for level in RiskLevel::ALL.iter().rev() {
        field(out, level.as_str(), s.count(*level));
    }
    field(out, "total", s.total);
    if s.stale > 0 {
        field(out, "stale", s.stale);
    }
}

pub fn summary(overall: &RiskSummary, by_zone: &BTreeMap<String, RiskSummary>) -> String {
    let mut out = String::new();
    section(&mut out, "All Wards");
    summary_lines(&mut out, overall);
    for (zone, s) in by_zone {
        out.push('\n');
        section(&mut out, zone);
        summary_lines(&mut out, s);
    }
    out
}

pub fn verification(reports: &[SourcePairReport]) -> String {
    let mut out = String::new();
    for r in reports {
        section(&mut out, &format!("{} vs {}", r.source_a, r.source_b));
        let rate = r
            .result
            .match_rate
            .map(|m| format!("{m}%"))
            .unwrap_or_else(|| "n/a".to_string());
        field(&mut out, "match_rate", rate);
        field(&mut out, "compared", r.result.compared);
        field(&mut out, "conflicts", r.result.conflicts);
        field(&mut out, "unmatched_entities", r.result.unmatched_entities);
        if !r.result.conflicting_entities.is_empty() {
            field(&mut out, "conflicting", r.result.conflicting_entities.join(", "));
        }
        field(&mut out, "checked_at", r.result.checked_at.to_rfc3339());
    }
    out
}

pub fn prediction(p: &PredictionResult, level: RiskLevel) -> String {
    let mut out = String::new();
    section(&mut out, &p.ward_name);
    field(&mut out, "probability", format!("{:.0}%", p.probability));
    field(&mut out, "risk", level);
    field(&mut out, "confidence", format!("{:.0}%", p.confidence));
    field(&mut out, "trend", p.trend);
    if let Some(tf) = &p.timeframe {
        field(&mut out, "timeframe", tf);
    }
    field(&mut out, "source", format!("{:?}", p.source).to_lowercase());
    if let Some(reason) = &p.override_reason {
        field(&mut out, "override_reason", reason);
    }
    if p.degraded_inputs {
        field(&mut out, "inputs", "fallback weather (degraded)");
    }
    out
}

pub fn poll_report(report: &PollReport<Vec<PredictionResult>>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "--- cycle {} at {} ---",
        report.cycle,
        report.completed_at.format("%H:%M:%S")
    );
    if let Some(reason) = &report.fallback_reason {
        let _ = writeln!(out, "fallback: {reason}");
    }
    for p in &report.value {
        let _ = writeln!(
            out,
            "  {:<18} {:>5.0}%  {}{}",
            p.ward_name,
            p.probability,
            p.trend,
            if p.degraded_inputs { "  (degraded inputs)" } else { "" }
        );
    }
    out
}

pub fn weather(w: &WeatherReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", w.location);
    if w.fallback {
        let _ = writeln!(
            out,
            "fallback data{}",
            w.error.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
        );
    }
    out.push('\n');
    section(&mut out, "Current");
    field(&mut out, "description", &w.description);
    field(&mut out, "temperature", format!("{:.0} C", w.temperature));
    field(&mut out, "humidity", format!("{:.0}%", w.humidity));
    field(&mut out, "rainfall", format!("{:.1} mm", w.rainfall));
    field(&mut out, "wind_speed", format!("{:.0} km/h", w.wind_speed));
    field(&mut out, "pressure", format!("{:.0} hPa", w.pressure));
    field(&mut out, "clouds", format!("{:.0}%", w.clouds));
    if !w.forecast.is_empty() {
        section(&mut out, "Forecast");
        for f in &w.forecast {
            field(
                &mut out,
                &f.time,
                format!("{:.0} C, {:.0} mm, {}", f.temperature, f.rainfall, f.description),
            );
        }
    }
    out
}
