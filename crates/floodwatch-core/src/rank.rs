//! Priority ordering of ward views for response lists.
//!
//! Ordering keys, most significant first:
//!
//! 1. risk level, most severe first
//! 2. score, highest first
//! 3. ward name, ascending
//!
//! Views equal on all three keep their input order, so the output is fully
//! determined by the input sequence.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::risk::RiskLevel;
use crate::view::WardView;

fn priority(a: &WardView, b: &WardView) -> Ordering {
    b.risk
        .cmp(&a.risk)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.name.cmp(&b.name))
}

/// Return the views in priority order. The input is left untouched.
pub fn rank(views: &[WardView]) -> Vec<WardView> {
    let mut ranked = views.to_vec();
    // `sort_by` is stable.
    ranked.sort_by(priority);
    ranked
}

/// A view with its 1-based position in a response list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedWard {
    pub rank: usize,
    pub view: WardView,
}

/// Rank, keep views at or above `min_level`, and number the first `limit`.
pub fn response_list(views: &[WardView], min_level: RiskLevel, limit: Option<usize>) -> Vec<RankedWard> {
    rank(views)
        .into_iter()
        .filter(|v| v.risk >= min_level)
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(i, view)| RankedWard { rank: i + 1, view })
        .collect()
}

/// Per-level ward counts for one set of views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total: usize,
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
    pub critical: usize,
    pub stale: usize,
}

impl RiskSummary {
    fn add(&mut self, view: &WardView) {
        self.total += 1;
        match view.risk {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
        if view.stale {
            self.stale += 1;
        }
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Moderate => self.moderate,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }
}

pub fn summarize(views: &[WardView]) -> RiskSummary {
    let mut summary = RiskSummary::default();
    for view in views {
        summary.add(view);
    }
    summary
}

/// Summaries keyed by zone, zones in ascending order.
pub fn summarize_by_zone(views: &[WardView]) -> BTreeMap<String, RiskSummary> {
    let mut zones: BTreeMap<String, RiskSummary> = BTreeMap::new();
    for view in views {
        zones.entry(view.zone.clone()).or_default().add(view);
    }
    zones
}
