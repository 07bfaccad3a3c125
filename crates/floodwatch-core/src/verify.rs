//! Cross-source verification.
//!
//! Two sources (citizen reports, rain gauges, drainage sensors, ...) observe
//! the same wards. Joining their readings on entity id gives a match rate and
//! a conflict count; entities only one side saw are reported, not compared.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One source's observation of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReading {
    pub source_id: String,
    pub entity_id: String,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Percentage of comparable entities that agree. `None` when nothing was
    /// comparable.
    pub match_rate: Option<u8>,
    pub conflicts: usize,
    /// Entities present in only one of the two sources.
    pub unmatched_entities: usize,
    /// Entities present in both sources.
    pub compared: usize,
    /// Ids of the entities that disagreed, sorted.
    pub conflicting_entities: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

/// Verification of one pair of named sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePairReport {
    pub source_a: String,
    pub source_b: String,
    pub result: VerificationResult,
}

/// Latest reading per entity; later input position wins a timestamp tie.
fn latest_by_entity(readings: &[SourceReading]) -> BTreeMap<&str, &SourceReading> {
    let mut latest: BTreeMap<&str, &SourceReading> = BTreeMap::new();
    for reading in readings {
        match latest.get(reading.entity_id.as_str()) {
            Some(existing) if existing.observed_at > reading.observed_at => {}
            _ => {
                latest.insert(reading.entity_id.as_str(), reading);
            }
        }
    }
    latest
}

/// Compare two sources' readings entity by entity.
///
/// Readings agree when their values differ by at most `tolerance`; a negative
/// or NaN tolerance counts as zero.
pub fn verify(
    a: &[SourceReading],
    b: &[SourceReading],
    tolerance: f64,
    checked_at: DateTime<Utc>,
) -> VerificationResult {
    let tolerance = if tolerance.is_nan() { 0.0 } else { tolerance.max(0.0) };
    let left = latest_by_entity(a);
    let right = latest_by_entity(b);

    let mut compared = 0usize;
    let mut agreements = 0usize;
    let mut conflicting_entities = Vec::new();

    for (entity, ra) in &left {
        let Some(rb) = right.get(entity) else {
            continue;
        };
        compared += 1;
        if (ra.value - rb.value).abs() <= tolerance {
            agreements += 1;
        } else {
            conflicting_entities.push(entity.to_string());
        }
    }

    let unmatched_entities = (left.len() - compared) + (right.len() - compared);
    let match_rate = (compared > 0)
        .then(|| ((agreements as f64 / compared as f64) * 100.0).round() as u8);

    if compared > 0 && agreements < compared {
        tracing::debug!(
            compared,
            conflicts = compared - agreements,
            unmatched = unmatched_entities,
            "sources disagree"
        );
    }

    VerificationResult {
        match_rate,
        conflicts: compared - agreements,
        unmatched_entities,
        compared,
        conflicting_entities,
        checked_at,
    }
}

/// Verify every unordered pair of named sources, in input order.
pub fn verify_sources(
    sources: &[(&str, &[SourceReading])],
    tolerance: f64,
    checked_at: DateTime<Utc>,
) -> Vec<SourcePairReport> {
    let mut reports = Vec::new();
    for (i, (name_a, readings_a)) in sources.iter().enumerate() {
        for (name_b, readings_b) in &sources[i + 1..] {
            reports.push(SourcePairReport {
                source_a: name_a.to_string(),
                source_b: name_b.to_string(),
                result: verify(readings_a, readings_b, tolerance, checked_at),
            });
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 14, 12, 0, 0).unwrap()
    }

    fn reading(source: &str, entity: &str, value: f64) -> SourceReading {
        SourceReading {
            source_id: source.into(),
            entity_id: entity.into(),
            value,
            observed_at: t0(),
        }
    }

    fn gauges() -> Vec<SourceReading> {
        vec![
            reading("imd", "chandni-chowk", 52.0),
            reading("imd", "karol-bagh", 45.0),
            reading("imd", "ito", 42.0),
            reading("imd", "dwarka", 22.0),
        ]
    }

    #[test]
    fn empty_inputs_have_no_match_rate() {
        let result = verify(&[], &[], 5.0, t0());
        assert_eq!(result.match_rate, None);
        assert_eq!(result.conflicts, 0);
        assert_eq!(result.unmatched_entities, 0);
        assert_eq!(result.compared, 0);
        assert_eq!(result.checked_at, t0());
    }

    #[test]
    fn identical_collections_fully_agree() {
        for tol in [0.0, 0.5, 5.0, 100.0] {
            let result = verify(&gauges(), &gauges(), tol, t0());
            assert_eq!(result.match_rate, Some(100));
            assert_eq!(result.conflicts, 0);
            assert_eq!(result.compared, 4);
        }
    }

    #[test]
    fn disjoint_sources_are_unmatched_not_conflicting() {
        let a = vec![reading("imd", "rohini", 10.0)];
        let b = vec![reading("sensors", "okhla", 10.0)];
        let result = verify(&a, &b, 5.0, t0());
        assert_eq!(result.match_rate, None);
        assert_eq!(result.conflicts, 0);
        assert_eq!(result.unmatched_entities, 2);
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let a = vec![reading("imd", "ito", 40.0)];
        let b = vec![reading("sensors", "ito", 45.0)];
        assert_eq!(verify(&a, &b, 5.0, t0()).match_rate, Some(100));
        assert_eq!(verify(&a, &b, 4.99, t0()).match_rate, Some(0));
    }

    #[test]
    fn partial_agreement_rounds_to_nearest() {
        let a = gauges();
        let b = vec![
            reading("sensors", "chandni-chowk", 50.0),
            reading("sensors", "karol-bagh", 60.0),
            reading("sensors", "ito", 41.0),
            reading("sensors", "laxmi-nagar", 30.0),
        ];
        let result = verify(&a, &b, 5.0, t0());
        // 2 of 3 comparable agree: 66.67 -> 67.
        assert_eq!(result.compared, 3);
        assert_eq!(result.match_rate, Some(67));
        assert_eq!(result.conflicts, 1);
        assert_eq!(result.conflicting_entities, vec!["karol-bagh".to_string()]);
        // dwarka only in a, laxmi-nagar only in b.
        assert_eq!(result.unmatched_entities, 2);
    }

    #[test]
    fn latest_duplicate_reading_wins() {
        let mut stale = reading("imd", "ito", 10.0);
        stale.observed_at = t0() - Duration::minutes(30);
        let fresh = reading("imd", "ito", 42.0);
        let a = vec![fresh, stale];
        let b = vec![reading("sensors", "ito", 43.0)];

        let result = verify(&a, &b, 2.0, t0());
        assert_eq!(result.compared, 1);
        assert_eq!(result.match_rate, Some(100));
    }

    #[test]
    fn negative_or_nan_tolerance_means_exact_match() {
        let a = vec![reading("imd", "ito", 40.0), reading("imd", "okhla", 12.0)];
        let b = vec![reading("x", "ito", 40.0), reading("x", "okhla", 12.5)];
        for tol in [-3.0, f64::NAN] {
            let result = verify(&a, &b, tol, t0());
            assert_eq!(result.match_rate, Some(50));
            assert_eq!(result.conflicts, 1);
        }
    }

    #[test]
    fn verify_is_symmetric_in_counts() {
        let b = vec![
            reading("sensors", "chandni-chowk", 70.0),
            reading("sensors", "ito", 42.5),
        ];
        let ab = verify(&gauges(), &b, 5.0, t0());
        let ba = verify(&b, &gauges(), 5.0, t0());
        assert_eq!(ab.match_rate, ba.match_rate);
        assert_eq!(ab.conflicts, ba.conflicts);
        assert_eq!(ab.unmatched_entities, ba.unmatched_entities);
    }

    #[test]
    fn pairwise_matrix_covers_each_pair_once() {
        let citizen = vec![reading("citizen", "ito", 40.0)];
        let twitter = vec![reading("twitter", "ito", 55.0)];
        let sensors = vec![reading("sensors", "ito", 41.0)];
        let reports = verify_sources(
            &[
                ("Citizen Reports", citizen.as_slice()),
                ("Twitter/X", twitter.as_slice()),
                ("Drainage Sensors", sensors.as_slice()),
            ],
            5.0,
            t0(),
        );
        let pairs: Vec<(&str, &str)> = reports
            .iter()
            .map(|r| (r.source_a.as_str(), r.source_b.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Citizen Reports", "Twitter/X"),
                ("Citizen Reports", "Drainage Sensors"),
                ("Twitter/X", "Drainage Sensors"),
            ]
        );
        assert_eq!(reports[0].result.match_rate, Some(0));
        assert_eq!(reports[1].result.match_rate, Some(100));
    }
}
