//! Built-in Delhi ward dataset.
//!
//! Ten wards across six zones, as shown on the ward dashboard. Relative ages
//! ("last flood 2 hours ago") are resolved against the `now` passed in, so the
//! set is deterministic for a fixed clock.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::ward::{PeakRainfall, WardRecord};

struct Row {
    id: &'static str,
    name: &'static str,
    zone: &'static str,
    population: &'static str,
    rainfall: f64,
    drain: f64,
    incidents: u32,
    last_flood_hours: i64,
    frequency: u32,
    severe: u32,
    peak_mm: f64,
    peak_on: (i32, u32, u32),
    avg_drain: f64,
}

#[rustfmt::skip]
const ROWS: &[Row] = &[
    Row { id: "1", name: "Chandni Chowk", zone: "Central", population: "156K", rainfall: 52.0, drain: 15.0, incidents: 4, last_flood_hours: 2, frequency: 47, severe: 18, peak_mm: 162.0, peak_on: (2023, 8, 12), avg_drain: 20.0 },
    Row { id: "2", name: "Nehru Place", zone: "South", population: "89K", rainfall: 48.0, drain: 22.0, incidents: 3, last_flood_hours: 4, frequency: 38, severe: 12, peak_mm: 148.0, peak_on: (2023, 7, 9), avg_drain: 30.0 },
    Row { id: "3", name: "Karol Bagh", zone: "Central", population: "178K", rainfall: 45.0, drain: 28.0, incidents: 2, last_flood_hours: 6, frequency: 42, severe: 14, peak_mm: 155.0, peak_on: (2023, 7, 9), avg_drain: 30.0 },
    Row { id: "4", name: "ITO", zone: "Central", population: "45K", rainfall: 42.0, drain: 35.0, incidents: 2, last_flood_hours: 8, frequency: 35, severe: 6, peak_mm: 139.0, peak_on: (2022, 9, 1), avg_drain: 45.0 },
    Row { id: "5", name: "Rajouri Garden", zone: "West", population: "203K", rainfall: 44.0, drain: 32.0, incidents: 2, last_flood_hours: 5, frequency: 31, severe: 10, peak_mm: 141.0, peak_on: (2023, 7, 8), avg_drain: 35.0 },
    Row { id: "6", name: "Lajpat Nagar", zone: "South", population: "145K", rainfall: 38.0, drain: 45.0, incidents: 1, last_flood_hours: 24, frequency: 28, severe: 9, peak_mm: 128.0, peak_on: (2021, 9, 11), avg_drain: 40.0 },
    Row { id: "7", name: "Pitampura", zone: "North", population: "267K", rainfall: 35.0, drain: 52.0, incidents: 1, last_flood_hours: 48, frequency: 24, severe: 5, peak_mm: 117.0, peak_on: (2022, 8, 20), avg_drain: 50.0 },
    Row { id: "8", name: "Shahdara", zone: "East", population: "312K", rainfall: 40.0, drain: 38.0, incidents: 1, last_flood_hours: 12, frequency: 29, severe: 11, peak_mm: 133.0, peak_on: (2023, 7, 13), avg_drain: 38.0 },
    Row { id: "9", name: "Rohini", zone: "North", population: "445K", rainfall: 28.0, drain: 68.0, incidents: 0, last_flood_hours: 120, frequency: 18, severe: 3, peak_mm: 104.0, peak_on: (2021, 7, 19), avg_drain: 60.0 },
    Row { id: "10", name: "Dwarka", zone: "South-West", population: "389K", rainfall: 22.0, drain: 75.0, incidents: 0, last_flood_hours: 336, frequency: 12, severe: 1, peak_mm: 96.0, peak_on: (2020, 8, 19), avg_drain: 72.0 },
];

/// The live data in the set was refreshed this long before `now`.
const REFRESHED_MINUTES_AGO: i64 = 2;

/// The Delhi wards, with live attributes refreshed just before `now`.
pub fn delhi_wards(now: DateTime<Utc>) -> Vec<WardRecord> {
    ROWS.iter()
        .map(|row| {
            let (y, m, d) = row.peak_on;
            WardRecord {
                id: row.id.to_string(),
                name: row.name.to_string(),
                zone: row.zone.to_string(),
                population: Some(row.population.to_string()),
                current_rainfall: row.rainfall,
                drain_capacity: row.drain,
                active_incidents: row.incidents,
                last_flood: Some(now - Duration::hours(row.last_flood_hours)),
                updated_at: Some(now - Duration::minutes(REFRESHED_MINUTES_AGO)),
                flood_frequency: row.frequency,
                severe_floods: row.severe,
                peak_rainfall: PeakRainfall {
                    value_mm: row.peak_mm,
                    recorded_at: Utc
                        .with_ymd_and_hms(y, m, d, 0, 0, 0)
                        .single()
                        .unwrap_or(now),
                },
                avg_drain_capacity: row.avg_drain,
            }
        })
        .collect()
}

/// Look a ward up by name, ignoring ASCII case.
pub fn find_ward<'a>(wards: &'a [WardRecord], name: &str) -> Option<&'a WardRecord> {
    wards.iter().find(|w| w.name.eq_ignore_ascii_case(name.trim()))
}
