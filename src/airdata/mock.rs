use super::openweather::pollutants_from;
use super::types::*;
use crate::classify::{internal_aqi, risk_level};
use chrono::{DateTime, Datelike, Timelike, Utc};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Polynomial hash of the canonical location key, folded into a 32-bit
/// signed integer and taken absolute. The sole source of variation in
/// generated data, so output is reproducible per location.
pub fn simple_hash(key: &str) -> u32 {
    let mut hash: i32 = 0;
    for c in key.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as i32);
    }
    hash.unsigned_abs()
}

/// Hash-seeded offset in [-0.4, 0.4) for series entry `index`.
fn variation(hash: u32, index: u32) -> f64 {
    ((hash as u64 + index as u64 * 7919) % 100) as f64 / 100.0 * 0.8 - 0.4
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fully-populated deterministic result for a location with no live data.
/// Same key, same output, so repeated fallbacks render stably.
pub fn generate(key: &str, location: &Location, now: DateTime<Utc>) -> DerivedResult {
    let hash = simple_hash(key);
    let external_aqi = location.aqi_hint.unwrap_or(0);
    let base_aqi = internal_aqi(external_aqi) as f64;

    let weather = WeatherSnapshot {
        temperature: (22 + hash % 10) as f64,
        humidity: ((60 + hash % 30) as f64).clamp(0.0, 100.0),
        wind_speed: ((1 + hash % 5) as f64 * 10.0).round() / 10.0,
        uv_index: 1 + hash % 10,
        aqi: external_aqi,
    };

    let components = PollutionComponents {
        pm2_5: (12 + hash % 20) as f64,
        pm10: (25 + hash % 25) as f64,
        o3: (50 + hash % 40) as f64,
        no2: (30 + hash % 30) as f64,
        so2: (5 + hash % 10) as f64,
        co: (250 + hash % 200) as f64,
    };

    let charts = ChartBundle {
        hourly: hourly_series(hash, base_aqi, HOURLY_POINTS_MOCK, now),
        monthly: monthly_series(hash, base_aqi, MONTHLY_POINTS_MOCK, now),
    };

    DerivedResult {
        weather,
        pollutants: pollutants_from(&components),
        charts,
        risk: risk_level(external_aqi),
        source: DataSource::Generated,
    }
}

/// Trailing `len` hours ending at the current hour, with additive
/// adjustments for rush-hour bands and the overnight lull.
pub fn hourly_series(hash: u32, base_aqi: f64, len: usize, now: DateTime<Utc>) -> Vec<HourlyPoint> {
    let current_hour = now.hour() as i64;

    (0..len)
        .map(|i| {
            let hour = (current_hour - (len as i64 - 1) + i as i64).rem_euclid(24) as u32;
            let mut variance = variation(hash, i as u32);

            if (7..=9).contains(&hour) {
                variance += 0.3; // Morning rush
            }
            if (16..=18).contains(&hour) {
                variance += 0.2; // Evening rush
            }
            if hour <= 4 {
                variance -= 0.2; // Night improvement
            }

            let aqi = round1((base_aqi + variance).clamp(1.0, 5.0));
            let pm25 = (aqi * 12.0 + ((hash as u64 + i as u64) % 5) as f64).round();

            HourlyPoint {
                time: format!("{}:00", hour),
                aqi,
                pm25,
            }
        })
        .collect()
}

/// Trailing `len` months oldest-to-newest ending at the current month, with
/// a seasonal bump over the dry-season ranges (Feb-Mar, Aug-Oct).
pub fn monthly_series(
    hash: u32,
    base_aqi: f64,
    len: usize,
    now: DateTime<Utc>,
) -> Vec<MonthlyPoint> {
    let current_month = now.month0() as usize;

    (0..len)
        .map(|i| {
            let month_index = (current_month + 12 - (len - 1) + i) % 12;
            let seasonal = if (1..=2).contains(&month_index) {
                0.5
            } else if (7..=9).contains(&month_index) {
                0.7
            } else {
                0.0
            };

            let variance = variation(hash, (i + 100) as u32) + seasonal;
            let aqi = round1((base_aqi + variance).clamp(1.0, 5.0));
            let flare_ups = (aqi * 2.5 + ((hash as u64 + i as u64) % 5) as f64).round() as u32;

            MonthlyPoint {
                month: MONTHS[month_index].to_string(),
                aqi,
                flare_ups,
            }
        })
        .collect()
}
