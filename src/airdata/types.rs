use serde::{Deserialize, Serialize};

use crate::classify::{Pollutant, PollutantStatus, RiskLevel};

/// Entries in the hourly chart of a live derivation (trailing 24 hours).
pub const HOURLY_POINTS_LIVE: usize = 24;
/// Entries in the hourly chart of a generated fallback.
pub const HOURLY_POINTS_MOCK: usize = 8;
/// Entries in the monthly chart of a live derivation.
pub const MONTHLY_POINTS_LIVE: usize = 12;
/// Entries in the monthly chart of a generated fallback.
pub const MONTHLY_POINTS_MOCK: usize = 6;
/// Lookback window for the pollution-history call, seconds.
pub const HISTORY_LOOKBACK_SECS: i64 = 24 * 3600;

/// Caller-supplied location, optionally carrying the externally-scaled AQI
/// the UI already knows for that place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub aqi_hint: Option<u32>,
}

impl Location {
    /// Canonical fixed-precision key. Equality of locations is equality of
    /// this string, and it doubles as the mock generator seed.
    pub fn key(&self) -> String {
        format!("{:.4},{:.4}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub uv_index: u32,
    pub aqi: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReading {
    pub name: Pollutant,
    pub value: f64,
    pub status: PollutantStatus,
    pub unit: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time: String,
    pub aqi: f64,
    pub pm25: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub aqi: f64,
    pub flare_ups: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBundle {
    pub hourly: Vec<HourlyPoint>,
    pub monthly: Vec<MonthlyPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Generated,
}

/// The combined payload delivered for one location: weather, pollutant
/// readings and chart series, updated atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedResult {
    pub weather: WeatherSnapshot,
    pub pollutants: Vec<PollutantReading>,
    pub charts: ChartBundle,
    pub risk: RiskLevel,
    pub source: DataSource,
}

// Raw provider payloads. Deserialization doubles as the required-field check:
// a missing field fails the whole derivation.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteoForecastResponse {
    pub current: MeteoCurrent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteoCurrent {
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub wind_speed_10m: f64,
    pub uv_index: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirPollutionResponse {
    pub list: Vec<PollutionSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollutionSample {
    pub dt: i64,
    pub main: PollutionIndex,
    pub components: PollutionComponents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollutionIndex {
    pub aqi: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollutionComponents {
    pub pm2_5: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
}
