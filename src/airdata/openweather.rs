use super::types::*;
use crate::classify::{classify_pollutant, Pollutant};
use crate::config::Config;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

/// A required field was missing or malformed in a provider response. Treated
/// like a network failure: the whole derivation falls back.
#[derive(Error, Debug)]
#[error("invalid response shape: {0}")]
pub struct InvalidResponseShape(pub String);

/// URL construction for the two upstream providers: Open-Meteo for current
/// weather (keyless), OpenWeather for pollution current and history.
pub struct AirDataApi {
    config: Config,
}

impl AirDataApi {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn is_valid_coordinates(lat: f64, lon: f64) -> bool {
        lat >= -90.0 && lat <= 90.0 && lon >= -180.0 && lon <= 180.0
    }

    pub fn current_weather_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}{}?latitude={}&longitude={}&current=temperature_2m,relative_humidity_2m,wind_speed_10m,uv_index&timezone=auto",
            self.config.openmeteo_base_url, self.config.openmeteo_forecast_path, lat, lon
        )
    }

    pub fn current_pollution_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}{}?lat={}&lon={}&appid={}",
            self.config.openweather_base_url,
            self.config.openweather_air_pollution_path,
            lat,
            lon,
            self.config.openweather_api_key
        )
    }

    pub fn pollution_history_url(&self, lat: f64, lon: f64, start: i64, end: i64) -> String {
        format!(
            "{}{}?lat={}&lon={}&start={}&end={}&appid={}",
            self.config.openweather_base_url,
            self.config.openweather_air_pollution_history_path,
            lat,
            lon,
            start,
            end,
            self.config.openweather_api_key
        )
    }
}

pub fn parse_current_weather(raw: Value) -> Result<MeteoCurrent, InvalidResponseShape> {
    let response: MeteoForecastResponse = serde_json::from_value(raw)
        .map_err(|e| InvalidResponseShape(format!("current weather: {}", e)))?;
    Ok(response.current)
}

/// Current pollution: the first sample is the present-time reading.
pub fn parse_current_pollution(raw: Value) -> Result<PollutionSample, InvalidResponseShape> {
    let response: AirPollutionResponse = serde_json::from_value(raw)
        .map_err(|e| InvalidResponseShape(format!("current pollution: {}", e)))?;
    response
        .list
        .into_iter()
        .next()
        .ok_or_else(|| InvalidResponseShape("current pollution: empty list".to_string()))
}

/// Pollution history: needs at least a full day of hourly samples to build
/// the 24-point chart.
pub fn parse_pollution_history(raw: Value) -> Result<Vec<PollutionSample>, InvalidResponseShape> {
    let response: AirPollutionResponse = serde_json::from_value(raw)
        .map_err(|e| InvalidResponseShape(format!("pollution history: {}", e)))?;
    if response.list.len() < HOURLY_POINTS_LIVE {
        return Err(InvalidResponseShape(format!(
            "pollution history: expected at least {} samples, got {}",
            HOURLY_POINTS_LIVE,
            response.list.len()
        )));
    }
    Ok(response.list)
}

pub fn snapshot_from(current: &MeteoCurrent, external_aqi: u32) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature: current.temperature_2m.round(),
        humidity: current.relative_humidity_2m,
        wind_speed: current.wind_speed_10m,
        uv_index: current.uv_index.round().max(0.0) as u32,
        aqi: external_aqi,
    }
}

pub fn pollutants_from(components: &PollutionComponents) -> Vec<PollutantReading> {
    [
        (Pollutant::Pm25, components.pm2_5),
        (Pollutant::O3, components.o3),
        (Pollutant::No2, components.no2),
        (Pollutant::Pm10, components.pm10),
    ]
    .into_iter()
    .map(|(name, value)| PollutantReading {
        name,
        value,
        status: classify_pollutant(name, value),
        unit: "μg/m³".to_string(),
        description: name.description().to_string(),
    })
    .collect()
}

/// Builds the 24-point hourly chart from the trailing day of history
/// samples, oldest first, labeled by hour of day.
pub fn hourly_from_history(samples: &[PollutionSample]) -> Vec<HourlyPoint> {
    samples[samples.len() - HOURLY_POINTS_LIVE..]
        .iter()
        .map(|sample| {
            let hour = Utc
                .timestamp_opt(sample.dt, 0)
                .single()
                .map(|dt: DateTime<Utc>| dt.format("%-H:00").to_string())
                .unwrap_or_else(|| "0:00".to_string());
            HourlyPoint {
                time: hour,
                aqi: sample.main.aqi as f64,
                pm25: sample.components.pm2_5,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(dt: i64, aqi: u8, pm25: f64) -> Value {
        json!({
            "dt": dt,
            "main": {"aqi": aqi},
            "components": {
                "pm2_5": pm25, "pm10": 30.0, "o3": 70.0,
                "no2": 25.0, "so2": 5.0, "co": 300.0
            }
        })
    }

    #[test]
    fn missing_weather_field_is_invalid_shape() {
        let raw = json!({"current": {"temperature_2m": 28.0, "relative_humidity_2m": 70.0}});
        assert!(parse_current_weather(raw).is_err());
    }

    #[test]
    fn empty_pollution_list_is_invalid_shape() {
        assert!(parse_current_pollution(json!({"list": []})).is_err());
    }

    #[test]
    fn short_history_is_invalid_shape() {
        let raw = json!({ "list": (0..10).map(|i| sample(i * 3600, 2, 12.0)).collect::<Vec<_>>() });
        assert!(parse_pollution_history(raw).is_err());
    }

    #[test]
    fn hourly_chart_takes_trailing_24_samples() {
        let raw = json!({
            "list": (0..30).map(|i| sample(1_700_000_000 + i * 3600, 3, i as f64)).collect::<Vec<_>>()
        });
        let samples = parse_pollution_history(raw).unwrap();
        let hourly = hourly_from_history(&samples);

        assert_eq!(hourly.len(), HOURLY_POINTS_LIVE);
        assert_eq!(hourly[0].pm25, 6.0);
        assert_eq!(hourly[23].pm25, 29.0);
        assert!(hourly.iter().all(|p| p.aqi == 3.0));
    }

    #[test]
    fn pollutant_readings_are_classified() {
        let components = PollutionComponents {
            pm2_5: 9.9,
            pm10: 210.0,
            o3: 70.0,
            no2: 25.0,
            so2: 5.0,
            co: 300.0,
        };
        let readings = pollutants_from(&components);

        assert_eq!(readings.len(), 4);
        let pm25 = readings.iter().find(|r| r.name == Pollutant::Pm25).unwrap();
        assert_eq!(pm25.status, crate::classify::PollutantStatus::Good);
        let pm10 = readings.iter().find(|r| r.name == Pollutant::Pm10).unwrap();
        assert_eq!(pm10.status, crate::classify::PollutantStatus::VeryPoor);
        assert!(readings.iter().all(|r| r.unit == "μg/m³"));
    }
}
