use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_air_pollution_path: String,
    pub openweather_air_pollution_history_path: String,
    pub openmeteo_base_url: String,
    pub openmeteo_forecast_path: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENWEATHER_API_KEY not set"))?,
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_air_pollution_path: env::var("OPENWEATHER_AIR_POLLUTION_PATH")
                .unwrap_or_else(|_| "/data/2.5/air_pollution".to_string()),
            openweather_air_pollution_history_path: env::var(
                "OPENWEATHER_AIR_POLLUTION_HISTORY_PATH",
            )
            .unwrap_or_else(|_| "/data/2.5/air_pollution/history".to_string()),
            openmeteo_base_url: env::var("OPENMETEO_BASE_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com".to_string()),
            openmeteo_forecast_path: env::var("OPENMETEO_FORECAST_PATH")
                .unwrap_or_else(|_| "/v1/forecast".to_string()),
        })
    }
}
