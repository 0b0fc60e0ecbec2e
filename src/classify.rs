use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "O3")]
    O3,
    #[serde(rename = "NO2")]
    No2,
}

impl Pollutant {
    pub fn description(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "Fine particulate matter",
            Pollutant::Pm10 => "Coarse particulate matter",
            Pollutant::O3 => "Ground level ozone",
            Pollutant::No2 => "Nitrogen dioxide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollutantStatus {
    Good,
    Fair,
    Moderate,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
}

/// Classifies a pollutant concentration (μg/m³) against per-pollutant bands.
pub fn classify_pollutant(pollutant: Pollutant, concentration: f64) -> PollutantStatus {
    let (good, fair, moderate, poor) = match pollutant {
        Pollutant::Pm25 => (10.0, 25.0, 50.0, 75.0),
        Pollutant::Pm10 => (20.0, 50.0, 100.0, 200.0),
        Pollutant::O3 => (60.0, 100.0, 140.0, 180.0),
        Pollutant::No2 => (40.0, 70.0, 150.0, 200.0),
    };

    if concentration < good {
        PollutantStatus::Good
    } else if concentration < fair {
        PollutantStatus::Fair
    } else if concentration < moderate {
        PollutantStatus::Moderate
    } else if concentration < poor {
        PollutantStatus::Poor
    } else {
        PollutantStatus::VeryPoor
    }
}

/// Six-level risk label for the external 0–500 AQI scale, used for coloring
/// and alert copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Good,
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    SensitiveGroups,
    Unhealthy,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Hazardous,
}

pub fn risk_level(external_aqi: u32) -> RiskLevel {
    if external_aqi <= 50 {
        RiskLevel::Good
    } else if external_aqi <= 100 {
        RiskLevel::Moderate
    } else if external_aqi <= 150 {
        RiskLevel::SensitiveGroups
    } else if external_aqi <= 200 {
        RiskLevel::Unhealthy
    } else if external_aqi <= 300 {
        RiskLevel::VeryPoor
    } else {
        RiskLevel::Hazardous
    }
}

/// Collapses the external 0–500 scale to the internal 1–5 scale the charts
/// plot against.
pub fn internal_aqi(external_aqi: u32) -> u8 {
    if external_aqi <= 50 {
        1
    } else if external_aqi <= 100 {
        2
    } else if external_aqi <= 150 {
        3
    } else if external_aqi <= 200 {
        4
    } else {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pm25_boundary_is_exact() {
        assert_eq!(
            classify_pollutant(Pollutant::Pm25, 9.9),
            PollutantStatus::Good
        );
        assert_eq!(
            classify_pollutant(Pollutant::Pm25, 10.0),
            PollutantStatus::Fair
        );
        assert_eq!(
            classify_pollutant(Pollutant::Pm25, 74.9),
            PollutantStatus::Poor
        );
        assert_eq!(
            classify_pollutant(Pollutant::Pm25, 75.0),
            PollutantStatus::VeryPoor
        );
    }

    #[test]
    fn per_pollutant_bands_differ() {
        // 45 μg/m³ means different things per pollutant.
        assert_eq!(
            classify_pollutant(Pollutant::Pm25, 45.0),
            PollutantStatus::Moderate
        );
        assert_eq!(
            classify_pollutant(Pollutant::Pm10, 45.0),
            PollutantStatus::Fair
        );
        assert_eq!(
            classify_pollutant(Pollutant::O3, 45.0),
            PollutantStatus::Good
        );
        assert_eq!(
            classify_pollutant(Pollutant::No2, 45.0),
            PollutantStatus::Fair
        );
    }

    #[test]
    fn risk_boundaries_are_upper_inclusive() {
        assert_eq!(risk_level(50), RiskLevel::Good);
        assert_eq!(risk_level(51), RiskLevel::Moderate);
        assert_eq!(risk_level(150), RiskLevel::SensitiveGroups);
        assert_eq!(risk_level(300), RiskLevel::VeryPoor);
        assert_eq!(risk_level(301), RiskLevel::Hazardous);
    }

    #[test]
    fn internal_scale_tracks_risk_tiers() {
        assert_eq!(internal_aqi(50), 1);
        assert_eq!(internal_aqi(51), 2);
        assert_eq!(internal_aqi(100), 2);
        assert_eq!(internal_aqi(201), 5);
        assert_eq!(internal_aqi(450), 5);
    }
}
