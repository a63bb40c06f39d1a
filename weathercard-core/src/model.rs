use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::weather_code::{WeatherKind, classify};

/// Reading from the configured observation station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentObservation {
    pub observation_time: DateTime<FixedOffset>,
    pub location_name: String,
    pub temperature: f64,
    pub wind_speed: f64,
}

/// First forecast period for the configured location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub description: String,
    pub weather_code: u16,
    pub rain_possibility: u8,
    pub comfortably: String,
}

/// Sunrise and sunset clock times for one local date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunTimes {
    pub date: NaiveDate,
    pub sunrise: NaiveTime,
    pub sunset: NaiveTime,
}

/// Everything the card displays, replaced as a whole when a refresh completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    pub observation_time: DateTime<FixedOffset>,
    pub location_name: String,
    pub description: String,
    pub comfortably: String,
    pub weather_code: u16,
    pub rain_possibility: u8,
    pub wind_speed: f64,
    pub temperature: f64,
    pub is_loading: bool,
}

impl WeatherState {
    /// Placeholder shown before the first refresh completes.
    pub fn placeholder() -> Self {
        Self {
            observation_time: Local::now().fixed_offset(),
            location_name: String::new(),
            description: String::new(),
            comfortably: String::new(),
            weather_code: 0,
            rain_possibility: 0,
            wind_speed: 0.0,
            temperature: 0.0,
            is_loading: true,
        }
    }

    pub fn merge(current: CurrentObservation, forecast: ForecastSummary) -> Self {
        Self {
            observation_time: current.observation_time,
            location_name: current.location_name,
            description: forecast.description,
            comfortably: forecast.comfortably,
            weather_code: forecast.weather_code,
            rain_possibility: forecast.rain_possibility,
            wind_speed: current.wind_speed,
            temperature: current.temperature,
            is_loading: false,
        }
    }

    /// Whole-degree temperature for display; halves round up.
    pub fn display_temperature(&self) -> i64 {
        (self.temperature + 0.5).floor() as i64
    }

    pub fn weather_kind(&self) -> Option<WeatherKind> {
        classify(self.weather_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Day,
    Night,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Day => "day",
            ThemeMode::Night => "night",
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
