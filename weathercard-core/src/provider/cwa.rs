use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::{Config, Datasets},
    error::WeatherError,
    model::{CurrentObservation, ForecastSummary, SunTimes},
};

use super::WeatherSource;

/// CWA reports missing station readings as -99 (sometimes -999).
const MISSING_READING: f64 = -99.0;

/// Client for the Central Weather Administration open-data REST API.
#[derive(Debug, Clone)]
pub struct CwaClient {
    api_key: String,
    base_url: String,
    station_id: String,
    location_name: String,
    sun_location: String,
    datasets: Datasets,
    http: Client,
}

impl CwaClient {
    pub fn from_config(api_key: String, config: &Config) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .user_agent(concat!("weathercard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            station_id: config.station_id.clone(),
            location_name: config.location_name.clone(),
            sun_location: config.sun_location().to_string(),
            datasets: config.datasets.clone(),
            http,
        })
    }

    fn dataset_url(&self, dataset: &str) -> String {
        format!("{}/v1/rest/datastore/{}", self.base_url, dataset)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        dataset: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        let url = self.dataset_url(dataset);
        debug!(endpoint, %url, "CWA request");

        let res = self
            .http
            .get(&url)
            .query(&[("Authorization", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Http {
                endpoint,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| WeatherError::Decode { endpoint, source })
    }
}

#[async_trait]
impl WeatherSource for CwaClient {
    async fn fetch_current(&self) -> Result<CurrentObservation, WeatherError> {
        let parsed: CurrentResponse = self
            .get_json(
                "current observation",
                &self.datasets.current,
                &[("StationId", self.station_id.as_str())],
            )
            .await?;

        normalize_current(parsed)
    }

    async fn fetch_forecast(&self) -> Result<ForecastSummary, WeatherError> {
        let parsed: ForecastResponse = self
            .get_json(
                "forecast",
                &self.datasets.forecast,
                &[
                    ("locationName", self.location_name.as_str()),
                    ("elementName", "Wx,PoP,CI"),
                ],
            )
            .await?;

        normalize_forecast(parsed)
    }

    async fn fetch_sun_times(&self) -> Result<Vec<SunTimes>, WeatherError> {
        let parsed: SunResponse = self
            .get_json(
                "sunrise/sunset",
                &self.datasets.sun,
                &[("CountyName", self.sun_location.as_str())],
            )
            .await?;

        normalize_sun_times(parsed)
    }

    fn location_name(&self) -> &str {
        &self.sun_location
    }
}

// Current observation (O-A0003-001)

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    records: Option<CurrentRecords>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CurrentRecords {
    #[serde(default)]
    station: Vec<Station>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Station {
    obs_time: Option<ObsTime>,
    geo_info: Option<GeoInfo>,
    weather_element: Option<StationElements>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObsTime {
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GeoInfo {
    town_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StationElements {
    air_temperature: Option<Value>,
    wind_speed: Option<Value>,
}

fn normalize_current(parsed: CurrentResponse) -> Result<CurrentObservation, WeatherError> {
    let station = parsed
        .records
        .ok_or_else(|| WeatherError::missing("records"))?
        .station
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::missing("records.Station[0]"))?;

    let raw_time = station
        .obs_time
        .and_then(|t| t.date_time)
        .ok_or_else(|| WeatherError::missing("ObsTime.DateTime"))?;
    let observation_time = DateTime::parse_from_rfc3339(&raw_time)
        .map_err(|_| WeatherError::invalid("ObsTime.DateTime", &raw_time))?;

    let location_name = station
        .geo_info
        .and_then(|g| g.town_name)
        .ok_or_else(|| WeatherError::missing("GeoInfo.TownName"))?;

    let elements = station
        .weather_element
        .ok_or_else(|| WeatherError::missing("WeatherElement"))?;

    let temperature = number_field(elements.air_temperature, "WeatherElement.AirTemperature")?;
    if temperature <= MISSING_READING {
        return Err(WeatherError::invalid("WeatherElement.AirTemperature", temperature));
    }

    let wind_speed = number_field(elements.wind_speed, "WeatherElement.WindSpeed")?;
    if wind_speed < 0.0 {
        return Err(WeatherError::invalid("WeatherElement.WindSpeed", wind_speed));
    }

    Ok(CurrentObservation {
        observation_time,
        location_name,
        temperature,
        wind_speed,
    })
}

/// Station readings arrive as JSON numbers or numeric strings depending on the dataset.
fn number_field(value: Option<Value>, field: &str) -> Result<f64, WeatherError> {
    match value {
        None | Some(Value::Null) => Err(WeatherError::missing(field)),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| WeatherError::invalid(field, n)),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| WeatherError::invalid(field, s)),
        Some(other) => Err(WeatherError::invalid(field, other)),
    }
}

// Forecast (F-C0032-001)

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    records: Option<ForecastRecords>,
}

#[derive(Debug, Deserialize)]
struct ForecastRecords {
    #[serde(default)]
    location: Vec<ForecastLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastLocation {
    #[serde(default)]
    weather_element: Vec<ForecastElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastElement {
    element_name: String,
    #[serde(default)]
    time: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
struct ForecastPeriod {
    parameter: Option<ForecastParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastParameter {
    parameter_name: Option<String>,
    parameter_value: Option<String>,
}

fn normalize_forecast(parsed: ForecastResponse) -> Result<ForecastSummary, WeatherError> {
    let location = parsed
        .records
        .ok_or_else(|| WeatherError::missing("records"))?
        .location
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::missing("records.location[0]"))?;

    let mut elements = location.weather_element;
    let mut first_period = |name: &str| -> Result<ForecastParameter, WeatherError> {
        let idx = elements
            .iter()
            .position(|e| e.element_name == name)
            .ok_or_else(|| WeatherError::missing(&format!("weatherElement[{name}]")))?;
        elements
            .swap_remove(idx)
            .time
            .into_iter()
            .next()
            .and_then(|t| t.parameter)
            .ok_or_else(|| {
                WeatherError::missing(&format!("weatherElement[{name}].time[0].parameter"))
            })
    };

    let wx = first_period("Wx")?;
    let pop = first_period("PoP")?;
    let ci = first_period("CI")?;

    let description = wx
        .parameter_name
        .ok_or_else(|| WeatherError::missing("Wx.parameterName"))?;
    let raw_code = wx
        .parameter_value
        .ok_or_else(|| WeatherError::missing("Wx.parameterValue"))?;
    let weather_code = raw_code
        .trim()
        .parse()
        .map_err(|_| WeatherError::invalid("Wx.parameterValue", &raw_code))?;

    let raw_pop = pop
        .parameter_name
        .ok_or_else(|| WeatherError::missing("PoP.parameterName"))?;
    let rain_possibility = raw_pop
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| WeatherError::invalid("PoP.parameterName", &raw_pop))?;

    let comfortably = ci
        .parameter_name
        .ok_or_else(|| WeatherError::missing("CI.parameterName"))?;

    Ok(ForecastSummary {
        description,
        weather_code,
        rain_possibility,
        comfortably,
    })
}

// Sunrise/sunset (A-B0062-001)

#[derive(Debug, Deserialize)]
struct SunResponse {
    records: Option<SunRecords>,
}

#[derive(Debug, Deserialize)]
struct SunRecords {
    locations: Option<SunLocations>,
}

#[derive(Debug, Deserialize)]
struct SunLocations {
    #[serde(default)]
    location: Vec<SunLocation>,
}

#[derive(Debug, Deserialize)]
struct SunLocation {
    #[serde(default)]
    time: Vec<SunEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SunEntry {
    date: Option<String>,
    sun_rise_time: Option<String>,
    sun_set_time: Option<String>,
}

fn normalize_sun_times(parsed: SunResponse) -> Result<Vec<SunTimes>, WeatherError> {
    let location = parsed
        .records
        .ok_or_else(|| WeatherError::missing("records"))?
        .locations
        .ok_or_else(|| WeatherError::missing("records.locations"))?
        .location
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::missing("records.locations.location[0]"))?;

    // Only today's row matters to the theme, so a malformed row for another
    // date must not fail the whole table.
    Ok(location
        .time
        .into_iter()
        .filter_map(|entry| match sun_entry(entry) {
            Ok(sun) => Some(sun),
            Err(err) => {
                debug!(error = %err, "skipping sunrise/sunset row");
                None
            }
        })
        .collect())
}

fn sun_entry(entry: SunEntry) -> Result<SunTimes, WeatherError> {
    let raw_date = entry.date.ok_or_else(|| WeatherError::missing("time[].Date"))?;
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| WeatherError::invalid("time[].Date", &raw_date))?;
    let sunrise = clock_time(entry.sun_rise_time, "time[].SunRiseTime")?;
    let sunset = clock_time(entry.sun_set_time, "time[].SunSetTime")?;
    Ok(SunTimes {
        date,
        sunrise,
        sunset,
    })
}

fn clock_time(raw: Option<String>, field: &str) -> Result<NaiveTime, WeatherError> {
    let raw = raw.ok_or_else(|| WeatherError::missing(field))?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map_err(|_| WeatherError::invalid(field, &raw))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
