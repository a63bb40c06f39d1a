use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::WeatherError,
    model::{CurrentObservation, ForecastSummary, SunTimes},
};

pub mod cwa;

/// Upstream feeds the aggregator combines.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_current(&self) -> Result<CurrentObservation, WeatherError>;

    async fn fetch_forecast(&self) -> Result<ForecastSummary, WeatherError>;

    /// Sunrise/sunset table, one entry per date.
    async fn fetch_sun_times(&self) -> Result<Vec<SunTimes>, WeatherError>;

    /// Location the sunrise/sunset table is requested for.
    fn location_name(&self) -> &str;
}
