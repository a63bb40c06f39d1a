//! Day/night decision from a sunrise/sunset table.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    error::WeatherError,
    model::{SunTimes, ThemeMode},
};

/// Date key used by the sunrise/sunset dataset, e.g. `2024-05-03`.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// True when `now` lies between sunrise and sunset of the record's date, both ends included.
pub fn is_daytime(sun: &SunTimes, now: NaiveDateTime) -> bool {
    let sunrise = sun.date.and_time(sun.sunrise);
    let sunset = sun.date.and_time(sun.sunset);
    sunrise <= now && now <= sunset
}

/// Picks today's record out of `records` and derives the theme for `now`.
pub fn theme_for(
    records: &[SunTimes],
    now: NaiveDateTime,
    location: &str,
) -> Result<ThemeMode, WeatherError> {
    let today = now.date();
    let sun = records
        .iter()
        .find(|r| r.date == today)
        .ok_or_else(|| WeatherError::DataUnavailable {
            location: location.to_string(),
            date: date_key(today),
        })?;

    Ok(if is_daytime(sun, now) {
        ThemeMode::Day
    } else {
        ThemeMode::Night
    })
}
