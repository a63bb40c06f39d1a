//! CWA weather-code categories used to pick the card icon.

use serde::{Deserialize, Serialize};

use crate::model::ThemeMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherKind {
    Clear,
    Cloudy,
    CloudyFog,
    Fog,
    PartiallyClearWithRain,
    Snowing,
    Thunderstorm,
}

const WEATHER_TYPES: &[(WeatherKind, &[u16])] = &[
    (
        WeatherKind::Thunderstorm,
        &[15, 16, 17, 18, 21, 22, 33, 34, 35, 36, 41],
    ),
    (WeatherKind::Clear, &[1]),
    (WeatherKind::CloudyFog, &[25, 26, 27, 28]),
    (WeatherKind::Cloudy, &[2, 3, 4, 5, 6, 7]),
    (WeatherKind::Fog, &[24]),
    (
        WeatherKind::PartiallyClearWithRain,
        &[8, 9, 10, 11, 12, 13, 14, 19, 20, 29, 30, 31, 32, 38, 39],
    ),
    (WeatherKind::Snowing, &[23, 37, 42]),
];

/// Category for a weather code, or `None` when the code is not in the table.
pub fn classify(code: u16) -> Option<WeatherKind> {
    WEATHER_TYPES
        .iter()
        .find(|(_, codes)| codes.contains(&code))
        .map(|(kind, _)| *kind)
}

#[cfg(test)]
fn known_codes() -> impl Iterator<Item = u16> {
    WEATHER_TYPES.iter().flat_map(|(_, codes)| codes.iter().copied())
}

impl WeatherKind {
    /// Codes that fall into this category.
    pub fn codes(&self) -> &'static [u16] {
        WEATHER_TYPES
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, codes)| *codes)
            .unwrap_or(&[])
    }

    pub fn slug(&self) -> &'static str {
        match self {
            WeatherKind::Clear => "clear",
            WeatherKind::Cloudy => "cloudy",
            WeatherKind::CloudyFog => "cloudy-fog",
            WeatherKind::Fog => "fog",
            WeatherKind::PartiallyClearWithRain => "partially-clear-with-rain",
            WeatherKind::Snowing => "snowing",
            WeatherKind::Thunderstorm => "thunderstorm",
        }
    }

    /// Icon asset name for this category under the given theme, e.g. `night-fog`.
    pub fn icon_name(&self, theme: ThemeMode) -> String {
        format!("{}-{}", theme.as_str(), self.slug())
    }

    pub const fn all() -> &'static [WeatherKind] {
        &[
            WeatherKind::Clear,
            WeatherKind::Cloudy,
            WeatherKind::CloudyFog,
            WeatherKind::Fog,
            WeatherKind::PartiallyClearWithRain,
            WeatherKind::Snowing,
            WeatherKind::Thunderstorm,
        ]
    }
}

impl std::fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.slug())
    }
}
