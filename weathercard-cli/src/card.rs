//! Plain-text rendering of the weather card.

use crossterm::style::{Color, Stylize};
use weathercard_core::{ThemeMode, WeatherKind, WeatherState};

const WIDTH: usize = 40;

/// Colours of the day and night card themes.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub title: Color,
    pub temperature: Color,
    pub text: Color,
    pub refresh: Color,
}

impl Palette {
    pub fn for_theme(theme: ThemeMode) -> Self {
        let refresh = rgb(0xfc, 0xd1, 0x2a);
        match theme {
            ThemeMode::Day => Self {
                title: rgb(0x21, 0x21, 0x21),
                temperature: rgb(0x75, 0x75, 0x75),
                text: rgb(0x82, 0x82, 0x82),
                refresh,
            },
            ThemeMode::Night => Self {
                title: rgb(0xf9, 0xf9, 0xfa),
                temperature: rgb(0xdd, 0xdd, 0xdd),
                text: rgb(0xcc, 0xcc, 0xcc),
                refresh,
            },
        }
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

/// Icon for the state's weather code; codes outside the table fall back to cloudy.
pub fn icon_for(state: &WeatherState, theme: ThemeMode) -> String {
    state
        .weather_kind()
        .unwrap_or(WeatherKind::Cloudy)
        .icon_name(theme)
}

pub fn render(
    state: &WeatherState,
    theme: ThemeMode,
    error: Option<&str>,
    colored: bool,
) -> String {
    let palette = Palette::for_theme(theme);
    let paint = |text: String, color: Color| -> String {
        if colored {
            text.with(color).to_string()
        } else {
            text
        }
    };

    let location = if state.location_name.is_empty() {
        "--".to_string()
    } else {
        state.location_name.clone()
    };

    let status = if state.is_loading {
        "refreshing...".to_string()
    } else {
        "[Enter] refresh".to_string()
    };
    let footer = format!(
        "Last observed {}  {}",
        state.observation_time.format("%H:%M"),
        status
    );

    let mut lines = vec![
        paint(location, palette.title),
        paint(
            format!("{} {}", state.description, state.comfortably)
                .trim()
                .to_string(),
            palette.text,
        ),
        String::new(),
        format!(
            "{}   [{}]",
            paint(format!("{} °C", state.display_temperature()), palette.temperature),
            icon_for(state, theme)
        ),
        String::new(),
        paint(format!("Wind  {} m/s", state.wind_speed), palette.text),
        paint(format!("Rain  {}%", state.rain_possibility), palette.text),
        String::new(),
        paint(format!("{footer:>WIDTH$}"), palette.refresh),
    ];

    if let Some(message) = error {
        lines.push(paint(format!("! {message}"), palette.text));
    }

    lines.join("\n")
}
