use std::io::IsTerminal;

use anyhow::Context;
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use weathercard_core::{Config, CwaClient, ThemeMode, WeatherAggregator, WeatherKind, classify};

use crate::card;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathercard", version, about = "Weather card for a CWA location")]
pub struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, station and location interactively.
    Configure,

    /// Fetch once and print the card.
    Show {
        /// Print the state as JSON instead of the card.
        #[arg(long)]
        json: bool,
    },

    /// Keep the card open; press Enter to refresh, `q` to quit.
    Watch,

    /// Show the category and icons for a weather code, or the whole table.
    Classify {
        /// Numeric CWA weather code, e.g. 8. Omit to list every category.
        code: Option<u16>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { json } => show(json).await,
            Command::Watch => watch().await,
            Command::Classify { code: Some(code) } => {
                print_classification(code);
                Ok(())
            }
            Command::Classify { code: None } => {
                print_table();
                Ok(())
            }
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    config.apply_env();
    Ok(config)
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("CWA API key (leave empty to keep the current one):")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    if !key.trim().is_empty() {
        config.api_key = Some(key.trim().to_string());
    }

    let station = Text::new("Observation station id:")
        .with_default(&config.station_id)
        .prompt()?;
    config.station_id = station;

    let location = Text::new("Forecast location name:")
        .with_default(&config.location_name)
        .prompt()?;
    config.location_name = location;

    let sun = Text::new("Sunrise/sunset county:")
        .with_default(config.sun_location())
        .prompt()?;
    config.sun_location = (sun != config.location_name).then_some(sun);

    config.save()?;
    println!(
        "Configuration saved to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

async fn start_aggregator() -> anyhow::Result<WeatherAggregator<CwaClient>> {
    let config = load_config()?;
    let client = config.client()?;
    debug!(station = %config.station_id, location = %config.location_name, "starting");
    Ok(WeatherAggregator::start(client).await)
}

fn print_card(aggregator: &WeatherAggregator<CwaClient>) {
    let state = aggregator.state();
    let error = aggregator.last_error();
    println!(
        "{}\n",
        card::render(
            &state,
            aggregator.theme(),
            error.as_deref(),
            std::io::stdout().is_terminal()
        )
    );
}

async fn show(json: bool) -> anyhow::Result<()> {
    let aggregator = start_aggregator().await?;

    if json {
        let out = serde_json::json!({
            "theme": aggregator.theme(),
            "state": aggregator.state(),
            "error": aggregator.last_error(),
            "fetched_at": Local::now().to_rfc3339(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialize weather state")?
        );
    } else {
        print_card(&aggregator);
    }

    Ok(())
}

async fn watch() -> anyhow::Result<()> {
    let aggregator = start_aggregator().await?;
    print_card(&aggregator);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if matches!(line.trim(), "q" | "quit") {
            break;
        }

        let mut rx = aggregator.subscribe_state();

        // Show the loading card as soon as the refresh raises the flag.
        let (result, ()) = tokio::join!(aggregator.refresh(), async {
            if rx.changed().await.is_ok() {
                print_card(&aggregator);
            }
        });
        if let Err(err) = result {
            debug!(error = %err, network = err.is_network(), "manual refresh failed");
        }

        print_card(&aggregator);
    }

    Ok(())
}

fn print_classification(code: u16) {
    match classify(code) {
        Some(kind) => print_kind(code, kind),
        None => println!("{code}: no category (rendered as cloudy)"),
    }
}

fn print_table() {
    for kind in WeatherKind::all() {
        let codes: Vec<String> = kind.codes().iter().map(u16::to_string).collect();
        println!("{kind:<26} {}", codes.join(" "));
    }
}

fn print_kind(code: u16, kind: WeatherKind) {
    println!(
        "{code}: {kind} (icons: {}, {})",
        kind.icon_name(ThemeMode::Day),
        kind.icon_name(ThemeMode::Night)
    );
}
