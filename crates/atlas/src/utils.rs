use std::env;

use clap::{Parser, Subcommand};
use climate_atlas_core::{
    find_config_file, load_config, ConfigSource, CONFIG_FILENAME, DEFAULT_CLIMATE_DB,
};
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use time::{format_description::well_known::Iso8601, OffsetDateTime};

use crate::{Region, SummaryMetric};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Climate Atlas - historical climate statistics for Australian weather stations"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $ATLAS_CONFIG, ./atlas.toml,
    /// $XDG_CONFIG_HOME/climate-atlas/atlas.toml, /etc/climate-atlas/atlas.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "ATLAS_LEVEL")]
    pub level: Option<String>,

    /// Path to the read-only climate database
    #[arg(short, long, env = "ATLAS_CLIMATE_DB")]
    #[serde(alias = "climate_db")]
    pub database: Option<String>,

    #[command(subcommand)]
    #[serde(skip)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Print the station directory (id to display name)
    Stations,
    /// Per-station climate summary across all regions
    Summary,
    /// Daily maximum temperature history for one station
    History {
        /// Raw station id
        station: String,
        /// Region code (VIC, NSW, QLD, WA, SA, TAS, NT)
        region: Region,
    },
    /// Find the closest climate analogue to a station
    Similar {
        /// Station id or (part of) a station name
        query: String,
    },
    /// Top stations ranked by a summary metric
    Top {
        /// Metric: rain, rain_days, temp or highest_temp
        #[arg(short, long, default_value = "rain")]
        metric: SummaryMetric,
        /// Number of stations to keep
        #[arg(short, long, default_value_t = 10)]
        count: usize,
    },
    /// Dump raw daily records (capped per region) with display names
    Export {
        /// Include the temperature column
        #[arg(long)]
        temperature: bool,
        /// Include the precipitation column
        #[arg(long)]
        precipitation: bool,
        /// Write JSON lines to this file instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },
}

impl Cli {
    pub fn database(&self) -> String {
        self.database
            .clone()
            .unwrap_or_else(|| DEFAULT_CLIMATE_DB.to_string())
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("ATLAS_CONFIG", CONFIG_FILENAME)
    };

    if let Some(path) = source.path() {
        log::info!("Loading config from: {}", path.display());
    }

    let file_config: Cli = load_config(&source).unwrap_or_default();

    // CLI args override file config (env vars are handled by clap)
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        database: cli_args.database.or(file_config.database),
        command: cli_args.command,
    }
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}: {}",
                OffsetDateTime::now_utc().format(&Iso8601::DEFAULT).unwrap(),
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}

/// Capitalizes the first letter of every word and lowercases the rest,
/// the way the directory names are presented everywhere.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
