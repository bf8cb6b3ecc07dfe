use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use atlas::db::{ClimateAccess, ExportColumns, ExportRecord};
use atlas::{get_config_info, get_log_level, setup_logger, Atlas, Command};
use climate_atlas_core::{create_dir_all, path_exists};
use log::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = get_config_info();
    let log_level = get_log_level(&cli);

    setup_logger()
        .level(log_level)
        .level_for("atlas", log_level)
        .apply()?;

    let Some(command) = cli.command.clone() else {
        anyhow::bail!("no subcommand given, see --help for the available reports");
    };

    let db_path = cli.database();
    if !path_exists(&db_path) {
        warn!("climate database {} does not exist; all reports will be empty", db_path);
    }
    let atlas = Atlas::new(Arc::new(ClimateAccess::new(db_path)));

    match command {
        Command::Stations => {
            let names = atlas.station_names().await;
            info!("{} stations in the directory", names.len());
            print_json(&names)?;
        }
        Command::Summary => {
            let summary = atlas.station_summary().await;
            info!("{} station summaries across all regions", summary.len());
            print_json(&summary)?;
        }
        Command::History { station, region } => {
            let points = atlas.station_history(&station, region).await;
            info!("{} history points for {} in {}", points.len(), station, region);
            print_json(&points)?;
        }
        Command::Similar { query } => {
            let outcome = atlas.find_similar(&query).await?;
            print_json(&outcome)?;
        }
        Command::Top { metric, count } => {
            let top = atlas.top_stations(metric, count).await;
            print_json(&top)?;
        }
        Command::Export {
            temperature,
            precipitation,
            out,
        } => {
            let columns = ExportColumns {
                temperature,
                precipitation,
            };
            let records = atlas.export_records(columns).await;
            info!("{} records exported", records.len());
            write_export(&records, out.as_deref())?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One JSON object per line; turning these into a CSV or spreadsheet is
/// left to whatever consumes the file.
fn write_export(records: &[ExportRecord], out: Option<&str>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    create_dir_all(&parent.to_string_lossy())
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
            }
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path))?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
            info!("wrote {} records to {}", records.len(), path);
        }
        None => {
            for record in records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
    }
    Ok(())
}
