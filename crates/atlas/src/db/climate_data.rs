use std::collections::BTreeMap;

use async_trait::async_trait;
use duckdb::{
    arrow::array::{Array, Float64Array, Int64Array, RecordBatch, StringArray},
    params_from_iter, AccessMode, Config, Connection,
};
use log::trace;
use regex::Regex;
use scooby::postgres::{select, Aliasable, Orderable, Parameters, Select};
use serde::{Deserialize, Serialize};

use crate::Region;

/// Most recent daily records returned for one station's history.
pub const HISTORY_LIMIT: usize = 50;

/// Per-region row cap on the bulk record export.
pub const EXPORT_REGION_LIMIT: usize = 1000;

/// Read-only access to the climate database. Every query opens a fresh
/// connection, so requests never share state or hold the store open
/// between calls.
pub struct ClimateAccess {
    db_path: String,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query duckdb: {0}")]
    Query(#[from] duckdb::Error),
    #[error("Climate store unavailable: {0}")]
    Unavailable(String),
}

/// The store contract the aggregation, history, matching and export
/// operations are built on. Every method is one query against one table;
/// an `Err` means that table contributed nothing, never that the whole
/// request must fail.
#[async_trait]
pub trait ClimateData: Send + Sync {
    /// Full station directory as id -> display name, ordered by id.
    async fn station_directory(&self) -> Result<BTreeMap<String, String>, Error>;
    /// Per-station statistics for one region, stations with at least one
    /// non-null daily maximum only.
    async fn region_summary(&self, region: Region) -> Result<Vec<RegionStationStats>, Error>;
    /// Most-recent-first daily maxima for one station, capped at
    /// [`HISTORY_LIMIT`] rows.
    async fn region_history(
        &self,
        region: Region,
        station_id: &str,
    ) -> Result<Vec<HistoryPoint>, Error>;
    /// Un-rounded mean daily maximum for one station, `None` when the
    /// station has no usable rows in this region.
    async fn region_avg_max_temp(
        &self,
        region: Region,
        station_id: &str,
    ) -> Result<Option<f64>, Error>;
    /// Raw daily records joined with directory names, capped at
    /// [`EXPORT_REGION_LIMIT`] rows. `columns` controls whether the
    /// temperature and precipitation columns are queried at all.
    async fn region_records(
        &self,
        region: Region,
        columns: ExportColumns,
    ) -> Result<Vec<ExportRecord>, Error>;
}

impl ClimateAccess {
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// Opens a fresh read-only connection; a request can never write to
    /// or lock the store for anyone else.
    pub fn open_connection(&self) -> Result<Connection, duckdb::Error> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        Connection::open_with_flags(&self.db_path, config)
    }

    async fn query(&self, select: Select, params: Vec<String>) -> Result<Vec<RecordBatch>, Error> {
        // scooby renders postgres-style $n placeholders, duckdb wants ?
        let re = Regex::new(r"\$(\d+)").unwrap();
        let rendered = select.to_string();
        let rewritten = re.replace_all(&rendered, "?");
        trace!("query: {}", rewritten);

        let conn = self
            .open_connection()
            .map_err(|e| Error::Unavailable(format!("{}: {}", self.db_path, e)))?;
        let mut stmt = conn.prepare(&rewritten)?;
        let sql_params = params_from_iter(params.iter());
        Ok(stmt.query_arrow(sql_params)?.collect())
    }
}

#[async_trait]
impl ClimateData for ClimateAccess {
    async fn station_directory(&self) -> Result<BTreeMap<String, String>, Error> {
        let query = select(("CAST(site_id AS TEXT)".as_("station_id"), "name"))
            .from("weather_station")
            .order_by("station_id");

        let records = self.query(query, vec![]).await?;
        let mut names = BTreeMap::new();
        for record in &records {
            let station_id_arr = string_column(record, 0);
            let name_arr = string_column(record, 1);
            for row in 0..record.num_rows() {
                if station_id_arr.is_null(row) || name_arr.is_null(row) {
                    continue;
                }
                names.insert(
                    station_id_arr.value(row).to_owned(),
                    name_arr.value(row).to_owned(),
                );
            }
        }
        Ok(names)
    }

    async fn region_summary(&self, region: Region) -> Result<Vec<RegionStationStats>, Error> {
        // Location ids are numeric in some source tables, so grouping and
        // comparison always happen on the TEXT form.
        let query = select((
            "CAST(Location AS TEXT)".as_("station_id"),
            "CAST(AVG(MaxTemp) AS DOUBLE)".as_("avg_max_temp"),
            "CAST(MAX(MaxTemp) AS DOUBLE)".as_("highest_max_temp"),
            "CAST(COALESCE(SUM(Precipitation), 0) AS DOUBLE)".as_("total_rainfall"),
            "CAST(SUM(CASE WHEN Precipitation > 0 THEN 1 ELSE 0 END) AS BIGINT)"
                .as_("rain_day_count"),
        ))
        .from(region.table())
        .where_("MaxTemp IS NOT NULL")
        .where_("Location IS NOT NULL")
        .group_by("Location")
        .order_by("station_id");

        let records = self.query(query, vec![]).await?;
        Ok(records.iter().flat_map(RegionStationStats::from_batch).collect())
    }

    async fn region_history(
        &self,
        region: Region,
        station_id: &str,
    ) -> Result<Vec<HistoryPoint>, Error> {
        let mut placeholders = Parameters::new();
        let query = select((
            "CAST(DMY AS TEXT)".as_("date"),
            "CAST(MaxTemp AS DOUBLE)".as_("max_temp"),
        ))
        .from(region.table())
        .where_(format!("CAST(Location AS TEXT) = {}", placeholders.next()))
        .where_("MaxTemp IS NOT NULL")
        .order_by("date".desc())
        .limit(HISTORY_LIMIT);

        let records = self.query(query, vec![station_id.to_owned()]).await?;
        Ok(records.iter().flat_map(HistoryPoint::from_batch).collect())
    }

    async fn region_avg_max_temp(
        &self,
        region: Region,
        station_id: &str,
    ) -> Result<Option<f64>, Error> {
        let mut placeholders = Parameters::new();
        let query = select("CAST(AVG(MaxTemp) AS DOUBLE)".as_("avg_max_temp"))
            .from(region.table())
            .where_(format!("CAST(Location AS TEXT) = {}", placeholders.next()));

        let records = self.query(query, vec![station_id.to_owned()]).await?;
        for record in &records {
            let avg_arr = float_column(record, 0);
            for row in 0..record.num_rows() {
                if !avg_arr.is_null(row) {
                    return Ok(Some(avg_arr.value(row)));
                }
            }
        }
        Ok(None)
    }

    async fn region_records(
        &self,
        region: Region,
        columns: ExportColumns,
    ) -> Result<Vec<ExportRecord>, Error> {
        // Column list depends on the caller's flags, so this one is plain
        // SQL instead of the builder.
        let mut selected = vec![
            "CAST(t.Location AS TEXT) AS station_id".to_owned(),
            "s.name AS display_name".to_owned(),
            "CAST(t.DMY AS TEXT) AS date".to_owned(),
        ];
        if columns.temperature {
            selected.push("CAST(t.MaxTemp AS DOUBLE) AS max_temp".to_owned());
        }
        if columns.precipitation {
            selected.push("CAST(t.Precipitation AS DOUBLE) AS precipitation".to_owned());
        }
        let query_sql = format!(
            "SELECT {} FROM {} AS t \
             LEFT JOIN weather_station AS s \
             ON CAST(t.Location AS TEXT) = CAST(s.site_id AS TEXT) \
             LIMIT {}",
            selected.join(", "),
            region.table(),
            EXPORT_REGION_LIMIT
        );
        trace!("query: {}", query_sql);

        let conn = self
            .open_connection()
            .map_err(|e| Error::Unavailable(format!("{}: {}", self.db_path, e)))?;
        let mut stmt = conn.prepare(&query_sql)?;
        let records: Vec<RecordBatch> = stmt.query_arrow([])?.collect();

        Ok(records
            .iter()
            .flat_map(|record| ExportRecord::from_batch(record, region, columns))
            .collect())
    }
}

/// Grouped statistics for one station in one region's table, straight
/// from the store and not yet rounded or named.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionStationStats {
    pub station_id: String,
    pub avg_max_temp: f64,
    pub highest_max_temp: f64,
    pub total_rainfall: f64,
    pub rain_day_count: i64,
}

impl RegionStationStats {
    fn from_batch(record: &RecordBatch) -> Vec<Self> {
        let station_id_arr = string_column(record, 0);
        let avg_arr = float_column(record, 1);
        let highest_arr = float_column(record, 2);
        let rainfall_arr = float_column(record, 3);
        let rain_days_arr = int_column(record, 4);

        let mut rows = Vec::with_capacity(record.num_rows());
        for row in 0..record.num_rows() {
            if station_id_arr.is_null(row) || avg_arr.is_null(row) {
                continue;
            }
            rows.push(RegionStationStats {
                station_id: station_id_arr.value(row).to_owned(),
                avg_max_temp: avg_arr.value(row),
                highest_max_temp: highest_arr.value(row),
                total_rainfall: rainfall_arr.value(row),
                rain_day_count: rain_days_arr.value(row),
            });
        }
        rows
    }
}

/// One daily maximum in a station's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    pub max_temp: f64,
}

impl HistoryPoint {
    fn from_batch(record: &RecordBatch) -> Vec<Self> {
        let date_arr = string_column(record, 0);
        let max_temp_arr = float_column(record, 1);

        let mut rows = Vec::with_capacity(record.num_rows());
        for row in 0..record.num_rows() {
            if date_arr.is_null(row) || max_temp_arr.is_null(row) {
                continue;
            }
            rows.push(HistoryPoint {
                date: date_arr.value(row).to_owned(),
                max_temp: max_temp_arr.value(row),
            });
        }
        rows
    }
}

/// Column selection flags for the bulk export query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumns {
    pub temperature: bool,
    pub precipitation: bool,
}

/// One raw daily record of the bulk export. Deselected columns stay
/// `None` on every row; a selected column is `None` only where the store
/// holds a null.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub station_id: String,
    pub display_name: Option<String>,
    pub date: String,
    pub region: Region,
    pub max_temp: Option<f64>,
    pub precipitation: Option<f64>,
}

impl ExportRecord {
    fn from_batch(record: &RecordBatch, region: Region, columns: ExportColumns) -> Vec<Self> {
        let station_id_arr = string_column(record, 0);
        let name_arr = string_column(record, 1);
        let date_arr = string_column(record, 2);

        let mut index = 3;
        let max_temp_arr = if columns.temperature {
            let arr = float_column(record, index);
            index += 1;
            Some(arr)
        } else {
            None
        };
        let precipitation_arr = if columns.precipitation {
            Some(float_column(record, index))
        } else {
            None
        };

        let mut rows = Vec::with_capacity(record.num_rows());
        for row in 0..record.num_rows() {
            if station_id_arr.is_null(row) || date_arr.is_null(row) {
                continue;
            }
            rows.push(ExportRecord {
                station_id: station_id_arr.value(row).to_owned(),
                display_name: (!name_arr.is_null(row)).then(|| name_arr.value(row).to_owned()),
                date: date_arr.value(row).to_owned(),
                region,
                max_temp: max_temp_arr
                    .and_then(|arr| (!arr.is_null(row)).then(|| arr.value(row))),
                precipitation: precipitation_arr
                    .and_then(|arr| (!arr.is_null(row)).then(|| arr.value(row))),
            });
        }
        rows
    }
}

fn string_column(record: &RecordBatch, index: usize) -> &StringArray {
    record
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap_or_else(|| panic!("expected VARCHAR in column {index}"))
}

fn float_column(record: &RecordBatch, index: usize) -> &Float64Array {
    record
        .column(index)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap_or_else(|| panic!("expected DOUBLE in column {index}"))
}

fn int_column(record: &RecordBatch, index: usize) -> &Int64Array {
    record
        .column(index)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap_or_else(|| panic!("expected BIGINT in column {index}"))
}
