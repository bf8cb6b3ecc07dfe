use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::db::RegionStationStats;
use crate::{title_case, Region};

/// Every station the store knows about counts as active; there is no
/// decommissioning signal in the data.
pub const STATUS_ACTIVE: &str = "Active";

/// One row of the cross-region station summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationSummary {
    pub station_id: String,
    pub region: Region,
    pub avg_max_temp: f64,
    pub highest_max_temp: f64,
    pub total_rainfall: f64,
    pub rain_day_count: i64,
    pub status: &'static str,
    pub display_name: String,
}

/// Builds the cross-region summary out of per-region statistics and the
/// directory names. Pure, so the rounding, naming and fallback rules are
/// testable without a store.
pub fn assemble_summary(
    per_region: Vec<(Region, Vec<RegionStationStats>)>,
    names: &BTreeMap<String, String>,
) -> Vec<StationSummary> {
    let mut summaries = Vec::new();
    for (region, stats) in per_region {
        for row in stats {
            let display_name = names
                .get(&row.station_id)
                .cloned()
                .unwrap_or_else(|| row.station_id.clone());
            summaries.push(StationSummary {
                display_name: title_case(&display_name).trim().to_owned(),
                station_id: row.station_id,
                region,
                avg_max_temp: round1(row.avg_max_temp),
                highest_max_temp: row.highest_max_temp,
                total_rainfall: row.total_rainfall,
                rain_day_count: row.rain_day_count,
                status: STATUS_ACTIVE,
            });
        }
    }
    summaries
}

/// Presentation precision for temperatures and differences.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Summary metrics the stations can be ranked by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryMetric {
    AvgMaxTemp,
    HighestMaxTemp,
    TotalRainfall,
    RainDays,
}

impl SummaryMetric {
    fn key(&self, summary: &StationSummary) -> f64 {
        match self {
            SummaryMetric::AvgMaxTemp => summary.avg_max_temp,
            SummaryMetric::HighestMaxTemp => summary.highest_max_temp,
            SummaryMetric::TotalRainfall => summary.total_rainfall,
            SummaryMetric::RainDays => summary.rain_day_count as f64,
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown summary metric: {0} (expected rain, rain_days, temp or highest_temp)")]
pub struct ParseMetricError(String);

impl FromStr for SummaryMetric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rain" => Ok(SummaryMetric::TotalRainfall),
            "rain_days" => Ok(SummaryMetric::RainDays),
            "temp" => Ok(SummaryMetric::AvgMaxTemp),
            "highest_temp" => Ok(SummaryMetric::HighestMaxTemp),
            other => Err(ParseMetricError(other.to_owned())),
        }
    }
}

/// Keeps the `count` stations ranking highest in `metric`, still in
/// ascending order, the global maximum last.
pub fn rank_by_metric(
    mut summaries: Vec<StationSummary>,
    metric: SummaryMetric,
    count: usize,
) -> Vec<StationSummary> {
    summaries.sort_by(|a, b| metric.key(a).total_cmp(&metric.key(b)));
    let keep_from = summaries.len().saturating_sub(count);
    summaries.split_off(keep_from)
}
