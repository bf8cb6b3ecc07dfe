use std::collections::BTreeMap;
use std::sync::Arc;

use log::{error, warn};

use crate::db::{ClimateData, ExportColumns, ExportRecord, HistoryPoint, RegionStationStats};
use crate::matcher::{self, MatchOutcome, ResolvedTarget};
use crate::summary::{assemble_summary, rank_by_metric, StationSummary, SummaryMetric};
use crate::{title_case, Region};

/// Facade over the climate store. Every operation recomputes from the
/// store and contains data-access failures locally, so a broken or
/// missing region degrades that region's contribution instead of the
/// whole request.
pub struct Atlas {
    db: Arc<dyn ClimateData>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("query text must not be empty")]
    EmptyQuery,
}

impl Atlas {
    pub fn new(db: Arc<dyn ClimateData>) -> Self {
        Self { db }
    }

    /// Best-effort directory of display names keyed by station id. A
    /// directory failure yields an empty map, never an error; callers
    /// fall back to raw ids.
    pub async fn station_names(&self) -> BTreeMap<String, String> {
        match self.db.station_directory().await {
            Ok(names) => names,
            Err(e) => {
                warn!("station directory unavailable, falling back to raw ids: {}", e);
                BTreeMap::new()
            }
        }
    }

    /// One summary row per (region, station) across every region that
    /// currently has usable data. All regions failing or empty is a
    /// legitimate empty result.
    pub async fn station_summary(&self) -> Vec<StationSummary> {
        let per_region = self.collect_region_stats().await;
        let names = self.station_names().await;
        assemble_summary(per_region, &names)
    }

    async fn collect_region_stats(&self) -> Vec<(Region, Vec<RegionStationStats>)> {
        let mut per_region = Vec::new();
        for region in Region::ALL {
            match self.db.region_summary(region).await {
                Ok(stats) if stats.is_empty() => {}
                Ok(stats) => per_region.push((region, stats)),
                Err(e) => error!("error loading table {}: {}", region, e),
            }
        }
        per_region
    }

    /// Up to 50 daily maxima for one station, oldest first.
    pub async fn station_history(&self, station_id: &str, region: Region) -> Vec<HistoryPoint> {
        match self.db.region_history(region, station_id).await {
            Ok(mut points) => {
                points.sort_by(|a, b| a.date.cmp(&b.date));
                points
            }
            Err(e) => {
                error!("error loading history for {} in {}: {}", station_id, region, e);
                Vec::new()
            }
        }
    }

    /// Resolves the query to a station and finds its closest climate
    /// analogue by mean daily maximum. Only structurally empty input is
    /// an error; everything else is a structured outcome.
    pub async fn find_similar(&self, query: &str) -> Result<MatchOutcome, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let names = self.station_names().await;
        let candidate = matcher::resolve_candidate(query, &names);

        let Some(target) = self.probe_regions(&candidate, &names).await else {
            return Ok(MatchOutcome::NotFound {
                query: query.to_owned(),
                suggestions: matcher::suggestions(&names),
            });
        };

        let summaries = self.station_summary().await;
        match matcher::closest_match(&target, &summaries) {
            Some(matched) => Ok(MatchOutcome::Match(matched)),
            None => Ok(MatchOutcome::NoComparableStations { target }),
        }
    }

    /// The first region in enumeration order holding usable data for the
    /// candidate id is authoritative; later regions are not consulted.
    async fn probe_regions(
        &self,
        candidate: &str,
        names: &BTreeMap<String, String>,
    ) -> Option<ResolvedTarget> {
        for region in Region::ALL {
            match self.db.region_avg_max_temp(region, candidate).await {
                Ok(Some(avg_max_temp)) => {
                    return Some(ResolvedTarget {
                        station_id: candidate.to_owned(),
                        region,
                        display_name: matcher::target_display_name(candidate, names),
                        avg_max_temp,
                    });
                }
                Ok(None) => {}
                Err(e) => error!("error searching {}: {}", region, e),
            }
        }
        None
    }

    /// Raw daily records across all regions, capped per region, with
    /// directory names joined in. Intended for download-style consumers;
    /// how the rows are serialized to a file is their concern.
    pub async fn export_records(&self, columns: ExportColumns) -> Vec<ExportRecord> {
        let mut records = Vec::new();
        for region in Region::ALL {
            match self.db.region_records(region, columns).await {
                Ok(rows) => records.extend(rows),
                Err(e) => error!("error exporting table {}: {}", region, e),
            }
        }
        for record in &mut records {
            if let Some(name) = record.display_name.take() {
                record.display_name = Some(title_case(&name));
            }
        }
        records
    }

    /// The `count` stations ranking highest in `metric`, ascending, the
    /// global maximum last.
    pub async fn top_stations(&self, metric: SummaryMetric, count: usize) -> Vec<StationSummary> {
        rank_by_metric(self.station_summary().await, metric, count)
    }
}
