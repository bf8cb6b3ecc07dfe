use std::collections::BTreeMap;

use serde::Serialize;

use crate::summary::round1;
use crate::{title_case, Region, StationSummary};

/// How many example stations to offer when a query resolves nowhere.
const SUGGESTION_LIMIT: usize = 3;

/// The station a similarity query resolved to, with its un-rounded mean
/// daily maximum from the first region that had usable data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedTarget {
    pub station_id: String,
    pub region: Region,
    pub display_name: String,
    pub avg_max_temp: f64,
}

/// Example (name, id) pair shown when a query cannot be resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationSuggestion {
    pub station_id: String,
    pub display_name: String,
}

/// The closest climate analogue to a resolved target.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub target: ResolvedTarget,
    pub station_id: String,
    pub display_name: String,
    pub region: Region,
    pub avg_max_temp: f64,
    /// |candidate average - target average|, rounded for presentation.
    pub difference: f64,
}

/// Outcome of a similarity lookup. `NotFound` means the query resolved
/// to no station with usable data anywhere; a target with nothing left
/// to compare against is the distinct `NoComparableStations` case.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Match(SimilarityMatch),
    NoComparableStations {
        target: ResolvedTarget,
    },
    NotFound {
        query: String,
        suggestions: Vec<StationSuggestion>,
    },
}

type Resolver = fn(&str, &BTreeMap<String, String>) -> Option<String>;

/// Resolver strategies in priority order; the first to produce a
/// candidate id wins.
const RESOLVERS: [Resolver; 2] = [resolve_exact_id, resolve_name_substring];

/// Turns free-form query text into a candidate station id. Falls back to
/// the text itself, which may be a valid id the directory never listed,
/// so resolution always yields a candidate to probe.
pub fn resolve_candidate(query: &str, names: &BTreeMap<String, String>) -> String {
    RESOLVERS
        .iter()
        .find_map(|resolve| resolve(query, names))
        .unwrap_or_else(|| query.to_owned())
}

fn resolve_exact_id(query: &str, names: &BTreeMap<String, String>) -> Option<String> {
    names.contains_key(query).then(|| query.to_owned())
}

fn resolve_name_substring(query: &str, names: &BTreeMap<String, String>) -> Option<String> {
    let needle = query.to_lowercase();
    names
        .iter()
        .find(|(_, name)| name.to_lowercase().contains(&needle))
        .map(|(station_id, _)| station_id.clone())
}

/// Display name for a resolved candidate, with the generic fallback for
/// ids the directory does not know.
pub fn target_display_name(station_id: &str, names: &BTreeMap<String, String>) -> String {
    let name = names
        .get(station_id)
        .cloned()
        .unwrap_or_else(|| format!("Station {station_id}"));
    title_case(&name)
}

/// Stable minimum scan over the summary: strictly smaller differences
/// win, so the first of any tied pair is kept. Candidates sharing the
/// target's raw id are excluded regardless of region.
pub fn closest_match(target: &ResolvedTarget, summaries: &[StationSummary]) -> Option<SimilarityMatch> {
    let mut best: Option<(f64, &StationSummary)> = None;
    for candidate in summaries {
        if candidate.station_id == target.station_id {
            continue;
        }
        let difference = (candidate.avg_max_temp - target.avg_max_temp).abs();
        match &best {
            Some((best_difference, _)) if *best_difference <= difference => {}
            _ => best = Some((difference, candidate)),
        }
    }
    best.map(|(difference, candidate)| SimilarityMatch {
        target: target.clone(),
        station_id: candidate.station_id.clone(),
        display_name: candidate.display_name.clone(),
        region: candidate.region,
        avg_max_temp: candidate.avg_max_temp,
        difference: round1(difference),
    })
}

/// Up to [`SUGGESTION_LIMIT`] example stations from the front of the
/// directory, for the "not found" guidance.
pub fn suggestions(names: &BTreeMap<String, String>) -> Vec<StationSuggestion> {
    names
        .iter()
        .take(SUGGESTION_LIMIT)
        .map(|(station_id, name)| StationSuggestion {
            station_id: station_id.clone(),
            display_name: title_case(name),
        })
        .collect()
}
