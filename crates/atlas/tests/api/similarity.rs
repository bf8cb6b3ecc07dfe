use std::collections::BTreeMap;
use std::sync::Arc;

use atlas::db::Error;
use atlas::{Atlas, MatchOutcome, Region, SimilarityMatch};

use crate::helpers::{full_schema, stats, MockClimateDb, TestStore};

fn expect_match(outcome: MatchOutcome) -> SimilarityMatch {
    match outcome {
        MatchOutcome::Match(matched) => matched,
        other => panic!("expected a match, got {:?}", other),
    }
}

#[tokio::test]
async fn finds_the_closest_analogue_across_regions() {
    let setup = format!(
        "{}
        INSERT INTO VIC VALUES
            ('A', DATE '2020-01-01', 19.0, 0.0),
            ('A', DATE '2020-01-02', 21.0, 0.0),
            ('B', DATE '2020-01-01', 21.5, 0.0);
        INSERT INTO NSW VALUES ('C', DATE '2020-01-01', 20.2, 0.0);
        ",
        full_schema()
    );
    let store = TestStore::seed("similar-cross-region", &setup);

    let matched = expect_match(store.atlas().find_similar("A").await.unwrap());

    // B is 1.5 degrees away in the same region; C wins at 0.2 from NSW.
    assert_eq!(matched.station_id, "C");
    assert_eq!(matched.region, Region::Nsw);
    assert_eq!(matched.avg_max_temp, 20.2);
    assert_eq!(matched.difference, 0.2);

    assert_eq!(matched.target.station_id, "A");
    assert_eq!(matched.target.region, Region::Vic);
    assert_eq!(matched.target.display_name, "Station A");
}

#[tokio::test]
async fn exact_id_resolution_beats_name_substring() {
    let setup = format!(
        "{}
        INSERT INTO weather_station VALUES ('040913', 'melbourne'), ('066062', 'station 040913 annex');
        INSERT INTO QLD VALUES ('040913', DATE '2020-01-01', 26.0, 0.0);
        INSERT INTO NSW VALUES ('066062', DATE '2020-01-01', 22.0, 0.0);
        ",
        full_schema()
    );
    let store = TestStore::seed("similar-exact-id", &setup);

    let matched = expect_match(store.atlas().find_similar("040913").await.unwrap());
    assert_eq!(matched.target.station_id, "040913");
    assert_eq!(matched.target.display_name, "Melbourne");
}

#[tokio::test]
async fn name_substring_resolution_is_case_insensitive() {
    let setup = format!(
        "{}
        INSERT INTO weather_station VALUES ('040913', 'melbourne');
        INSERT INTO VIC VALUES ('040913', DATE '2020-01-01', 20.0, 0.0);
        INSERT INTO NSW VALUES ('066062', DATE '2020-01-01', 22.0, 0.0);
        ",
        full_schema()
    );
    let store = TestStore::seed("similar-substring", &setup);

    let matched = expect_match(store.atlas().find_similar("MELB").await.unwrap());
    assert_eq!(matched.target.station_id, "040913");
    assert_eq!(matched.station_id, "066062");
}

#[tokio::test]
async fn the_first_region_with_data_is_authoritative() {
    // X has data in both VIC and QLD; VIC comes first in the region
    // enumeration, so the QLD average never enters the comparison.
    let setup = format!(
        "{}
        INSERT INTO VIC VALUES ('X', DATE '2020-01-01', 20.0, 0.0);
        INSERT INTO QLD VALUES ('X', DATE '2020-01-01', 30.0, 0.0);
        INSERT INTO NSW VALUES ('Y', DATE '2020-01-01', 29.0, 0.0);
        ",
        full_schema()
    );
    let store = TestStore::seed("similar-first-region", &setup);

    let matched = expect_match(store.atlas().find_similar("X").await.unwrap());
    assert_eq!(matched.target.region, Region::Vic);
    assert_eq!(matched.station_id, "Y");
    assert_eq!(matched.difference, 9.0);
}

#[tokio::test]
async fn candidates_sharing_the_target_id_are_excluded_everywhere() {
    let setup = format!(
        "{}
        INSERT INTO VIC VALUES ('X', DATE '2020-01-01', 20.0, 0.0);
        INSERT INTO NSW VALUES ('X', DATE '2020-01-01', 20.1, 0.0);
        INSERT INTO QLD VALUES ('Y', DATE '2020-01-01', 26.0, 0.0);
        ",
        full_schema()
    );
    let store = TestStore::seed("similar-self-exclusion", &setup);

    let matched = expect_match(store.atlas().find_similar("X").await.unwrap());
    assert_eq!(matched.station_id, "Y");
    assert_eq!(matched.difference, 6.0);
}

#[tokio::test]
async fn a_lone_station_has_no_comparables() {
    let setup = format!(
        "{}
        INSERT INTO TAS VALUES ('94029', DATE '2020-01-01', 14.0, 0.0);
        ",
        full_schema()
    );
    let store = TestStore::seed("similar-lone-station", &setup);

    let outcome = store.atlas().find_similar("94029").await.unwrap();
    match outcome {
        MatchOutcome::NoComparableStations { target } => {
            assert_eq!(target.station_id, "94029");
            assert_eq!(target.region, Region::Tas);
        }
        other => panic!("expected no comparables, got {:?}", other),
    }
}

#[tokio::test]
async fn unresolvable_queries_return_not_found_with_examples() {
    let setup = format!(
        "{}
        INSERT INTO weather_station VALUES
            ('040913', 'melbourne'),
            ('066062', 'sydney observatory'),
            ('086038', 'essendon airport'),
            ('094029', 'hobart'),
            ('109521', 'perth metro');
        ",
        full_schema()
    );
    let store = TestStore::seed("similar-not-found", &setup);

    let outcome = store.atlas().find_similar("atlantis").await.unwrap();
    match outcome {
        MatchOutcome::NotFound { query, suggestions } => {
            assert_eq!(query, "atlantis");
            assert_eq!(suggestions.len(), 3);
            assert_eq!(suggestions[0].station_id, "040913");
            assert_eq!(suggestions[0].display_name, "Melbourne");
        }
        other => panic!("expected not found, got {:?}", other),
    }
}

#[tokio::test]
async fn whitespace_only_queries_are_rejected() {
    let store = TestStore::seed("similar-empty-query", &full_schema());
    let outcome = store.atlas().find_similar("   ").await;
    assert!(matches!(outcome, Err(atlas::Error::EmptyQuery)));
}

#[tokio::test]
async fn probe_errors_skip_to_the_next_region() {
    let mut db = MockClimateDb::new();
    db.expect_station_directory()
        .returning(|| Ok(BTreeMap::new()));
    db.expect_region_avg_max_temp()
        .returning(|region, station_id| match (region, station_id) {
            (Region::Vic, _) => Err(Error::Unavailable("simulated outage".into())),
            (Region::Nsw, "X") => Ok(Some(20.0)),
            _ => Ok(None),
        });
    db.expect_region_summary().returning(|region| match region {
        Region::Nsw => Ok(vec![stats("X", 20.0), stats("Z", 24.0)]),
        _ => Ok(vec![]),
    });

    let atlas = Atlas::new(Arc::new(db));
    let matched = expect_match(atlas.find_similar("X").await.unwrap());
    assert_eq!(matched.target.region, Region::Nsw);
    assert_eq!(matched.station_id, "Z");
    assert_eq!(matched.difference, 4.0);
}
