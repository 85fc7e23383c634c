//! Integration tests for airport-index against the sample dataset and
//! synthetic fixtures.
//!
//! The sample dataset in `tests/data/` mixes clean records with the kinds of
//! dirt found in the production file: country names in the code field,
//! zero placeholders, truncated and out-of-range coordinates.

use airport_index::{
    AirportIndex, AirportRecord, IndexConfig, IndexError, KeyConfidence, KeyPolicy, QueryError,
    RawFeature, RejectReason, Repair,
};
use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Arc;

const SAMPLE: &str = "tests/data/airports_sample.geojson";
const REPAIR_CONFIG: &str = "tests/data/airports_repair.yaml";

// ============================================================================
// Helper Functions
// ============================================================================

fn sample_index() -> AirportIndex {
    AirportIndex::from_geojson_path(SAMPLE).expect("Failed to load sample dataset")
}

fn sample_raw_coordinates() -> Vec<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(SAMPLE).expect("Failed to read sample dataset");
    let doc: serde_json::Value = serde_json::from_str(&text).expect("Sample is not JSON");
    doc["features"]
        .as_array()
        .expect("No features array")
        .iter()
        .map(|f| f["geometry"]["coordinates"].as_array().cloned().unwrap_or_default())
        .collect()
}

/// Linear scan ordered the same way the index orders results.
fn brute_force_nearest(index: &AirportIndex, lon: f64, lat: f64, k: usize) -> Vec<(usize, f64)> {
    let mut all: Vec<(f64, &AirportRecord)> = index
        .iter()
        .map(|r| (airport_index::haversine_km(lon, lat, r.longitude, r.latitude), r))
        .collect();
    all.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.iata.cmp(&b.1.iata))
            .then(a.1.source_position.cmp(&b.1.source_position))
    });
    all.into_iter()
        .take(k)
        .map(|(d, r)| (r.source_position, d))
        .collect()
}

fn nearest_positions(index: &AirportIndex, lon: f64, lat: f64, k: usize) -> Vec<(usize, f64)> {
    index
        .find_nearest(lon, lat, k)
        .expect("Valid query failed")
        .into_iter()
        .map(|n| (n.record.source_position, n.distance_km))
        .collect()
}

/// Random records, with extra density near the poles and the antimeridian
/// where grid searches are most likely to miss candidates.
fn random_features(rng: &mut ChaCha8Rng, count: usize) -> Vec<RawFeature> {
    (0..count)
        .map(|i| {
            let (lon, lat) = match i % 4 {
                0 => (rng.gen_range(-180.0..=180.0), rng.gen_range(80.0..=90.0)),
                1 => (rng.gen_range(-180.0..=180.0), rng.gen_range(-90.0..=-80.0)),
                2 => {
                    let lon: f64 = rng.gen_range(175.0..=185.0);
                    (if lon > 180.0 { lon - 360.0 } else { lon }, rng.gen_range(-60.0..=60.0))
                }
                _ => (rng.gen_range(-180.0..=180.0), rng.gen_range(-90.0..=90.0)),
            };
            let code: String = (0..3).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
            RawFeature::point(&code, "Synthetic", "Synthetic City", "Synthetica", lon, lat)
        })
        .collect()
}

// ============================================================================
// Sample Dataset
// ============================================================================

#[test]
fn test_sample_build_diagnostics() {
    let index = sample_index();
    let diagnostics = index.diagnostics();

    assert_eq!(diagnostics.input_count, 17);
    assert_eq!(diagnostics.accepted_count, 15);
    assert_eq!(index.len(), 15);
    assert_eq!(diagnostics.rejected_count(), 2);
    assert_eq!(diagnostics.low_confidence.len(), 3);
    assert_eq!(
        diagnostics.rejection_at(13).unwrap().reason,
        RejectReason::MissingCoordinates { found: 1 }
    );
    assert_eq!(
        diagnostics.rejection_at(14).unwrap().reason,
        RejectReason::LatitudeOutOfRange { latitude: 123.4 }
    );

    // Every input is accounted for
    assert_eq!(
        diagnostics.accepted_count + diagnostics.rejected_count(),
        diagnostics.input_count
    );
}

#[test]
fn test_code_lookup_round_trip() {
    let index = sample_index();
    let raw = sample_raw_coordinates();

    let reliable: Vec<&AirportRecord> = index.iter().filter(|r| r.has_reliable_code()).collect();
    assert_eq!(reliable.len(), 12);

    for record in reliable {
        let found = index.find_by_code(&record.iata.to_lowercase()).expect("Code not found");
        assert_eq!(found.source_position, record.source_position, "{}", record.iata);
        assert_eq!(found.iata, record.iata);
        let coords = &raw[record.source_position];
        assert_eq!(found.longitude, coords[0].as_f64().unwrap());
        assert_eq!(found.latitude, coords[1].as_f64().unwrap());
    }
}

#[test]
fn test_country_name_code_default_policy() {
    // iata "United Kingdom" at [53.47, 0]: kept for spatial queries, not by code
    let index = sample_index();
    assert!(index.find_by_code("United Kingdom").is_none());

    let nearest = index.find_nearest(53.47, 0.0, 1).unwrap();
    let record = nearest[0].record;
    assert_eq!(record.name, "Sumburgh Heliport");
    assert_eq!(record.key_confidence, KeyConfidence::Low);
    assert_eq!((record.longitude, record.latitude), (53.47, 0.0));
    assert_relative_eq!(nearest[0].distance_km, 0.0);
}

#[test]
fn test_country_name_code_zero_placeholder_policy() {
    let config = IndexConfig::from_yaml_path(REPAIR_CONFIG).expect("Failed to load config");
    let index = AirportIndex::from_geojson_path_with_config(SAMPLE, &config).unwrap();
    let diagnostics = index.diagnostics();

    assert_eq!(
        diagnostics.rejection_at(11).unwrap().reason,
        RejectReason::ZeroPlaceholder { longitude: 53.47, latitude: 0.0 }
    );
    assert!(index.iter().all(|r| r.name != "Sumburgh Heliport"));

    // The pole station sits at lon 0 and goes the same way
    assert_eq!(diagnostics.rejection_at(10).unwrap().reason.kind(), "zero_placeholder");
    assert_eq!(diagnostics.rejected_count(), 3);
    assert_eq!(index.len(), 14);
}

#[test]
fn test_repair_config_field_shift_and_swap() {
    let config = IndexConfig::from_yaml_path(REPAIR_CONFIG).unwrap();
    let index = AirportIndex::from_geojson_path_with_config(SAMPLE, &config).unwrap();

    let praia = index.iter().find(|r| r.name == "Praia Intl").unwrap();
    assert_eq!(praia.country, "Cape Verde");
    assert_eq!(praia.city, "Santiago Island");
    assert_eq!(praia.iata, "");

    let swapped = index.find_by_code("XXB").unwrap();
    assert_eq!((swapped.longitude, swapped.latitude), (123.4, 12.0));

    let repairs = &index.diagnostics().repairs;
    assert!(repairs.iter().any(|r| r.position == 12 && matches!(r.repair, Repair::FieldShift { .. })));
    assert!(repairs.iter().any(|r| r.position == 14 && matches!(r.repair, Repair::SwappedCoordinates { .. })));
    assert_eq!(index.cell_size(), (10.0, 10.0));
}

#[test]
fn test_key_policy_reject_drops_low_confidence() {
    let config = IndexConfig {
        key_policy: KeyPolicy::Reject,
        ..IndexConfig::default()
    };
    let index = AirportIndex::from_geojson_path_with_config(SAMPLE, &config).unwrap();
    assert_eq!(index.len(), 12);
    assert!(index.iter().all(|r| r.has_reliable_code()));
    assert_eq!(index.diagnostics().rejections_by_reason().get("malformed_key"), Some(&3));
}

#[test]
fn test_full_globe_bbox_counts_all_records() {
    let index = sample_index();
    let count = index.find_in_bounding_box(-180.0, -90.0, 180.0, 90.0).unwrap().count();
    assert_eq!(count, index.len());
}

#[test]
fn test_antimeridian_bbox() {
    let index = sample_index();
    let codes: HashSet<&str> = index
        .find_in_bounding_box(175.0, -25.0, -175.0, -10.0)
        .unwrap()
        .map(|r| r.iata.as_str())
        .collect();
    assert_eq!(codes, HashSet::from(["SUV", "TBU", "TVU"]));
}

#[test]
fn test_pole_record_reachable() {
    let index = sample_index();
    let nearest = index.find_nearest(120.0, -89.5, 1).unwrap();
    assert_eq!(nearest[0].record.city, "Ice");
    assert!(nearest[0].distance_km < 60.0);
}

#[test]
fn test_diagnostics_serialize() {
    let index = sample_index();
    let json = serde_json::to_value(index.diagnostics()).unwrap();
    assert_eq!(json["rejections"][0]["reason"]["kind"], "missing_coordinates");
    assert_eq!(json["low_confidence"].as_array().unwrap().len(), 3);
}

// ============================================================================
// Synthetic Fixtures
// ============================================================================

#[test]
fn test_antimeridian_nearest_regression() {
    let index = AirportIndex::build(&[
        RawFeature::point("WST", "West of the line", "", "", -179.9, 0.0),
        RawFeature::point("FAR", "Far side", "", "", 170.0, 0.0),
    ]);

    let nearest = index.find_nearest(179.9, 0.0, 2).unwrap();
    assert_eq!(nearest[0].record.iata, "WST");
    assert_relative_eq!(nearest[0].distance_km, 22.239, epsilon = 0.01);
    assert_eq!(nearest[1].record.iata, "FAR");
}

#[test]
fn test_across_pole_nearest() {
    // The closest record is on the opposite meridian, just over the pole
    let index = AirportIndex::build(&[
        RawFeature::point("OPP", "Opposite", "", "", 180.0, 89.9),
        RawFeature::point("SAM", "Same meridian", "", "", 0.0, 85.0),
    ]);
    let nearest = index.find_nearest(0.0, 89.9, 1).unwrap();
    assert_eq!(nearest[0].record.iata, "OPP");
}

#[test]
fn test_empty_index_queries() {
    let index = AirportIndex::build(&[]);
    assert!(index.is_empty());
    assert!(index.find_nearest(0.0, 0.0, 1).unwrap().is_empty());
    assert!(index.find_by_code("LHR").is_none());
    assert_eq!(index.find_in_bounding_box(-180.0, -90.0, 180.0, 90.0).unwrap().count(), 0);
    assert!(index.find_within_radius(0.0, 0.0, 1000.0).unwrap().is_empty());
    assert!(index.autocomplete("L", 5).is_empty());
    assert!(index.diagnostics().is_clean());
}

#[test]
fn test_invalid_query_distinct_from_no_match() {
    let index = AirportIndex::build(&[]);
    assert!(matches!(
        index.find_nearest(f64::NAN, 0.0, 1),
        Err(IndexError::InvalidQuery(QueryError::NonFinite { name: "longitude", .. }))
    ));
    assert!(matches!(
        index.find_nearest(0.0, 0.0, 0),
        Err(IndexError::InvalidQuery(QueryError::ZeroNeighbors))
    ));
    assert!(matches!(
        index.find_in_bounding_box(-181.0, 0.0, 0.0, 1.0),
        Err(IndexError::InvalidQuery(QueryError::LongitudeOutOfRange(_)))
    ));
}

#[test]
fn test_nearest_matches_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x41_49_52);
    let features = random_features(&mut rng, 600);

    for cell_size_deg in [1.0, 5.0, 30.0] {
        let config = IndexConfig {
            cell_size_deg,
            ..IndexConfig::default()
        };
        let index = AirportIndex::build_with_config(&features, &config).unwrap();
        assert_eq!(index.len(), features.len());

        for _ in 0..150 {
            let lon = rng.gen_range(-180.0..=180.0);
            let lat = if rng.gen_bool(0.3) {
                rng.gen_range(75.0..=90.0)
            } else {
                rng.gen_range(-90.0..=90.0)
            };
            for k in [1, 3, 10] {
                assert_eq!(
                    nearest_positions(&index, lon, lat, k),
                    brute_force_nearest(&index, lon, lat, k),
                    "cell {cell_size_deg}, query ({lon}, {lat}), k {k}"
                );
            }
        }
    }
}

#[test]
fn test_radius_matches_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let features = random_features(&mut rng, 400);
    let index = AirportIndex::build(&features);

    for _ in 0..100 {
        let lon = rng.gen_range(-180.0..=180.0);
        let lat = rng.gen_range(-90.0..=90.0);
        let radius_km = rng.gen_range(0.0..=2500.0);

        let found: Vec<usize> = index
            .find_within_radius(lon, lat, radius_km)
            .unwrap()
            .into_iter()
            .map(|n| n.record.source_position)
            .collect();
        let expected: Vec<usize> = brute_force_nearest(&index, lon, lat, index.len())
            .into_iter()
            .filter(|&(_, d)| d <= radius_km)
            .map(|(p, _)| p)
            .collect();
        assert_eq!(found, expected, "query ({lon}, {lat}) radius {radius_km}");
    }
}

#[test]
fn test_bbox_matches_linear_filter() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let features = random_features(&mut rng, 400);
    let index = AirportIndex::build(&features);

    for _ in 0..100 {
        let min_lon = rng.gen_range(-180.0..=180.0);
        let max_lon = rng.gen_range(-180.0..=180.0);
        let a: f64 = rng.gen_range(-90.0..=90.0);
        let b: f64 = rng.gen_range(-90.0..=90.0);
        let (min_lat, max_lat) = (a.min(b), a.max(b));

        let iter = index.find_in_bounding_box(min_lon, min_lat, max_lon, max_lat).unwrap();
        let bbox = iter.bounds();
        let mut found: Vec<usize> = iter.map(|r| r.source_position).collect();
        found.sort_unstable();

        let expected: Vec<usize> = index
            .iter()
            .filter(|r| bbox.contains(r.longitude, r.latitude))
            .map(|r| r.source_position)
            .collect();
        assert_eq!(found, expected);
    }
}

#[test]
fn test_nearest_idempotent() {
    let index = sample_index();
    let first = nearest_positions(&index, 2.35, 48.85, 5);
    for _ in 0..5 {
        assert_eq!(nearest_positions(&index, 2.35, 48.85, 5), first);
    }
}

#[test]
fn test_shared_across_threads() {
    let index = Arc::new(sample_index());
    let expected = nearest_positions(&index, -73.9, 40.7, 3);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || nearest_positions(&index, -73.9, 40.7, 3))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
