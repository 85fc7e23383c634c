//! Key-based lookup tables: exact code, exact city, and prefix scans for
//! autocomplete.

use crate::ingest::{BuildDiagnostics, DuplicateCode};
use crate::record::AirportRecord;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Ordered maps from normalized keys to record ids.
///
/// Codes are keyed uppercase, cities lowercase. `BTreeMap` keeps both sorted
/// so prefix queries are a range scan.
#[derive(Debug, Default)]
pub(crate) struct TextIndex {
    codes: BTreeMap<String, u32>,
    cities: BTreeMap<String, Vec<u32>>,
}

impl TextIndex {
    pub(crate) fn build(records: &[AirportRecord], diagnostics: &mut BuildDiagnostics) -> Self {
        let mut index = Self::default();

        for (id, record) in records.iter().enumerate() {
            let id = id as u32;

            if record.has_reliable_code() {
                match index.codes.entry(record.iata.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(id);
                    }
                    Entry::Occupied(slot) => {
                        let kept = &records[*slot.get() as usize];
                        tracing::debug!(
                            code = %record.iata,
                            kept = kept.source_position,
                            shadowed = record.source_position,
                            "Duplicate airport code"
                        );
                        diagnostics.duplicate_codes.push(DuplicateCode {
                            code: record.iata.clone(),
                            kept_position: kept.source_position,
                            shadowed_position: record.source_position,
                        });
                    }
                }
            }

            let city = normalize_city(&record.city);
            if !city.is_empty() {
                index.cities.entry(city).or_default().push(id);
            }
        }

        index
    }

    /// Record id owning a code.
    pub(crate) fn code(&self, code: &str) -> Option<u32> {
        self.codes.get(&normalize_code(code)).copied()
    }

    /// Record ids for a city, in source order.
    pub(crate) fn city(&self, city: &str) -> &[u32] {
        self.cities
            .get(&normalize_city(city))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Record ids whose code starts with `prefix`, ordered by code.
    pub(crate) fn codes_with_prefix(&self, prefix: &str) -> impl Iterator<Item = u32> + '_ {
        let prefix = normalize_code(prefix);
        self.codes
            .range(prefix.clone()..)
            .take_while(move |(code, _)| code.starts_with(&prefix))
            .map(|(_, &id)| id)
    }

    /// Groups of record ids whose city starts with `prefix`, ordered by city.
    pub(crate) fn cities_with_prefix(&self, prefix: &str) -> impl Iterator<Item = &[u32]> + '_ {
        let prefix = normalize_city(prefix);
        self.cities
            .range(prefix.clone()..)
            .take_while(move |(city, _)| city.starts_with(&prefix))
            .map(|(_, ids)| ids.as_slice())
    }

    pub(crate) fn code_count(&self) -> usize {
        self.codes.len()
    }
}

pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub(crate) fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}
