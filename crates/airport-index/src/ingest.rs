//! Validation and normalization of raw features, with build diagnostics.
//!
//! Malformed input never aborts a build. Every feature ends up either as an
//! [`AirportRecord`] or as a [`Rejection`] in [`BuildDiagnostics`], and every
//! repair or low-confidence flag is recorded alongside.

use crate::config::{IndexConfig, KeyPolicy};
use crate::geo::wrap_longitude;
use crate::record::{coordinate_value, is_well_formed_code, AirportRecord, KeyConfidence, RawFeature};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a feature was excluded from the index.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The feature could not be read as a feature object at all.
    #[error("feature is not an object of the expected shape: {message}")]
    Unparseable { message: String },

    /// Fewer than two coordinate entries.
    #[error("expected [lon, lat], found {found} coordinate entries")]
    MissingCoordinates { found: usize },

    /// The longitude (index 0) or latitude (index 1) entry is not a number.
    #[error("coordinate {index} is not a number: {value}")]
    NonNumericCoordinate { index: usize, value: String },

    /// NaN or infinite coordinate.
    #[error("coordinate is not finite")]
    NonFiniteCoordinate,

    /// Latitude outside [-90, 90] after repairs.
    #[error("latitude {latitude} is outside [-90, 90]")]
    LatitudeOutOfRange { latitude: f64 },

    /// Longitude outside [-180, 180] after repairs.
    #[error("longitude {longitude} is outside [-180, 180]")]
    LongitudeOutOfRange { longitude: f64 },

    /// A coordinate was exactly zero and zeros are treated as placeholders.
    #[error("coordinate pair [{longitude}, {latitude}] contains a zero placeholder")]
    ZeroPlaceholder { longitude: f64, latitude: f64 },

    /// Malformed code under [`KeyPolicy::Reject`].
    #[error("code {code:?} is not a 2-4 character alphanumeric key")]
    MalformedKey { code: String },
}

impl RejectReason {
    /// Stable short name, used for grouping counts.
    pub fn kind(&self) -> &'static str {
        match self {
            RejectReason::Unparseable { .. } => "unparseable",
            RejectReason::MissingCoordinates { .. } => "missing_coordinates",
            RejectReason::NonNumericCoordinate { .. } => "non_numeric_coordinate",
            RejectReason::NonFiniteCoordinate => "non_finite_coordinate",
            RejectReason::LatitudeOutOfRange { .. } => "latitude_out_of_range",
            RejectReason::LongitudeOutOfRange { .. } => "longitude_out_of_range",
            RejectReason::ZeroPlaceholder { .. } => "zero_placeholder",
            RejectReason::MalformedKey { .. } => "malformed_key",
        }
    }
}

/// A feature excluded from the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Position in the input list.
    pub position: usize,
    /// The raw code, if the feature had one.
    pub iata: Option<String>,
    /// What was wrong with it.
    pub reason: RejectReason,
}

/// A change made to a feature so that it could be accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Repair {
    /// Longitude was one turn out of range and was wrapped.
    WrappedLongitude {
        /// Longitude as given.
        from: f64,
        /// Longitude after wrapping.
        to: f64,
    },
    /// Latitude was out of range and the pair was valid once swapped.
    SwappedCoordinates {
        /// Longitude after the swap.
        longitude: f64,
        /// Latitude after the swap.
        latitude: f64,
    },
    /// A country name found in the code field was moved into `country`,
    /// and the displaced country text into `city` when that was empty.
    FieldShift {
        /// New country value.
        country: String,
        /// New city value.
        city: String,
    },
}

/// A repair applied to an accepted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedRepair {
    /// Position in the input list.
    pub position: usize,
    /// What was changed.
    pub repair: Repair,
}

/// An accepted record whose code is not usable as a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowConfidenceKey {
    /// Position in the input list.
    pub position: usize,
    /// The code as it appeared in the input, trimmed.
    pub raw_code: String,
}

/// A well-formed code seen more than once. The first occurrence owns the
/// code-table entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCode {
    /// The normalized code.
    pub code: String,
    /// Position of the record that owns the code.
    pub kept_position: usize,
    /// Position of the record shadowed by it.
    pub shadowed_position: usize,
}

/// Everything the build noticed about the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildDiagnostics {
    /// Number of features offered to the build.
    pub input_count: usize,
    /// Number of records in the index.
    pub accepted_count: usize,
    /// Features left out of the index, in input order.
    pub rejections: Vec<Rejection>,
    /// Accepted records missing from the code table.
    pub low_confidence: Vec<LowConfidenceKey>,
    /// Codes shadowed by an earlier record.
    pub duplicate_codes: Vec<DuplicateCode>,
    /// Repairs made to accepted records.
    pub repairs: Vec<AppliedRepair>,
}

impl BuildDiagnostics {
    /// Number of rejected features.
    pub fn rejected_count(&self) -> usize {
        self.rejections.len()
    }

    /// True when nothing was rejected, flagged, shadowed or repaired.
    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty()
            && self.low_confidence.is_empty()
            && self.duplicate_codes.is_empty()
            && self.repairs.is_empty()
    }

    /// Rejection counts grouped by [`RejectReason::kind`].
    pub fn rejections_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for rejection in &self.rejections {
            *counts.entry(rejection.reason.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Look up the rejection for an input position.
    pub fn rejection_at(&self, position: usize) -> Option<&Rejection> {
        self.rejections.iter().find(|r| r.position == position)
    }
}

/// Turns raw features into records, filling in diagnostics as it goes.
pub(crate) struct Ingestor<'a> {
    config: &'a IndexConfig,
    diagnostics: BuildDiagnostics,
}

impl<'a> Ingestor<'a> {
    pub(crate) fn new(config: &'a IndexConfig) -> Self {
        Self {
            config,
            diagnostics: BuildDiagnostics::default(),
        }
    }

    pub(crate) fn finish(mut self, accepted_count: usize) -> BuildDiagnostics {
        self.diagnostics.accepted_count = accepted_count;
        self.diagnostics
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut BuildDiagnostics {
        &mut self.diagnostics
    }

    /// Record a feature that could not even be deserialized.
    pub(crate) fn reject_unparseable(&mut self, position: usize, message: String) {
        self.diagnostics.input_count += 1;
        self.reject(position, None, RejectReason::Unparseable { message });
    }

    /// Validate and normalize one feature.
    pub(crate) fn ingest(&mut self, position: usize, feature: &RawFeature) -> Option<AirportRecord> {
        self.diagnostics.input_count += 1;
        let raw_code = feature
            .properties
            .iata
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let code_for_log = Some(raw_code.clone()).filter(|c| !c.is_empty());

        // Repairs are only committed once the record is accepted.
        let mut repairs = Vec::new();
        let (longitude, latitude) = match self.normalize_coordinates(feature, &mut repairs) {
            Ok(pair) => pair,
            Err(reason) => {
                self.reject(position, code_for_log, reason);
                return None;
            }
        };

        let mut iata = raw_code.to_uppercase();
        let mut city = trimmed(&feature.properties.city);
        let mut country = trimmed(&feature.properties.country);
        let name = trimmed(&feature.properties.name);

        let key_confidence = if is_well_formed_code(&iata) {
            KeyConfidence::High
        } else {
            if self.config.key_policy == KeyPolicy::Reject {
                self.reject(position, code_for_log, RejectReason::MalformedKey { code: raw_code });
                return None;
            }

            let raw_country = feature.properties.country.as_deref().unwrap_or_default();
            let shifted_country = raw_country.starts_with(char::is_whitespace);
            if self.config.field_shift && shifted_country && !raw_code.is_empty() {
                if city.is_empty() {
                    city = country.clone();
                }
                country = raw_code.clone();
                iata.clear();
                repairs.push(Repair::FieldShift {
                    country: country.clone(),
                    city: city.clone(),
                });
            }

            debug!(position, code = %raw_code, "Low-confidence airport code");
            self.diagnostics.low_confidence.push(LowConfidenceKey { position, raw_code });
            KeyConfidence::Low
        };

        self.diagnostics
            .repairs
            .extend(repairs.into_iter().map(|repair| AppliedRepair { position, repair }));

        Some(AirportRecord {
            iata,
            name,
            city,
            country,
            longitude,
            latitude,
            key_confidence,
            source_position: position,
        })
    }

    fn normalize_coordinates(&self, feature: &RawFeature, repairs: &mut Vec<Repair>) -> Result<(f64, f64), RejectReason> {
        let raw = feature.raw_coordinates();
        if raw.len() < 2 {
            return Err(RejectReason::MissingCoordinates { found: raw.len() });
        }

        // Entries past the second (altitude) are ignored.
        let mut pair = [0.0; 2];
        for (index, (slot, value)) in pair.iter_mut().zip(raw).enumerate() {
            *slot = coordinate_value(value).ok_or_else(|| RejectReason::NonNumericCoordinate {
                index,
                value: value.to_string(),
            })?;
        }
        let [mut longitude, mut latitude] = pair;

        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(RejectReason::NonFiniteCoordinate);
        }

        if self.config.reject_zero_placeholder && (longitude == 0.0 || latitude == 0.0) {
            return Err(RejectReason::ZeroPlaceholder { longitude, latitude });
        }

        if self.config.swap_out_of_range
            && !(-90.0..=90.0).contains(&latitude)
            && (-90.0..=90.0).contains(&longitude)
            && (-180.0..=180.0).contains(&latitude)
        {
            std::mem::swap(&mut longitude, &mut latitude);
            repairs.push(Repair::SwappedCoordinates { longitude, latitude });
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RejectReason::LatitudeOutOfRange { latitude });
        }

        if !(-180.0..=180.0).contains(&longitude) {
            let wrapped = if self.config.wrap_longitude {
                wrap_longitude(longitude)
            } else {
                None
            };
            match wrapped {
                Some(to) => {
                    repairs.push(Repair::WrappedLongitude { from: longitude, to });
                    longitude = to;
                }
                None => return Err(RejectReason::LongitudeOutOfRange { longitude }),
            }
        }

        Ok((longitude, latitude))
    }

    fn reject(&mut self, position: usize, iata: Option<String>, reason: RejectReason) {
        if self.diagnostics.rejections.len() < self.config.max_logged_rejections {
            warn!(position, iata = ?iata, reason = %reason, "Rejected airport record");
        } else {
            debug!(position, iata = ?iata, reason = %reason, "Rejected airport record");
        }
        self.diagnostics.rejections.push(Rejection { position, iata, reason });
    }
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}
