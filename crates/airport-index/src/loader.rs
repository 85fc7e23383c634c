//! Building an index straight from GeoJSON text, readers or files.

use crate::index::{AirportIndex, FeatureEntry};
use crate::record::RawFeature;
use crate::{IndexConfig, IndexError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Top-level document: a `FeatureCollection`, or a bare array of features.
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Collection {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        features: Vec<Value>,
    },
    Features(Vec<Value>),
}

impl Document {
    fn into_features(self) -> Result<Vec<Value>> {
        match self {
            Document::Collection { kind, features } => match kind.as_deref() {
                None | Some("FeatureCollection") => Ok(features),
                Some(other) => Err(IndexError::Json(serde::de::Error::custom(format!(
                    "expected a FeatureCollection, found type {other:?}"
                )))),
            },
            Document::Features(features) => Ok(features),
        }
    }
}

impl AirportIndex {
    /// Build an index from GeoJSON text with the default config.
    pub fn from_geojson_str(json: &str) -> Result<Self> {
        Self::from_geojson_str_with_config(json, &IndexConfig::default())
    }

    /// Build an index from GeoJSON text.
    ///
    /// Invalid JSON is an error. A feature that is not an object of the
    /// expected shape is only a rejection in the diagnostics.
    pub fn from_geojson_str_with_config(json: &str, config: &IndexConfig) -> Result<Self> {
        let document: Document = serde_json::from_str(json)?;
        Self::from_document(document, config)
    }

    /// Build an index from a GeoJSON reader with the default config.
    pub fn from_geojson_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_geojson_reader_with_config(reader, &IndexConfig::default())
    }

    /// Build an index from a GeoJSON reader.
    pub fn from_geojson_reader_with_config<R: Read>(reader: R, config: &IndexConfig) -> Result<Self> {
        let document: Document = serde_json::from_reader(BufReader::new(reader))?;
        Self::from_document(document, config)
    }

    /// Build an index from a GeoJSON file with the default config.
    pub fn from_geojson_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_geojson_path_with_config(path, &IndexConfig::default())
    }

    /// Build an index from a GeoJSON file.
    pub fn from_geojson_path_with_config<P: AsRef<Path>>(path: P, config: &IndexConfig) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading airport dataset");
        let file = File::open(path)?;
        Self::from_geojson_reader_with_config(file, config)
    }

    fn from_document(document: Document, config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        let parsed: Vec<std::result::Result<RawFeature, String>> = document
            .into_features()?
            .into_iter()
            .map(|value| serde_json::from_value::<RawFeature>(value).map_err(|e| e.to_string()))
            .collect();

        let entries = parsed.iter().map(|item| match item {
            Ok(feature) => FeatureEntry::Parsed(feature),
            Err(message) => FeatureEntry::Unparseable(message.clone()),
        });
        Ok(Self::assemble(entries, config.clone()))
    }
}
