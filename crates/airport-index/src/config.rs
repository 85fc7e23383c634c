//! Build-time configuration for the index.
//!
//! The dataset is known to be dirty, and the right repair for some records
//! (country names in the code field, swapped or zeroed coordinates) cannot be
//! decided from the data alone. Each repair is therefore a switch here rather
//! than a fixed rule in the ingestion code.
//!
//! # Example
//!
//! ```
//! use airport_index::{IndexConfig, KeyPolicy};
//!
//! let config = IndexConfig::from_yaml_str(
//!     "cell_size_deg: 2.5\nkey_policy: reject\nreject_zero_placeholder: true\n",
//! )?;
//! assert_eq!(config.key_policy, KeyPolicy::Reject);
//! assert!(config.wrap_longitude);
//! # Ok::<(), airport_index::IndexError>(())
//! ```

use crate::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default grid cell edge in degrees.
pub const DEFAULT_CELL_SIZE_DEG: f64 = 5.0;

/// Smallest accepted grid cell edge in degrees (about a million cells).
pub const MIN_CELL_SIZE_DEG: f64 = 0.25;

/// Default number of rejected records logged at `warn` level.
pub const DEFAULT_MAX_LOGGED_REJECTIONS: usize = 20;

/// What to do with a record whose code is not a well-formed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Keep the record for spatial queries but leave it out of the code table.
    #[default]
    Flag,
    /// Drop the record entirely.
    Reject,
}

/// Configuration for [`AirportIndex`](crate::AirportIndex) builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Requested grid cell edge in degrees. The effective size is adjusted
    /// so an integral number of cells spans each axis.
    pub cell_size_deg: f64,
    /// Handling of malformed codes.
    pub key_policy: KeyPolicy,
    /// Wrap longitudes within one turn of the valid range back into it.
    pub wrap_longitude: bool,
    /// Swap a pair whose latitude is out of range when the swapped pair is valid.
    pub swap_out_of_range: bool,
    /// Reject pairs containing an exact `0`, treating it as a placeholder.
    pub reject_zero_placeholder: bool,
    /// Recover country names found in the code field (see
    /// [`Repair::FieldShift`](crate::Repair::FieldShift)).
    pub field_shift: bool,
    /// Rejections beyond this count are logged at `debug` instead of `warn`.
    pub max_logged_rejections: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cell_size_deg: DEFAULT_CELL_SIZE_DEG,
            key_policy: KeyPolicy::Flag,
            wrap_longitude: true,
            swap_out_of_range: false,
            reject_zero_placeholder: false,
            field_shift: false,
            max_logged_rejections: DEFAULT_MAX_LOGGED_REJECTIONS,
        }
    }
}

impl IndexConfig {
    /// Parse and validate a config from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML config file.
    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Check that every value is within its allowed range.
    pub fn validate(&self) -> Result<()> {
        if !self.cell_size_deg.is_finite() || self.cell_size_deg <= 0.0 || self.cell_size_deg > 90.0 {
            return Err(IndexError::InvalidConfig(format!(
                "cell_size_deg must be in (0, 90], got {}",
                self.cell_size_deg
            )));
        }
        // Finer grids cost more memory than the dataset density can use.
        if self.cell_size_deg < MIN_CELL_SIZE_DEG {
            return Err(IndexError::InvalidConfig(format!(
                "cell_size_deg {} is too fine, minimum is {MIN_CELL_SIZE_DEG}",
                self.cell_size_deg
            )));
        }
        Ok(())
    }
}
