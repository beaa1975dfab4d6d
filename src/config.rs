//! Calibration settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Settings that tune a calibration.
///
/// Every field has a default, so a TOML document only needs to name what it changes:
///
/// ```toml
/// performance_threshold_ms = 500
/// max_segment_length = 120
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
	/// Scans that take longer than this are reported as slow.
	pub performance_threshold_ms: u64,

	/// Maximum number of characters per calibration barcode.
	///
	/// Longer calibration data is split over several barcodes.
	pub max_segment_length: Option<usize>,

	/// Maximum number of characters the scanner may transmit in front of the barcode data.
	pub max_prefix_length: usize,
}

impl Default for CalibrationConfig {
	fn default() -> Self {
		Self {
			performance_threshold_ms: 1000,
			max_segment_length: None,
			max_prefix_length: 32,
		}
	}
}

impl CalibrationConfig {
	/// Parse settings from a TOML document.
	pub fn from_toml_str(toml: &str) -> Result<Self> {
		Ok(toml::from_str(toml)?)
	}

	/// Read settings from a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let toml = std::fs::read_to_string(path).map_err(|source| crate::Error::ReadConfig {
			path: path.to_owned(),
			source,
		})?;
		Self::from_toml_str(&toml)
	}

	pub fn performance_threshold(&self) -> Duration {
		Duration::from_millis(self.performance_threshold_ms)
	}
}
