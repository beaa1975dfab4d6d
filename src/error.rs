//! Errors reported by the crate.
//!
//! Problems found in scanned data are never reported through this type.
//! Those end up as [`Information`](crate::Information) entries on the calibration token,
//! or as invalid elements on a [`PackIdentifier`](crate::PackIdentifier).

use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error reported by the scanner front end, the parser or the (de)serialization code.
#[derive(Error, Debug)]
pub enum Error {
	/// The input device could not be opened.
	#[error("Failed to open input device {}: {source}", path.display())]
	OpenDevice {
		path: PathBuf,
		source: std::io::Error,
	},

	/// The input device could not be grabbed for exclusive use.
	#[error("Failed to grab input device {device}: {source}")]
	GrabDevice {
		device: String,
		source: std::io::Error,
	},

	/// Reading key events from the input device failed.
	#[error("Failed to fetch events from input device: {0}")]
	FetchEvents(std::io::Error),

	/// The calibration data can not invert every invariant character.
	#[error("Calibration data is not usable: {0}")]
	UnusableCalibration(String),

	/// Calibration data could not be (de)serialized.
	#[error("Invalid calibration data: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Calibration data was written with a schema this version does not understand.
	#[error("Unsupported calibration data schema: {0}")]
	UnsupportedSchema(String),

	/// The configuration file could not be read.
	#[error("Failed to read configuration file {}: {source}", path.display())]
	ReadConfig {
		path: PathBuf,
		source: std::io::Error,
	},

	/// The configuration could not be parsed.
	#[error("Configuration error: {0}")]
	Config(#[from] toml::de::Error),
}
