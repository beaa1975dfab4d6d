//! Parsing of scanned pack identifiers.
//!
//! The parser first undoes what the keyboard layout did to the barcode data,
//! using calibration data from a completed calibration.
//! It then detects the syntax of the recovered data, splits it into data elements
//! and maps the recognized elements onto a [`PackIdentifier`].
//!
//! ```
//! use barcode_scanner_calibration::{CalibrationData, Parser, RecognizedDataElement, Scheme};
//!
//! let data = CalibrationData::identity();
//! let parser = Parser::new(&data, RecognizedDataElement::defaults()).unwrap();
//! let pack = parser.parse("]d20105012345678900\u{1d}21ABC123\r");
//! assert_eq!(pack.scheme, Scheme::Gtin);
//! assert_eq!(pack.serial_number.as_deref(), Some("ABC123"));
//! assert!(pack.is_valid);
//! ```

mod envelope;
pub mod identifiers;
mod pack;

pub use envelope::{DataElement, Syntax};
pub use identifiers::{ApplicationIdentifiers, Dialect, Gs1Catalog, RecognizedDataElement, ValueLength};
pub use pack::{gtin_is_valid, ppn_is_valid, PackIdentifier, Scheme};

use tracing::debug;

use crate::calibration_data::CalibrationData;
use crate::environment::split_end_of_line;
use crate::information::describe;
use crate::invert::Inverter;
use crate::reference::AIM_FLAG;
use crate::{Error, Result};

/// Parses reported barcode data with the help of calibration data.
pub struct Parser<'a> {
	data: &'a CalibrationData,
	inverter: Inverter<'a>,

	/// The prefix as it inverts.
	prefix: Vec<Option<char>>,
	recognized: Vec<RecognizedDataElement>,
	catalog: Box<dyn ApplicationIdentifiers + Send + Sync>,
}

impl<'a> Parser<'a> {
	/// Create a parser that maps the `recognized` identifiers onto pack identifier fields.
	///
	/// Fails if the calibration data can not recover every invariant character.
	pub fn new(data: &'a CalibrationData, recognized: impl IntoIterator<Item = RecognizedDataElement>) -> Result<Self> {
		if !data.is_invertible() {
			let mut missing = describe(data.non_invertible());
			if data.separators.group.is_none() {
				missing.push_str(" (no group separator)");
			}
			return Err(Error::UnusableCalibration(missing));
		}
		let inverter = Inverter::new(data);
		let prefix: Vec<char> = data.prefix.chars().collect();
		let prefix = inverter.invert(&prefix).into_iter().map(|c| c.expected).collect();
		Ok(Self {
			data,
			inverter,
			prefix,
			recognized: recognized.into_iter().collect(),
			catalog: Box::new(Gs1Catalog),
		})
	}

	/// Use a different catalog of GS1 Application Identifiers.
	pub fn with_catalog(mut self, catalog: impl ApplicationIdentifiers + Send + Sync + 'static) -> Self {
		self.catalog = Box::new(catalog);
		self
	}

	/// Recover the characters encoded in the barcode from reported data.
	///
	/// Prefix, suffix and end-of-line are removed.
	/// Characters that can not be recovered are replaced by U+FFFD.
	pub fn invert(&self, reported: &str) -> String {
		let reported: Vec<char> = reported.chars().collect();
		let inverted: Vec<Option<char>> = self.inverter
			.invert(self.strip_suffix(&reported))
			.into_iter()
			.map(|c| c.expected)
			.collect();
		// A dead key at the end of the prefix composes with the first barcode character.
		let body = inverted.strip_prefix(self.prefix.as_slice()).unwrap_or(inverted.as_slice());
		body.iter().map(|c| c.unwrap_or(envelope::INVALID)).collect()
	}

	/// Parse reported barcode data.
	///
	/// Problems with the data never fail the parse, they show up as invalid elements instead.
	pub fn parse(&self, reported: &str) -> PackIdentifier {
		let text: Vec<char> = self.invert(reported).chars().collect();
		let (aim_identifier, body) = match text.as_slice() {
			[AIM_FLAG, symbology, modifier, body @ ..] if symbology.is_ascii_alphabetic() && modifier.is_ascii_alphanumeric() => {
				(Some([AIM_FLAG, *symbology, *modifier].iter().collect::<String>()), body)
			},
			body => (None, body),
		};

		let decoded = envelope::decode(body, aim_identifier.as_deref(), self.catalog.as_ref());
		debug!("Decoded {:?} with {} elements", decoded.syntax, decoded.elements.len());
		pack::resolve(decoded, aim_identifier, &self.recognized)
	}

	fn strip_suffix<'r>(&self, reported: &'r [char]) -> &'r [char] {
		let mut reported = reported;
		if self.data.separators.end_of_line.is_some() {
			reported = split_end_of_line(reported).0;
		}
		let suffix: Vec<char> = self.data.suffix.chars().collect();
		if !suffix.is_empty() {
			reported = reported.strip_suffix(suffix.as_slice()).unwrap_or(reported);
		}
		reported
	}
}

/// Parse reported barcode data in one go.
pub fn parse(data: &CalibrationData, reported: &str, recognized: &[RecognizedDataElement]) -> Result<PackIdentifier> {
	Ok(Parser::new(data, recognized.iter().cloned())?.parse(reported))
}
