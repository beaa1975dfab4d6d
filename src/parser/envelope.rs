//! Syntax detection and splitting of barcode data into data elements.

use serde::{Deserialize, Serialize};

use super::identifiers::{ApplicationIdentifiers, Dialect, ValueLength};
use crate::reference::{END_OF_TRANSMISSION, GROUP_SEPARATOR, RECORD_SEPARATOR};

/// Replacement for reported characters that could not be inverted.
pub(crate) const INVALID: char = '\u{FFFD}';

const ENVELOPE_HEADER: [char; 4] = ['[', ')', '>', RECORD_SEPARATOR];

/// AIM identifiers of symbologies that carry GS1 element strings.
const GS1_AIM_IDENTIFIERS: [&str; 6] = ["]C1", "]e0", "]d2", "]Q3", "]J1", "]E4"];

/// The syntax barcode data was recognized as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Syntax {
	/// ISO/IEC 15434 envelope around format 05 or 06 data.
	IsoIec15434,

	/// A bare GS1 element string.
	Gs1ElementString,

	/// Bare ASC MH10.8.2 data.
	AscMhDataIdentifiers,
}

/// One identifier with its value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataElement {
	pub dialect: Dialect,
	pub identifier: String,
	pub value: String,

	/// The value has the expected shape and contains no uninvertible characters.
	pub is_valid: bool,
}

/// Barcode data split into data elements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Decoded {
	pub syntax: Option<Syntax>,
	pub elements: Vec<DataElement>,
}

/// Detect the syntax of `text` and split it into data elements.
pub(crate) fn decode(text: &[char], aim: Option<&str>, catalog: &dyn ApplicationIdentifiers) -> Decoded {
	if text.starts_with(&ENVELOPE_HEADER) {
		return Decoded {
			syntax: Some(Syntax::IsoIec15434),
			elements: decode_envelope(&text[ENVELOPE_HEADER.len()..], catalog),
		};
	}

	let gs1_aim = aim.map_or(false, |aim| GS1_AIM_IDENTIFIERS.contains(&aim));
	// Without a GS1 symbology a Data Identifier like 10D wins over the Application Identifier 10.
	let data_identifier = !gs1_aim && data_identifier_length(text).is_some();
	if gs1_aim
		|| text.first() == Some(&GROUP_SEPARATOR)
		|| (!data_identifier && leading_application_identifier(text, catalog).is_some())
	{
		return Decoded {
			syntax: Some(Syntax::Gs1ElementString),
			elements: decode_gs1(text, catalog),
		};
	}

	if data_identifier {
		return Decoded {
			syntax: Some(Syntax::AscMhDataIdentifiers),
			elements: decode_asc_mh(text),
		};
	}

	Decoded::default()
}

/// Decode the formats inside an ISO/IEC 15434 envelope.
///
/// Format 05 holds GS1 element strings, format 06 ASC MH data. Other formats are skipped.
fn decode_envelope(text: &[char], catalog: &dyn ApplicationIdentifiers) -> Vec<DataElement> {
	let mut elements = Vec::new();
	for format in text.split(|&c| c == RECORD_SEPARATOR) {
		let format = match format {
			[END_OF_TRANSMISSION, ..] | [] => continue,
			format => format,
		};
		if format.len() < 2 {
			continue;
		}
		let (header, data) = format.split_at(2);
		let data = match data {
			[GROUP_SEPARATOR, data @ ..] => data,
			data => data,
		};
		match header {
			['0', '5'] => elements.extend(decode_gs1(data, catalog)),
			['0', '6'] => elements.extend(decode_asc_mh(data)),
			_ => (),
		}
	}
	elements
}

fn leading_application_identifier(text: &[char], catalog: &dyn ApplicationIdentifiers) -> Option<(String, ValueLength)> {
	(2..=4).find_map(|length| {
		let identifier = text.get(..length)?;
		if !identifier.iter().all(char::is_ascii_digit) {
			return None;
		}
		let identifier: String = identifier.iter().collect();
		catalog.value_length(&identifier).map(|value_length| (identifier, value_length))
	})
}

/// Split a GS1 element string.
///
/// An unknown identifier invalidates everything up to the next group separator.
fn decode_gs1(text: &[char], catalog: &dyn ApplicationIdentifiers) -> Vec<DataElement> {
	let mut elements = Vec::new();
	let mut i = 0;
	while i < text.len() {
		if text[i] == GROUP_SEPARATOR {
			i += 1;
			continue;
		}
		let next_separator = text[i..].iter()
			.position(|&c| c == GROUP_SEPARATOR)
			.map_or(text.len(), |p| i + p);

		let Some((identifier, value_length)) = leading_application_identifier(&text[i..], catalog) else {
			elements.push(DataElement {
				dialect: Dialect::Gs1ApplicationIdentifiers,
				identifier: String::new(),
				value: text[i..next_separator].iter().collect(),
				is_valid: false,
			});
			i = next_separator;
			continue;
		};

		let start = i + identifier.len();
		let (end, is_valid) = match value_length {
			ValueLength::Fixed(length) => {
				let end = (start + length).min(next_separator);
				(end, end - start == length)
			},
			ValueLength::Variable(max) => (next_separator, next_separator > start && next_separator - start <= max),
		};
		let value: String = text[start..end].iter().collect();
		elements.push(DataElement {
			dialect: Dialect::Gs1ApplicationIdentifiers,
			identifier,
			is_valid: is_valid && !value.contains(INVALID),
			value,
		});
		i = end;
	}
	elements
}

/// Length of the Data Identifier at the start of `text`: up to three digits and an upper case letter.
fn data_identifier_length(text: &[char]) -> Option<usize> {
	let digits = text.iter().take_while(|c| c.is_ascii_digit()).count();
	(digits <= 3 && text.get(digits).map_or(false, char::is_ascii_uppercase)).then_some(digits + 1)
}

/// Split ASC MH data, where every element is terminated by a group separator.
fn decode_asc_mh(text: &[char]) -> Vec<DataElement> {
	text.split(|&c| c == GROUP_SEPARATOR)
		.filter(|element| !element.is_empty())
		.map(|element| match data_identifier_length(element) {
			Some(length) => {
				let value: String = element[length..].iter().collect();
				DataElement {
					dialect: Dialect::AscMhDataIdentifiers,
					identifier: element[..length].iter().collect(),
					is_valid: !value.is_empty() && !value.contains(INVALID),
					value,
				}
			},
			None => DataElement {
				dialect: Dialect::AscMhDataIdentifiers,
				identifier: String::new(),
				value: element.iter().collect(),
				is_valid: false,
			},
		})
		.collect()
}
