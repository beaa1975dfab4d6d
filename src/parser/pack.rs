//! Pack identifiers and the checks on their elements.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::envelope::{DataElement, Decoded, Syntax};
use super::identifiers::{Dialect, RecognizedDataElement};

/// The product code scheme of a pack identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
	#[default]
	Unknown,

	/// GS1 Global Trade Item Number.
	Gtin,

	/// IFA Pharmacy Product Number.
	Ppn,
}

/// The unique identifier of a medicinal pack, as read from a barcode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackIdentifier {
	pub scheme: Scheme,
	pub product_code: Option<String>,
	pub serial_number: Option<String>,
	pub batch_identifier: Option<String>,
	pub expiry: Option<NaiveDate>,

	/// A scheme was recognized and its product code passed the check digit test.
	pub is_valid: bool,

	/// AIM symbology identifier transmitted by the scanner, like `]d2`.
	pub aim_identifier: Option<String>,

	pub syntax: Option<Syntax>,

	/// Recognized elements, in barcode order.
	pub elements: Vec<DataElement>,

	/// Elements whose identifier is not recognized.
	pub extensions: Vec<DataElement>,
}

/// Map decoded elements onto a pack identifier.
pub(crate) fn resolve(decoded: Decoded, aim_identifier: Option<String>, recognized: &[RecognizedDataElement]) -> PackIdentifier {
	let mut pack = PackIdentifier {
		syntax: decoded.syntax,
		aim_identifier,
		..Default::default()
	};
	let mut product_valid = false;

	for mut element in decoded.elements {
		let is_recognized = recognized.iter()
			.any(|r| r.dialect == element.dialect && r.identifier == element.identifier);
		if !is_recognized {
			pack.extensions.push(element);
			continue;
		}

		use Dialect::*;
		match (element.dialect, element.identifier.as_str()) {
			(Gs1ApplicationIdentifiers, "01") | (AscMhDataIdentifiers, "8P") if pack.product_code.is_none() => {
				pack.scheme = Scheme::Gtin;
				pack.product_code = Some(element.value.clone());
				product_valid = element.is_valid && gtin_is_valid(&element.value);
			},
			(AscMhDataIdentifiers, "9N") if pack.product_code.is_none() => {
				pack.scheme = Scheme::Ppn;
				pack.product_code = Some(element.value.clone());
				product_valid = element.is_valid && ppn_is_valid(&element.value);
			},
			(Gs1ApplicationIdentifiers, "21") | (AscMhDataIdentifiers, "S") if element.is_valid => {
				pack.serial_number = Some(element.value.clone());
			},
			(Gs1ApplicationIdentifiers, "10") | (AscMhDataIdentifiers, "1T") if element.is_valid => {
				pack.batch_identifier = Some(element.value.clone());
			},
			(Gs1ApplicationIdentifiers, "17") | (AscMhDataIdentifiers, "D") => {
				pack.expiry = parse_yymmdd(&element.value);
				element.is_valid &= pack.expiry.is_some();
			},
			(AscMhDataIdentifiers, "14D") => {
				pack.expiry = parse_yyyymmdd(&element.value);
				element.is_valid &= pack.expiry.is_some();
			},
			_ => (),
		}
		pack.elements.push(element);
	}

	pack.is_valid = pack.scheme != Scheme::Unknown && product_valid;
	pack
}

/// Check the mod 10 check digit of a GTIN-8, 12, 13 or 14.
pub fn gtin_is_valid(gtin: &str) -> bool {
	if !matches!(gtin.len(), 8 | 12 | 13 | 14) || !gtin.bytes().all(|b| b.is_ascii_digit()) {
		return false;
	}
	let digits: Vec<u32> = gtin.bytes().map(|b| u32::from(b - b'0')).collect();
	let (check, payload) = match digits.split_last() {
		Some(split) => split,
		None => return false,
	};
	let sum: u32 = payload.iter()
		.rev()
		.enumerate()
		.map(|(i, digit)| if i % 2 == 0 { digit * 3 } else { *digit })
		.sum();
	(10 - sum % 10) % 10 == *check
}

/// Check the mod 97 check digits of a PPN.
pub fn ppn_is_valid(ppn: &str) -> bool {
	if !(4..=22).contains(&ppn.len()) || !ppn.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()) {
		return false;
	}
	let (payload, check) = ppn.split_at(ppn.len() - 2);
	let Ok(check) = check.parse::<u32>() else {
		return false;
	};
	let sum: u32 = payload.bytes()
		.enumerate()
		.map(|(i, b)| u32::from(b) * (i as u32 + 2))
		.sum();
	sum % 97 == check
}

/// Parse a `YYMMDD` date in the 21st century. Day `00` means the last day of the month.
pub(crate) fn parse_yymmdd(value: &str) -> Option<NaiveDate> {
	if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let year = 2000 + value[0..2].parse::<i32>().ok()?;
	date(year, &value[2..])
}

/// Parse a `YYYYMMDD` date. Day `00` means the last day of the month.
pub(crate) fn parse_yyyymmdd(value: &str) -> Option<NaiveDate> {
	if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let year = value[0..4].parse::<i32>().ok()?;
	date(year, &value[4..])
}

fn date(year: i32, month_day: &str) -> Option<NaiveDate> {
	let month = month_day[0..2].parse::<u32>().ok()?;
	let day = month_day[2..4].parse::<u32>().ok()?;
	match (month, day) {
		(1..=11, 0) => NaiveDate::from_ymd_opt(year, month + 1, 1)?.pred_opt(),
		(12, 0) => NaiveDate::from_ymd_opt(year + 1, 1, 1)?.pred_opt(),
		_ => NaiveDate::from_ymd_opt(year, month, day),
	}
}
