mod layouts;

use barcode_scanner_calibration::parser::{ApplicationIdentifiers, Gs1Catalog, ValueLength};
use barcode_scanner_calibration::{
	parse,
	CalibrationData,
	Dialect,
	Error,
	PackIdentifier,
	Parser,
	RecognizedDataElement,
	Scheme,
	Syntax,
};
use chrono::NaiveDate;
use layouts::{Layout, Scanner, SAMPLES};

struct Expected {
	scheme: Scheme,
	syntax: Syntax,
	product_code: &'static str,
	serial_number: Option<&'static str>,
	batch_identifier: Option<&'static str>,
	expiry: Option<(i32, u32, u32)>,
}

const EXPECTED: [Expected; 12] = [
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "05012345678900",
		serial_number: Some("SN0001"),
		batch_identifier: Some("ABC123"),
		expiry: Some((2025, 5, 31)),
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "04006381333931",
		serial_number: Some("1234abcdXYZ"),
		batch_identifier: Some("L-42/7"),
		expiry: Some((2026, 12, 31)),
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "09501101530003",
		serial_number: None,
		batch_identifier: Some("yz+=Q"),
		expiry: Some((2028, 2, 29)),
	},
	Expected {
		scheme: Scheme::Ppn,
		syntax: Syntax::IsoIec15434,
		product_code: "110375286414",
		serial_number: Some("12345ABCDEF98765"),
		batch_identifier: Some("12345ABCD"),
		expiry: Some((2015, 6, 17)),
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::IsoIec15434,
		product_code: "05012345678900",
		serial_number: Some("Q9W8E7"),
		batch_identifier: Some("M&M'S"),
		expiry: Some((2027, 1, 31)),
	},
	Expected {
		scheme: Scheme::Ppn,
		syntax: Syntax::AscMhDataIdentifiers,
		product_code: "110375286414",
		serial_number: Some("{SER}"),
		batch_identifier: Some("ABC[1]"),
		expiry: Some((2025, 12, 31)),
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "04006381333931",
		serial_number: Some("aBcDeF"),
		batch_identifier: None,
		expiry: Some((2025, 11, 30)),
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "09501101530003",
		serial_number: Some("0001"),
		batch_identifier: Some("B1"),
		expiry: None,
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "05012345678900",
		serial_number: Some("qwertyuiop"),
		batch_identifier: Some("asdfghjklzxcvbnm"),
		expiry: None,
	},
	Expected {
		scheme: Scheme::Ppn,
		syntax: Syntax::IsoIec15434,
		product_code: "111234567842",
		serial_number: Some("ser.no:7"),
		batch_identifier: Some("X-1/2"),
		expiry: Some((2029, 10, 15)),
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "04006381333931",
		serial_number: Some("<>;:?"),
		batch_identifier: Some("%&()*"),
		expiry: None,
	},
	Expected {
		scheme: Scheme::Gtin,
		syntax: Syntax::Gs1ElementString,
		product_code: "09501101530003",
		serial_number: Some("_!\"',"),
		batch_identifier: None,
		expiry: Some((2029, 12, 31)),
	},
];

fn parse_identity(reported: &str) -> PackIdentifier {
	let data = CalibrationData::identity();
	parse(&data, reported, &RecognizedDataElement::defaults()).unwrap()
}

#[test]
fn samples_with_matching_layouts() {
	let scanner = Scanner::new(Layout::united_states());
	for (sample, expected) in SAMPLES.iter().zip(&EXPECTED) {
		let pack = parse_identity(&scanner.scan_sample(sample));
		assert_eq!(pack.aim_identifier.as_deref(), Some(sample.aim), "{:?}", sample.data);
		assert_eq!(pack.scheme, expected.scheme, "{:?}", sample.data);
		assert_eq!(pack.syntax, Some(expected.syntax), "{:?}", sample.data);
		assert_eq!(pack.product_code.as_deref(), Some(expected.product_code), "{:?}", sample.data);
		assert_eq!(pack.serial_number.as_deref(), expected.serial_number, "{:?}", sample.data);
		assert_eq!(pack.batch_identifier.as_deref(), expected.batch_identifier, "{:?}", sample.data);
		assert_eq!(
			pack.expiry,
			expected.expiry.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
			"{:?}",
			sample.data,
		);
		assert!(pack.is_valid, "{:?}", sample.data);
	}
}

#[test]
fn unrecognized_identifiers_are_extensions() {
	let scanner = Scanner::new(Layout::united_states());
	let pack = parse_identity(&scanner.scan_sample(&SAMPLES[7]));
	assert_eq!(pack.extensions.len(), 1);
	assert_eq!(pack.extensions[0].identifier, "710");
	assert_eq!(pack.extensions[0].value, "ABC123");
	assert!(pack.extensions[0].is_valid);

	let data = CalibrationData::identity();
	let parser = Parser::new(&data, [RecognizedDataElement::gs1("01")]).unwrap();
	let pack = parser.parse(&scanner.scan_sample(&SAMPLES[0]));
	assert_eq!(pack.product_code.as_deref(), Some("05012345678900"));
	assert_eq!(pack.serial_number, None);
	let extensions: Vec<&str> = pack.extensions.iter().map(|e| e.identifier.as_str()).collect();
	assert_eq!(extensions, vec!["17", "10", "21"]);
}

#[test]
fn wrong_check_digits() {
	let pack = parse_identity("]d20105012345678901\u{1d}21X\r");
	assert_eq!(pack.scheme, Scheme::Gtin);
	assert_eq!(pack.serial_number.as_deref(), Some("X"));
	assert!(!pack.is_valid);

	let pack = parse_identity("]d19N110375286415\u{1d}SX\r");
	assert_eq!(pack.scheme, Scheme::Ppn);
	assert!(!pack.is_valid);
}

#[test]
fn invalid_elements() {
	let pack = parse_identity("]d2010501234567890017251341\u{1d}21\r");
	assert!(pack.is_valid);
	assert_eq!(pack.expiry, None);
	assert_eq!(pack.serial_number, None);
	assert!(pack.elements.iter().all(|e| e.identifier == "01" || !e.is_valid));

	// An unknown identifier swallows everything up to the next group separator.
	let pack = parse_identity("]d20105012345678900774ABC\u{1d}21SER\r");
	assert_eq!(pack.serial_number.as_deref(), Some("SER"));
	let invalid: Vec<&str> = pack.extensions.iter().filter(|e| !e.is_valid).map(|e| e.value.as_str()).collect();
	assert_eq!(invalid, vec!["774ABC"]);
}

#[test]
fn unknown_syntax() {
	let pack = parse_identity("]d1hello world\r");
	assert_eq!(pack.aim_identifier.as_deref(), Some("]d1"));
	assert_eq!(pack.syntax, None);
	assert_eq!(pack.scheme, Scheme::Unknown);
	assert!(pack.elements.is_empty());
	assert!(!pack.is_valid);

	assert_eq!(parse_identity(""), PackIdentifier::default());
}

#[test]
fn without_aim_identifier() {
	let pack = parse_identity("0105012345678900\u{1d}10LOT\r");
	assert_eq!(pack.aim_identifier, None);
	assert_eq!(pack.syntax, Some(Syntax::Gs1ElementString));
	assert_eq!(pack.batch_identifier.as_deref(), Some("LOT"));
	assert!(pack.is_valid);

	// A GS1 AIM identifier forces GS1 decoding even without a known leading identifier.
	let pack = parse_identity("]e0ABC\r");
	assert_eq!(pack.syntax, Some(Syntax::Gs1ElementString));
	assert_eq!(pack.extensions.len(), 1);
	assert!(!pack.extensions[0].is_valid);
}

struct WithInternalCodes;

impl ApplicationIdentifiers for WithInternalCodes {
	fn value_length(&self, identifier: &str) -> Option<ValueLength> {
		match identifier {
			"7003" => Some(ValueLength::Fixed(10)),
			_ => Gs1Catalog.value_length(identifier),
		}
	}
}

#[test]
fn custom_catalog() {
	let data = CalibrationData::identity();
	let reported = "]d20105012345678900700325053112002112\r";

	let parser = Parser::new(&data, RecognizedDataElement::defaults()).unwrap();
	assert_eq!(parser.parse(reported).serial_number, None);

	let parser = parser.with_catalog(WithInternalCodes);
	let pack = parser.parse(reported);
	assert_eq!(pack.extensions[0].identifier, "7003");
	assert_eq!(pack.extensions[0].value, "2505311200");
	assert_eq!(pack.serial_number.as_deref(), Some("12"));
	assert_eq!(pack.extensions[0].dialect, Dialect::Gs1ApplicationIdentifiers);
}

#[test]
fn unusable_calibration_data() {
	let mut data = CalibrationData::identity();
	data.inverse_map.remove(&'7');
	match parse(&data, "]d2010501234567890\r", &RecognizedDataElement::defaults()) {
		Err(Error::UnusableCalibration(missing)) => assert_eq!(missing, "7"),
		other => panic!("unexpected {other:?}"),
	}
}

#[test]
fn pack_identifier_as_json() {
	let scanner = Scanner::new(Layout::united_states());
	let pack = parse_identity(&scanner.scan_sample(&SAMPLES[0]));
	let json = serde_json::to_value(&pack).unwrap();
	assert_eq!(json["scheme"], "Gtin");
	assert_eq!(json["expiry"], "2025-05-31");
	assert_eq!(json["syntax"], "Gs1ElementString");
	assert_eq!(json["elements"][0]["identifier"], "01");

	let back: PackIdentifier = serde_json::from_value(json).unwrap();
	assert_eq!(back, pack);
}
