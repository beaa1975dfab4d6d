//! Identifier dialects and the GS1 Application Identifier catalog.

use serde::{Deserialize, Serialize};

/// The family an identifier belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dialect {
	/// GS1 Application Identifiers, like `01` or `17`.
	Gs1ApplicationIdentifiers,

	/// ANSI MH10.8.2 Data Identifiers, like `9N` or `1T`.
	AscMhDataIdentifiers,
}

/// An identifier the parser maps onto a pack identifier field.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecognizedDataElement {
	pub dialect: Dialect,
	pub identifier: String,
}

impl RecognizedDataElement {
	pub fn gs1(identifier: &str) -> Self {
		Self {
			dialect: Dialect::Gs1ApplicationIdentifiers,
			identifier: identifier.to_string(),
		}
	}

	pub fn asc_mh(identifier: &str) -> Self {
		Self {
			dialect: Dialect::AscMhDataIdentifiers,
			identifier: identifier.to_string(),
		}
	}

	/// The identifiers for product code, serial number, batch and expiry in both dialects.
	pub fn defaults() -> Vec<Self> {
		let mut recognized: Vec<Self> = ["01", "10", "17", "21"].into_iter().map(Self::gs1).collect();
		recognized.extend(["8P", "9N", "1T", "D", "14D", "S"].into_iter().map(Self::asc_mh));
		recognized
	}
}

/// Length of the value that follows an identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueLength {
	/// Exactly this many characters, no separator follows.
	Fixed(usize),

	/// Up to this many characters, terminated by a group separator unless last.
	Variable(usize),
}

/// Knowledge about GS1 Application Identifiers.
pub trait ApplicationIdentifiers {
	/// The value length for an identifier, or `None` if the identifier is unknown.
	fn value_length(&self, identifier: &str) -> Option<ValueLength>;
}

/// The commonly used GS1 Application Identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gs1Catalog;

impl ApplicationIdentifiers for Gs1Catalog {
	fn value_length(&self, identifier: &str) -> Option<ValueLength> {
		use ValueLength::*;
		let length = match identifier {
			"00" => Fixed(18),
			"01" | "02" | "03" => Fixed(14),
			"10" => Variable(20),
			"11" | "12" | "13" | "15" | "16" | "17" => Fixed(6),
			"20" => Fixed(2),
			"21" | "22" => Variable(20),
			"235" => Variable(28),
			"240" | "241" | "250" | "251" | "253" => Variable(30),
			"242" => Variable(6),
			"254" => Variable(20),
			"30" | "37" => Variable(8),
			"400" | "401" | "403" => Variable(30),
			"402" => Fixed(17),
			"410" | "411" | "412" | "413" | "414" | "415" | "416" | "417" => Fixed(13),
			"420" => Variable(20),
			"421" => Variable(12),
			"422" => Fixed(3),
			"710" | "711" | "712" | "713" | "714" | "715" => Variable(20),
			"8004" => Variable(30),
			"8006" => Fixed(18),
			"8008" => Variable(12),
			"8020" => Variable(25),
			"90" => Variable(30),
			"91" | "92" | "93" | "94" | "95" | "96" | "97" | "98" | "99" => Variable(90),
			// Measures: 31nn to 36nn, the last digit is the decimal point position.
			_ if identifier.len() == 4
				&& identifier.bytes().all(|b| b.is_ascii_digit())
				&& ("31"..="36").contains(&&identifier[..2]) =>
			{
				Fixed(6)
			},
			_ => return None,
		};
		Some(length)
	}
}
