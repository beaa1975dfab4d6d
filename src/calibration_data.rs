//! The persisted result of a calibration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::reference::{self, Separator, DELIMITER};
use crate::{Error, Result};

/// Current calibration data schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Case conversion applied somewhere between the barcode and the application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseConversion {
	#[default]
	None,
	ToUpper,
	ToLower,
	Invert,
}

impl CaseConversion {
	/// Check if `reported` is what this conversion makes of `expected`.
	pub fn explains(self, expected: char, reported: char) -> bool {
		match self {
			CaseConversion::None => false,
			CaseConversion::ToUpper => expected.is_ascii_lowercase() && reported == expected.to_ascii_uppercase(),
			CaseConversion::ToLower => expected.is_ascii_uppercase() && reported == expected.to_ascii_lowercase(),
			CaseConversion::Invert => {
				expected.is_ascii_alphabetic() && expected != reported && reported.eq_ignore_ascii_case(&expected)
			},
		}
	}
}

/// Script of the letters produced by the computer keyboard layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyboardScript {
	#[default]
	Latin,
	Greek,
	Cyrillic,
	Armenian,
	Georgian,
	Hebrew,
	Arabic,
	Thai,
	Other,
}

impl KeyboardScript {
	/// The script a character belongs to, if it is a letter.
	pub fn of(c: char) -> Option<Self> {
		if !c.is_alphabetic() {
			return None;
		}
		let script = match c as u32 {
			0x0000..=0x024F | 0x1E00..=0x1EFF => KeyboardScript::Latin,
			0x0370..=0x03FF | 0x1F00..=0x1FFF => KeyboardScript::Greek,
			0x0400..=0x052F => KeyboardScript::Cyrillic,
			0x0530..=0x058F => KeyboardScript::Armenian,
			0x10A0..=0x10FF => KeyboardScript::Georgian,
			0x0590..=0x05FF => KeyboardScript::Hebrew,
			0x0600..=0x06FF => KeyboardScript::Arabic,
			0x0E00..=0x0E7F => KeyboardScript::Thai,
			_ => KeyboardScript::Other,
		};
		Some(script)
	}
}

/// What a dead key produces together with the following keystroke.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadKeyTable {
	/// The expected character whose keystroke is a dead key on the computer.
	pub expected: char,

	/// Reported output for each expected character following the dead key.
	pub following: BTreeMap<char, String>,
}

impl DeadKeyTable {
	/// Find the following character whose reported output is the longest prefix of `reported`.
	///
	/// Returns the expected character and the number of reported characters it covers.
	pub fn longest_match(&self, reported: &[char]) -> Option<(char, usize)> {
		let mut best: Option<(char, usize)> = None;
		for (&expected, output) in &self.following {
			let length = output.chars().count();
			if length == 0 || length > reported.len() {
				continue;
			}
			if output.chars().zip(reported).all(|(a, &b)| a == b) && best.map_or(true, |(_, l)| length > l) {
				best = Some((expected, length));
			}
		}
		best
	}
}

/// Reported sequences for the control characters.
///
/// `None` means the keyboard can not deliver that control character.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separators {
	pub group: Option<String>,
	pub record: Option<String>,
	pub file: Option<String>,
	pub unit: Option<String>,
	pub end_of_transmission: Option<String>,
	pub end_of_line: Option<String>,
}

impl Separators {
	pub fn get(&self, separator: Separator) -> Option<&str> {
		match separator {
			Separator::Group => self.group.as_deref(),
			Separator::Record => self.record.as_deref(),
			Separator::File => self.file.as_deref(),
			Separator::Unit => self.unit.as_deref(),
			Separator::EndOfTransmission => self.end_of_transmission.as_deref(),
			Separator::CarriageReturn => self.end_of_line.as_deref(),
		}
	}

	pub fn set(&mut self, separator: Separator, reported: Option<String>) {
		let slot = match separator {
			Separator::Group => &mut self.group,
			Separator::Record => &mut self.record,
			Separator::File => &mut self.file,
			Separator::Unit => &mut self.unit,
			Separator::EndOfTransmission => &mut self.end_of_transmission,
			Separator::CarriageReturn => &mut self.end_of_line,
		};
		*slot = reported;
	}
}

/// The mapping between the characters encoded in a barcode and the characters an application receives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationData {
	/// Expected character to the single character reported for it.
	pub character_map: BTreeMap<char, char>,

	/// Reported character to expected character, for unambiguous reports only.
	pub inverse_map: BTreeMap<char, char>,

	/// Dead keys, by reported sentinel sequence.
	pub dead_keys: BTreeMap<String, DeadKeyTable>,

	/// Reported multi-character sequences that stand for a single expected character.
	pub ligatures: BTreeMap<String, char>,

	/// Expected characters the keyboard can not deliver.
	pub unassigned: BTreeSet<char>,

	pub separators: Separators,

	/// The AIM flag character can be reliably read.
	pub aim_supported: bool,

	/// Reported sequence for the AIM flag character.
	pub aim_flag: Option<String>,

	/// Literal text the scanner transmits before the barcode data.
	pub prefix: String,

	/// Literal text the scanner transmits after the barcode data.
	pub suffix: String,

	pub case_conversion: CaseConversion,

	pub keyboard_script: KeyboardScript,
}

#[derive(Serialize)]
struct VersionedRef<'a> {
	schema: u32,
	#[serde(flatten)]
	data: &'a CalibrationData,
}

impl CalibrationData {
	/// Calibration data for a scanner and computer that agree on every character.
	pub fn identity() -> Self {
		let mut data = Self::default();
		data.character_map.insert(DELIMITER, DELIMITER);
		data.inverse_map.insert(DELIMITER, DELIMITER);
		for c in reference::baseline_cells() {
			data.character_map.insert(c, c);
			data.inverse_map.insert(c, c);
		}
		for separator in Separator::CELLS {
			data.separators.set(separator, Some(separator.character().to_string()));
		}
		data.separators.end_of_line = Some("\r".to_string());
		data.aim_supported = true;
		data.aim_flag = Some(reference::AIM_FLAG.to_string());
		data
	}

	/// Reported sequence for an expected character, as it appears in a single keystroke.
	pub fn reported(&self, expected: char) -> Option<String> {
		if let Some(reported) = self.character_map.get(&expected) {
			return Some(reported.to_string());
		}
		if let Some((prefix, _)) = self.dead_keys.iter().find(|(_, table)| table.expected == expected) {
			return Some(prefix.clone());
		}
		self.ligatures.iter()
			.find(|(_, &c)| c == expected)
			.map(|(sequence, _)| sequence.clone())
	}

	/// Check if every invariant character and the group separator can be recovered from reported data.
	pub fn is_invertible(&self) -> bool {
		self.non_invertible().is_empty() && self.separators.group.is_some()
	}

	/// Invariant characters that can not be recovered from reported data.
	pub fn non_invertible(&self) -> Vec<char> {
		reference::INVARIANT_CHARACTERS
			.chars()
			.filter(|&c| !self.can_invert(c))
			.collect()
	}

	fn can_invert(&self, expected: char) -> bool {
		if self.unassigned.contains(&expected) {
			return false;
		}
		if let Some(reported) = self.character_map.get(&expected) {
			return match self.inverse_map.get(reported) {
				Some(&inverse) if inverse == expected => true,
				Some(&inverse) => {
					matches!(self.case_conversion, CaseConversion::ToUpper | CaseConversion::ToLower)
						&& inverse.eq_ignore_ascii_case(&expected)
				},
				None => false,
			};
		}
		self.dead_keys.values().any(|table| table.expected == expected)
			|| self.ligatures.values().any(|&c| c == expected)
	}

	/// Serialize to the versioned JSON representation.
	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string(&VersionedRef {
			schema: SCHEMA_VERSION,
			data: self,
		})?)
	}

	/// Deserialize from the versioned JSON representation.
	pub fn from_json(json: &str) -> Result<Self> {
		let mut value: serde_json::Value = serde_json::from_str(json)?;
		let schema = value.as_object_mut()
			.and_then(|object| object.remove("schema"))
			.ok_or_else(|| Error::UnsupportedSchema("missing schema".to_string()))?;
		match schema.as_u64() {
			Some(1) => Ok(serde_json::from_value(value)?),
			_ => Err(Error::UnsupportedSchema(schema.to_string())),
		}
	}
}
