//! Reference data: the characters a calibration barcode carries and how they are laid out.
//!
//! A calibration barcode consists of one leading space followed by a sequence of cells.
//! Every cell holds one expected character and is terminated by a space.
//! Because the space doubles as the delimiter it is never a cell of its own.
//!
//! The cells are, in order:
//! * the invariant characters used by GS1 Application Identifiers and ASC MH Data Identifiers,
//! * the remaining printable ASCII characters,
//! * the control characters group separator, file separator, unit separator,
//!   record separator and end-of-transmission.
//!
//! A probe barcode for a dead key repeats the printable cells with the dead key character
//! in front of every cell.

use serde::{Deserialize, Serialize};

/// Group separator (GS, ASCII 29).
pub const GROUP_SEPARATOR: char = '\u{1d}';

/// Record separator (RS, ASCII 30).
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// File separator (FS, ASCII 28).
pub const FILE_SEPARATOR: char = '\u{1c}';

/// Unit separator (US, ASCII 31).
pub const UNIT_SEPARATOR: char = '\u{1f}';

/// End of transmission (EOT, ASCII 4).
pub const END_OF_TRANSMISSION: char = '\u{04}';

/// Carriage return.
pub const CARRIAGE_RETURN: char = '\r';

/// Line feed.
pub const LINE_FEED: char = '\n';

/// Delimiter between cells of a calibration barcode.
pub const DELIMITER: char = ' ';

/// Marker reported in front of the spacing character of a dead key.
pub const DEAD_KEY_SENTINEL: char = '\0';

/// First character of an AIM symbology identifier.
pub const AIM_FLAG: char = ']';

/// Characters that may appear in recognized unique-identifier elements.
pub const INVARIANT_CHARACTERS: &str =
	"!\"%&'()*+,-./0123456789:;<=>?ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Printable ASCII characters that are not invariant (space excluded).
pub const NON_INVARIANT_CHARACTERS: &str = "#$@[\\]^`{|}~";

/// The role of a control character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Separator {
	Group,
	Record,
	File,
	Unit,
	EndOfTransmission,
	CarriageReturn,
}

impl Separator {
	/// Separators with a cell in the calibration barcode, in barcode order.
	pub const CELLS: [Separator; 5] = [
		Separator::Group,
		Separator::File,
		Separator::Unit,
		Separator::Record,
		Separator::EndOfTransmission,
	];

	/// The control character for this role.
	pub fn character(self) -> char {
		match self {
			Separator::Group => GROUP_SEPARATOR,
			Separator::Record => RECORD_SEPARATOR,
			Separator::File => FILE_SEPARATOR,
			Separator::Unit => UNIT_SEPARATOR,
			Separator::EndOfTransmission => END_OF_TRANSMISSION,
			Separator::CarriageReturn => CARRIAGE_RETURN,
		}
	}

	/// The role of a control character, if it has one.
	pub fn from_char(c: char) -> Option<Self> {
		match c {
			GROUP_SEPARATOR => Some(Separator::Group),
			RECORD_SEPARATOR => Some(Separator::Record),
			FILE_SEPARATOR => Some(Separator::File),
			UNIT_SEPARATOR => Some(Separator::Unit),
			END_OF_TRANSMISSION => Some(Separator::EndOfTransmission),
			CARRIAGE_RETURN => Some(Separator::CarriageReturn),
			_ => None,
		}
	}

	/// Human readable name.
	pub fn name(self) -> &'static str {
		match self {
			Separator::Group => "group separator",
			Separator::Record => "record separator",
			Separator::File => "file separator",
			Separator::Unit => "unit separator",
			Separator::EndOfTransmission => "end-of-transmission",
			Separator::CarriageReturn => "carriage return",
		}
	}

	/// Priority when several characters are reported identically; lower wins.
	pub(crate) fn priority(self) -> u8 {
		match self {
			Separator::Group => 0,
			Separator::Record => 1,
			Separator::File => 2,
			Separator::Unit => 3,
			Separator::EndOfTransmission => 4,
			Separator::CarriageReturn => 5,
		}
	}
}

/// Classification of an expected character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacterClass {
	Invariant,
	NonInvariant,
	Separator(Separator),
}

impl CharacterClass {
	/// Classify a reference character.
	///
	/// Returns `None` for characters that are not part of the reference data.
	pub fn of(c: char) -> Option<Self> {
		if is_invariant(c) {
			Some(CharacterClass::Invariant)
		} else if NON_INVARIANT_CHARACTERS.contains(c) {
			Some(CharacterClass::NonInvariant)
		} else {
			Separator::from_char(c).map(CharacterClass::Separator)
		}
	}
}

/// Check if a character is invariant.
pub fn is_invariant(c: char) -> bool {
	c != DELIMITER && INVARIANT_CHARACTERS.contains(c)
}

/// Check if a character is a printable reference character (space excluded).
pub fn is_printable(c: char) -> bool {
	c != DELIMITER && (INVARIANT_CHARACTERS.contains(c) || NON_INVARIANT_CHARACTERS.contains(c))
}

/// All cells of the baseline barcode in order.
pub fn baseline_cells() -> Vec<char> {
	INVARIANT_CHARACTERS
		.chars()
		.chain(NON_INVARIANT_CHARACTERS.chars())
		.chain(Separator::CELLS.iter().map(|s| s.character()))
		.collect()
}

/// One physical barcode of a (possibly segmented) calibration round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarcodeSegment {
	/// The data to encode in the barcode.
	pub text: String,

	/// The expected characters of the cells in this segment.
	pub cells: Vec<char>,
}

/// Lay out the baseline barcode.
///
/// With `capacity` set, the barcode is split into segments of at most that many characters.
pub fn baseline_barcode(capacity: Option<usize>) -> Vec<BarcodeSegment> {
	layout(None, &baseline_cells(), capacity)
}

/// Lay out a probe barcode that puts `prefix` in front of every cell.
pub fn probe_barcode(prefix: char, cells: &[char], capacity: Option<usize>) -> Vec<BarcodeSegment> {
	layout(Some(prefix), cells, capacity)
}

fn layout(prefix: Option<char>, cells: &[char], capacity: Option<usize>) -> Vec<BarcodeSegment> {
	let cell_length = if prefix.is_some() { 3 } else { 2 };
	let mut segments = Vec::new();
	let mut current = BarcodeSegment {
		text: DELIMITER.to_string(),
		cells: Vec::new(),
	};

	for &cell in cells {
		if let Some(capacity) = capacity {
			let length = current.text.chars().count();
			if !current.cells.is_empty() && length + cell_length > capacity {
				segments.push(std::mem::replace(&mut current, BarcodeSegment {
					text: DELIMITER.to_string(),
					cells: Vec::new(),
				}));
			}
		}
		if let Some(prefix) = prefix {
			current.text.push(prefix);
		}
		current.text.push(cell);
		current.text.push(DELIMITER);
		current.cells.push(cell);
	}

	if !current.cells.is_empty() || segments.is_empty() {
		segments.push(current);
	}
	segments
}
