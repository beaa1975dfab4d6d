#![allow(dead_code)]

//! Simulated keyboard layouts and scanners.
//!
//! A scanner types every character of a barcode as the key that produces it on a US keyboard.
//! The layout decides what the computer reports for that key.

use std::collections::BTreeMap;

use barcode_scanner_calibration::{CalibrationToken, Calibrator, ScanHints};

/// What a layout does with the key for an expected character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
	/// Reports these characters.
	Char(String),

	/// A dead key with this spacing character.
	Dead(char),

	/// Reports nothing.
	Unmapped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Case {
	Normal,
	Inverted,
	Upper,
}

#[derive(Clone, Debug)]
pub struct Layout {
	keys: BTreeMap<char, Key>,
	compose: BTreeMap<(char, char), char>,
	case: Case,
}

impl Layout {
	pub fn united_states() -> Self {
		Self {
			keys: BTreeMap::new(),
			compose: BTreeMap::new(),
			case: Case::Normal,
		}
	}

	pub fn with(mut self, expected: char, key: Key) -> Self {
		self.keys.insert(expected, key);
		self
	}

	pub fn with_chars(mut self, pairs: &[(char, char)]) -> Self {
		for &(expected, reported) in pairs {
			self.keys.insert(expected, Key::Char(reported.to_string()));
		}
		self
	}

	pub fn with_case(mut self, case: Case) -> Self {
		self.case = case;
		self
	}

	fn compose(mut self, dead: char, base: &str, composed: &str) -> Self {
		for (base, composed) in base.chars().zip(composed.chars()) {
			self.compose.insert((dead, base), composed);
		}
		self
	}

	fn key(&self, c: char) -> Key {
		let key = self.keys.get(&c).cloned().unwrap_or_else(|| Key::Char(c.to_string()));
		match (key, self.case) {
			(Key::Char(s), Case::Inverted) => Key::Char(s.chars().map(swap_case).collect()),
			(Key::Char(s), Case::Upper) => Key::Char(s.chars().map(|c| c.to_ascii_uppercase()).collect()),
			(key, _) => key,
		}
	}

	/// What the computer reports when `text` is typed.
	///
	/// A dead key reports a NUL followed by its spacing character, then the composition result.
	pub fn type_text(&self, text: &str) -> String {
		let mut reported = String::new();
		let mut pending: Option<char> = None;
		for c in text.chars() {
			match (pending, self.key(c)) {
				(_, Key::Unmapped) => (),
				(None, Key::Dead(spacing)) => {
					reported.push('\0');
					reported.push(spacing);
					pending = Some(spacing);
				},
				(Some(dead), Key::Dead(spacing)) => {
					reported.push(dead);
					reported.push(spacing);
					pending = None;
				},
				(None, Key::Char(s)) => reported.push_str(&s),
				(Some(dead), Key::Char(s)) => {
					pending = None;
					let mut chars = s.chars();
					match (chars.next(), chars.next()) {
						(Some(base), None) => match self.compose.get(&(dead, base)) {
							Some(&composed) => reported.push(composed),
							None if base == ' ' => reported.push(dead),
							None => {
								reported.push(dead);
								reported.push(base);
							},
						},
						_ => {
							reported.push(dead);
							reported.push_str(&s);
						},
					}
				},
			}
		}
		reported
	}
}

fn swap_case(c: char) -> char {
	if c.is_ascii_lowercase() {
		c.to_ascii_uppercase()
	} else {
		c.to_ascii_lowercase()
	}
}

pub fn german() -> Layout {
	Layout::united_states()
		.with_chars(&[
			('y', 'z'), ('z', 'y'), ('Y', 'Z'), ('Z', 'Y'),
			('"', 'Ä'), ('&', '/'), ('\'', 'ä'), ('(', ')'), (')', '='), ('*', '('), ('-', 'ß'), ('/', '-'),
			(':', 'Ö'), (';', 'ö'), ('<', ';'), ('>', ':'), ('?', '_'), ('_', '?'),
			('#', '§'), ('@', '"'), ('[', 'ü'), ('\\', '#'), (']', '+'), ('^', '&'), ('{', 'Ü'), ('|', '\''),
			('}', '*'), ('~', '°'),
		])
		.with('+', Key::Dead('`'))
		.with('=', Key::Dead('´'))
		.with('`', Key::Dead('^'))
		.compose('`', "aeiouAEIOU", "àèìòùÀÈÌÒÙ")
		.compose('´', "aeiouyAEIOUY", "áéíóúýÁÉÍÓÚÝ")
		.compose('^', "aeiouAEIOU", "âêîôûÂÊÎÔÛ")
}

pub fn belgian_french() -> Layout {
	Layout::united_states()
		.with_chars(&[
			('1', '&'), ('2', 'é'), ('3', '"'), ('4', '\''), ('5', '('),
			('6', '§'), ('7', 'è'), ('8', '!'), ('9', 'ç'), ('0', 'à'),
			('!', '1'), ('@', '2'), ('#', '3'), ('$', '4'), ('%', '5'),
			('^', '6'), ('&', '7'), ('*', '8'), ('(', '9'), (')', '0'),
			('-', ')'), ('_', '°'), ('=', '-'), ('+', '_'), (']', '$'), ('}', '*'), ('\\', 'µ'), ('|', '£'),
			(';', 'm'), (':', 'M'), ('\'', 'ù'), ('"', '%'), ('`', '²'), ('~', '³'),
			(',', ';'), ('<', '.'), ('.', ':'), ('>', '/'), ('/', '='), ('?', '+'),
			('a', 'q'), ('q', 'a'), ('A', 'Q'), ('Q', 'A'), ('z', 'w'), ('w', 'z'), ('Z', 'W'), ('W', 'Z'),
			('m', ','), ('M', '?'),
		])
		.with('[', Key::Dead('^'))
		.with('{', Key::Dead('¨'))
		.compose('^', "aeiouAEIOU", "âêîôûÂÊÎÔÛ")
		.compose('¨', "aeiouyAEIOU", "äëïöüÿÄËÏÖÜ")
}

/// Greek layout, where both S and W produce a capital sigma.
pub fn greek() -> Layout {
	let mut layout = Layout::united_states()
		.with_chars(&[('q', ';'), ('Q', ':')])
		.with(';', Key::Dead('΄'))
		.with(':', Key::Dead('¨'));
	let pairs = [
		("abcdefghijklmnoprstuvwxyz", "αβψδεφγηιξκλμνοπρστθωςχυζ"),
		("ABCDEFGHIJKLMNOPRSTUVWXYZ", "ΑΒΨΔΕΦΓΗΙΞΚΛΜΝΟΠΡΣΤΘΩΣΧΥΖ"),
	];
	for (latin, greek) in pairs {
		for (expected, reported) in latin.chars().zip(greek.chars()) {
			layout = layout.with(expected, Key::Char(reported.to_string()));
		}
	}
	layout
}

/// A keyboard-wedge scanner connected to a computer with some layout.
#[derive(Clone, Debug)]
pub struct Scanner {
	pub layout: Layout,
	pub prefix: String,
	pub suffix: String,
	pub transmit_aim: bool,
	pub end_of_line: String,
}

impl Scanner {
	pub fn new(layout: Layout) -> Self {
		Self {
			layout,
			prefix: String::new(),
			suffix: String::new(),
			transmit_aim: true,
			end_of_line: "\r".to_string(),
		}
	}

	/// What the computer reports for a barcode.
	pub fn scan(&self, aim: &str, data: &str) -> String {
		let aim = if self.transmit_aim { aim } else { "" };
		let typed = format!("{}{aim}{data}{}", self.prefix, self.suffix);
		format!("{}{}", self.layout.type_text(&typed), self.end_of_line)
	}

	pub fn scan_sample(&self, sample: &Sample) -> String {
		self.scan(sample.aim, sample.data)
	}
}

pub fn codes(text: &str) -> Vec<u32> {
	text.chars().map(u32::from).collect()
}

/// Run a whole calibration with a simulated scanner.
pub fn calibrate(scanner: &Scanner, calibrator: &Calibrator, hints: &ScanHints) -> CalibrationToken {
	let mut tokens = calibrator.calibration_tokens();
	let mut last = None;
	while let Some(token) = tokens.next() {
		let data = token.barcode_data().expect("token without barcode data").to_string();
		let reported = scanner.scan("]d1", &data);
		last = Some(tokens.calibrate(&codes(&reported), token, hints));
	}
	last.expect("calibration without tokens")
}

/// A barcode to scan: the AIM identifier of its symbology and its data.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
	pub aim: &'static str,
	pub data: &'static str,
}

pub const SAMPLES: [Sample; 12] = [
	Sample { aim: "]d2", data: "01050123456789001725053110ABC123\u{1d}21SN0001" },
	Sample { aim: "]d2", data: "0104006381333931211234abcdXYZ\u{1d}10L-42/7\u{1d}17261200" },
	Sample { aim: "]d2", data: "01095011015300031728022910yz+=Q" },
	Sample {
		aim: "]d1",
		data: "[)>\u{1e}06\u{1d}9N110375286414\u{1d}1T12345ABCD\u{1d}D150617\u{1d}S12345ABCDEF98765\u{1e}\u{04}",
	},
	Sample {
		aim: "]d1",
		data: "[)>\u{1e}05\u{1d}0105012345678900\u{1d}21Q9W8E7\u{1d}10M&M'S\u{1d}17270100\u{1e}\u{04}",
	},
	Sample { aim: "]d1", data: "9N110375286414\u{1d}D251231\u{1d}1TABC[1]\u{1d}S{SER}" },
	Sample { aim: "]Q3", data: "01040063813339311725113021aBcDeF" },
	Sample { aim: "]d2", data: "0109501101530003710ABC123\u{1d}210001\u{1d}10B1" },
	Sample { aim: "]d2", data: "010501234567890021qwertyuiop\u{1d}10asdfghjklzxcvbnm" },
	Sample {
		aim: "]d1",
		data: "[)>\u{1e}06\u{1d}9N111234567842\u{1d}1TX-1/2\u{1d}14D20291015\u{1d}Sser.no:7\u{1e}\u{04}",
	},
	Sample { aim: "]C1", data: "010400638133393110%&()*\u{1d}21<>;:?" },
	Sample { aim: "]e0", data: "01095011015300031729123121_!\"'," },
];
