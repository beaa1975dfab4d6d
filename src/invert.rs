//! Translation of reported characters back to the characters encoded in the barcode.

use crate::calibration_data::CalibrationData;
use crate::reference::DEAD_KEY_SENTINEL;

/// One expected character recovered from reported data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct InvertedChar {
	/// The expected character, or `None` if the reported data could not be inverted.
	pub expected: Option<char>,

	/// Index of the first reported character this came from.
	///
	/// A character composed with a dead key starts right after the dead key.
	pub position: usize,
}

/// Inverts reported data using calibration data.
pub(crate) struct Inverter<'a> {
	data: &'a CalibrationData,

	/// Ligatures, longest first.
	ligatures: Vec<(Vec<char>, char)>,
}

impl<'a> Inverter<'a> {
	pub fn new(data: &'a CalibrationData) -> Self {
		let mut ligatures: Vec<(Vec<char>, char)> = data.ligatures
			.iter()
			.map(|(sequence, &expected)| (sequence.chars().collect(), expected))
			.collect();
		ligatures.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
		Self { data, ligatures }
	}

	pub fn invert(&self, reported: &[char]) -> Vec<InvertedChar> {
		let mut inverted = Vec::with_capacity(reported.len());
		let mut i = 0;
		while i < reported.len() {
			let position = i;
			let push = |inverted: &mut Vec<InvertedChar>, expected| inverted.push(InvertedChar { expected, position });

			if reported[i] == DEAD_KEY_SENTINEL {
				if let Some((spacing, table)) = reported.get(i + 1).and_then(|&spacing| {
					let prefix: String = [DEAD_KEY_SENTINEL, spacing].iter().collect();
					self.data.dead_keys.get(&prefix).map(|table| (spacing, table))
				}) {
					push(&mut inverted, Some(table.expected));
					if let Some((following, length)) = table.longest_match(&reported[i + 2..]) {
						inverted.push(InvertedChar {
							expected: Some(following),
							position: i + 2,
						});
						i += 2 + length;
					} else if reported.get(i + 2) == Some(&spacing) {
						// Nothing to combine with, the dead key produced its spacing character.
						i += 3;
					} else {
						i += 2;
					}
					continue;
				}
				push(&mut inverted, None);
				i += 1;
				continue;
			}

			if let Some((sequence, expected)) = self.ligatures.iter().find(|(sequence, _)| reported[i..].starts_with(sequence)) {
				push(&mut inverted, Some(*expected));
				i += sequence.len();
				continue;
			}

			push(&mut inverted, self.data.inverse_map.get(&reported[i]).copied());
			i += 1;
		}
		inverted
	}
}
