//! Alignment of reported characters against the cells of a calibration barcode.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::information::InformationType;
use crate::reference::{self, CharacterClass, DEAD_KEY_SENTINEL, DELIMITER};

/// What was reported for a single cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CellReport {
	/// Nothing was reported.
	Undetected,

	/// A single character.
	Single(char),

	/// A dead key, identified by the sentinel and its spacing character.
	DeadKey(String),

	/// A sequence of characters.
	Sequence(String),
}

/// A reported scan split into the text before the cells, the cells, and the text after them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SplitScan {
	/// Prefix and AIM identifier.
	pub lead: Vec<char>,

	/// Reported text per cell.
	pub cells: Vec<Vec<char>>,

	/// Suffix and end-of-line.
	pub tail: Vec<char>,
}

/// How the text after the last cell is found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TailTokens {
	/// Choose the split that leaves the most cells reported as themselves.
	Detect,

	/// The tail holds this many delimiters.
	Known(usize),
}

/// Split the reported characters of one barcode into one report per cell of `cells`.
///
/// Surplus tokens at the start are part of the lead.
/// When the tail may hold delimiters as well, every split is tried and the one with the most
/// cells reported unchanged wins; a tie means the scan can not be aligned.
/// In a baseline scan a dead key composes with the delimiter that follows it,
/// which is handled when `dead_keys_consume_delimiter` is set.
pub(crate) fn split_scan(
	reported: &[char],
	cells: &[char],
	dead_keys_consume_delimiter: bool,
	tail_tokens: TailTokens,
) -> Result<SplitScan, InformationType> {
	if reported.is_empty() {
		return Err(InformationType::NoCalibrationDataReported);
	}
	if !reported.contains(&DELIMITER) {
		return Err(InformationType::NoDelimiters);
	}

	let spans = tokens(reported, dead_keys_consume_delimiter);
	let cell_count = cells.len();
	if spans.len() < cell_count + 2 {
		return Err(InformationType::UnrecognisedData);
	}
	let tail_tokens = match tail_tokens {
		TailTokens::Detect => detect_tail_tokens(reported, &spans, cells)?,
		TailTokens::Known(delimiters) if spans.len() > cell_count + delimiters + 1 => delimiters + 1,
		TailTokens::Known(_) => return Err(InformationType::UnrecognisedData),
	};

	let first_cell = spans.len() - cell_count - tail_tokens;
	let lead_end = spans[first_cell - 1].end;
	let tail_start = spans[first_cell + cell_count].start;
	Ok(SplitScan {
		lead: reported[..lead_end].to_vec(),
		cells: spans[first_cell..first_cell + cell_count]
			.iter()
			.map(|span| reported[span.clone()].to_vec())
			.collect(),
		tail: reported[tail_start..].to_vec(),
	})
}

fn detect_tail_tokens(reported: &[char], spans: &[Range<usize>], cells: &[char]) -> Result<usize, InformationType> {
	let candidates = spans.len() - cells.len() - 1;
	if candidates == 1 {
		return Ok(1);
	}

	let unchanged = |tail_tokens: usize| {
		let first_cell = spans.len() - cells.len() - tail_tokens;
		cells.iter()
			.zip(&spans[first_cell..])
			.filter(|(expected, span)| matches!(&reported[(*span).clone()], [c] if c.eq_ignore_ascii_case(*expected)))
			.count()
	};
	let scores: Vec<(usize, usize)> = (1..=candidates).map(|tail_tokens| (tail_tokens, unchanged(tail_tokens))).collect();
	let best = scores.iter().map(|&(_, score)| score).max().unwrap_or(0);
	let mut winners = scores.iter().filter(|&&(_, score)| score == best);
	match (winners.next(), winners.next()) {
		(Some(&(tail_tokens, _)), None) if best > 0 => Ok(tail_tokens),
		_ => Err(InformationType::UnrecognisedData),
	}
}

fn tokens(reported: &[char], dead_keys_consume_delimiter: bool) -> Vec<Range<usize>> {
	let mut spans = Vec::new();
	let mut start = 0;
	let mut i = 0;
	while i < reported.len() {
		let c = reported[i];
		if c == DELIMITER {
			spans.push(start..i);
			i += 1;
			start = i;
		} else if dead_keys_consume_delimiter
			&& c == DEAD_KEY_SENTINEL
			&& i + 2 < reported.len()
			&& reported[i + 1] != DELIMITER
			&& reported[i + 2] == reported[i + 1]
		{
			// The dead key and the delimiter produced the spacing character.
			spans.push(start..i + 3);
			i += 3;
			start = i;
		} else {
			i += 1;
		}
	}
	spans.push(start..reported.len());
	spans
}

impl CellReport {
	/// Interpret the reported text for the cell of `expected`.
	pub fn from_reported(expected: char, reported: &[char]) -> Self {
		let printable = reference::is_printable(expected);
		match reported {
			[] => CellReport::Undetected,
			[c] => CellReport::Single(*c),
			[DEAD_KEY_SENTINEL, spacing, ..] if printable => {
				CellReport::DeadKey([DEAD_KEY_SENTINEL, *spacing].iter().collect())
			},
			_ => CellReport::Sequence(reported.iter().collect()),
		}
	}
}

/// The provisional mapping built from a baseline scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Mapping {
	/// Expected character and report, in cell order.
	pub reports: Vec<(char, CellReport)>,
}

impl Mapping {
	/// Pair every expected cell with its reported text.
	pub fn build(cells: &[char], reported: &[Vec<char>]) -> Self {
		let reports = cells.iter()
			.zip(reported)
			.map(|(&expected, reported)| (expected, CellReport::from_reported(expected, reported)))
			.collect();
		Self { reports }
	}

	/// The report for an expected character.
	pub fn report(&self, expected: char) -> Option<&CellReport> {
		self.reports.iter()
			.find(|(c, _)| *c == expected)
			.map(|(_, report)| report)
	}

	/// Expected characters for every single reported character.
	pub fn single_candidates(&self) -> BTreeMap<char, Vec<char>> {
		let mut candidates: BTreeMap<char, Vec<char>> = BTreeMap::new();
		for (expected, report) in &self.reports {
			if let CellReport::Single(reported) = report {
				candidates.entry(*reported).or_default().push(*expected);
			}
		}
		candidates
	}

	/// Expected characters for every reported sequence.
	pub fn sequence_candidates(&self) -> BTreeMap<String, Vec<char>> {
		let mut candidates: BTreeMap<String, Vec<char>> = BTreeMap::new();
		for (expected, report) in &self.reports {
			if let CellReport::Sequence(reported) = report {
				candidates.entry(reported.clone()).or_default().push(*expected);
			}
		}
		candidates
	}

	/// Expected characters for every reported dead key.
	pub fn dead_key_candidates(&self) -> BTreeMap<String, Vec<char>> {
		let mut candidates: BTreeMap<String, Vec<char>> = BTreeMap::new();
		for (expected, report) in &self.reports {
			if let CellReport::DeadKey(prefix) = report {
				candidates.entry(prefix.clone()).or_default().push(*expected);
			}
		}
		candidates
	}

	/// Expected characters that were not reported at all, with their class.
	pub fn undetected(&self) -> impl Iterator<Item = (char, CharacterClass)> + '_ {
		self.reports.iter()
			.filter(|(_, report)| *report == CellReport::Undetected)
			.filter_map(|(c, _)| CharacterClass::of(*c).map(|class| (*c, class)))
	}

	/// Printable cells that were reported, in cell order.
	pub fn detected_printable(&self) -> Vec<char> {
		self.reports.iter()
			.filter(|(c, report)| reference::is_printable(*c) && *report != CellReport::Undetected)
			.map(|(c, _)| *c)
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chars(s: &str) -> Vec<char> {
		s.chars().collect()
	}

	#[test]
	fn splits_lead_cells_and_tail() {
		let split = split_scan(&chars("]d1 a b \u{1d} \r"), &['a', 'b', '\u{1d}'], true, TailTokens::Detect).unwrap();
		assert_eq!(split.lead, chars("]d1"));
		assert_eq!(split.cells, vec![chars("a"), chars("b"), chars("\u{1d}")]);
		assert_eq!(split.tail, chars("\r"));
	}

	#[test]
	fn surplus_tokens_belong_to_the_lead() {
		let split = split_scan(&chars("MY PREFIX a  \r"), &['a', '\u{4}'], true, TailTokens::Detect).unwrap();
		assert_eq!(split.lead, chars("MY PREFIX"));
		assert_eq!(split.cells, vec![chars("a"), vec![]]);
	}

	#[test]
	fn tail_with_delimiters() {
		let cells = ['a', 'b', 'c'];
		let split = split_scan(&chars("]d1 a b c  END\r"), &cells, true, TailTokens::Detect).unwrap();
		assert_eq!(split.lead, chars("]d1"));
		assert_eq!(split.cells, vec![chars("a"), chars("b"), chars("c")]);
		assert_eq!(split.tail, chars(" END\r"));

		let split = split_scan(&chars("A B a b c \r"), &cells, true, TailTokens::Detect).unwrap();
		assert_eq!(split.lead, chars("A B"));
		assert_eq!(split.tail, chars("\r"));

		let split = split_scan(&chars(" \0^x \0^y \0^z  END\r"), &cells, false, TailTokens::Known(1)).unwrap();
		assert_eq!(split.cells, vec![chars("\0^x"), chars("\0^y"), chars("\0^z")]);
		assert_eq!(split.tail, chars(" END\r"));
	}

	#[test]
	fn ambiguous_alignment_fails() {
		assert_eq!(
			split_scan(&chars(" x y z  \r"), &['a', 'b', 'c'], true, TailTokens::Detect),
			Err(InformationType::UnrecognisedData),
		);
		assert_eq!(
			split_scan(&chars(" a b \r"), &['a', 'b'], true, TailTokens::Known(1)),
			Err(InformationType::UnrecognisedData),
		);
	}

	#[test]
	fn dead_key_consumes_its_delimiter() {
		let split = split_scan(&chars(" a \0^^b \r"), &['a', '[', 'b'], true, TailTokens::Detect).unwrap();
		assert_eq!(split.cells, vec![chars("a"), chars("\0^^"), chars("b")]);

		let split = split_scan(&chars(" \0^â \0^^1 \r"), &['a', '1'], false, TailTokens::Known(0)).unwrap();
		assert_eq!(split.cells, vec![chars("\0^â"), chars("\0^^1")]);
	}

	#[test]
	fn structural_failures() {
		let cells = ['a', 'b', 'c'];
		assert_eq!(split_scan(&[], &cells, true, TailTokens::Detect), Err(InformationType::NoCalibrationDataReported));
		assert_eq!(split_scan(&chars("abc"), &cells, true, TailTokens::Detect), Err(InformationType::NoDelimiters));
		assert_eq!(split_scan(&chars(" a b"), &cells, true, TailTokens::Detect), Err(InformationType::UnrecognisedData));
	}

	#[test]
	fn cell_reports() {
		assert_eq!(CellReport::from_reported('a', &[]), CellReport::Undetected);
		assert_eq!(CellReport::from_reported('a', &['q']), CellReport::Single('q'));
		assert_eq!(CellReport::from_reported('[', &chars("\0^^")), CellReport::DeadKey("\0^".to_string()));
		assert_eq!(CellReport::from_reported('\u{1d}', &chars("\0^^")), CellReport::Sequence("\0^^".to_string()));
		assert_eq!(CellReport::from_reported('\u{1d}', &chars("^]")), CellReport::Sequence("^]".to_string()));
	}

	#[test]
	fn candidates_group_by_report() {
		let mapping = Mapping::build(&['0', '#', 'a', '['], &[chars("0"), chars("0"), vec![], chars("\0^^")]);
		assert_eq!(mapping.single_candidates()[&'0'], vec!['0', '#']);
		assert_eq!(mapping.dead_key_candidates()["\0^"], vec!['[']);
		assert_eq!(mapping.undetected().collect::<Vec<_>>(), vec![('a', CharacterClass::Invariant)]);
		assert_eq!(mapping.detected_printable(), vec!['0', '#', '[']);
	}
}
