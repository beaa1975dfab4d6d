//! The calibration state machine.
//!
//! A calibration is a short conversation between the application and the scanner user.
//! The calibrator hands out a [`CalibrationToken`] carrying the barcode to scan,
//! the application feeds the reported characters back together with the token,
//! and receives the next token. This repeats until the token is complete.
//!
//! The first round scans the baseline barcode.
//! Every dead key found in the baseline is then probed with a barcode that puts the dead key
//! character in front of every detected character.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ambiguity;
use crate::calibration_data::{CalibrationData, DeadKeyTable, KeyboardScript};
use crate::config::CalibrationConfig;
use crate::environment;
use crate::information::{describe, Diagnostics, Information, InformationType};
use crate::mapping::{split_scan, CellReport, Mapping, TailTokens};
use crate::reference::{self, BarcodeSegment, DEAD_KEY_SENTINEL, DELIMITER};

/// The operating system the application runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
	#[default]
	Windows,
	Macintosh,
	Linux,
	Other,
}

/// What the application knows about the circumstances of a scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanHints {
	/// State of Caps Lock, if the application can tell.
	pub caps_lock: Option<bool>,

	pub platform: Platform,

	/// Time between the first and last reported character.
	pub elapsed: Option<Duration>,
}

/// A dead key found in the baseline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeadKeyPrefix {
	/// The expected character whose keystroke is a dead key.
	pub expected: char,

	/// The sentinel and spacing character reported for it.
	pub reported: String,
}

/// Where a calibration is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalibrationState {
	/// Waiting for the baseline barcode.
	AwaitingBaseline,

	/// Waiting for the probe barcode of a dead key.
	AwaitingProbe {
		prefix: DeadKeyPrefix,
		remaining: Vec<DeadKeyPrefix>,
	},

	/// Finished, the calibration data is available.
	Complete,

	/// Finished with at least one error.
	Failed,
}

/// Details about the scanner configuration gathered during calibration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedData {
	pub keyboard_script: KeyboardScript,
	pub prefix: String,
	pub suffix: String,

	/// Slowest scan seen so far.
	pub elapsed: Option<Duration>,
}

/// State carried from the baseline to the end of the calibration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct BaselineContext {
	lead: Vec<char>,
	tail: Vec<char>,
	probe_cells: Vec<char>,
}

/// One step of a calibration.
///
/// A default constructed token is not part of any calibration and is rejected by [`Calibrator::calibrate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalibrationToken {
	step: usize,
	state: Option<CalibrationState>,
	round: Vec<BarcodeSegment>,
	received: Vec<Vec<char>>,
	data: Option<CalibrationData>,
	diagnostics: Diagnostics,
	extended: ExtendedData,
	context: Option<BaselineContext>,
}

impl CalibrationToken {
	/// Number of scans processed so far.
	pub fn step(&self) -> usize {
		self.step
	}

	pub fn state(&self) -> Option<&CalibrationState> {
		self.state.as_ref()
	}

	/// The character being probed, or an empty string for the baseline.
	pub fn segment_key(&self) -> String {
		match &self.state {
			Some(CalibrationState::AwaitingProbe { prefix, .. }) => prefix.expected.to_string(),
			_ => String::new(),
		}
	}

	/// 1-based index of the barcode to scan within the current round.
	pub fn segment_index(&self) -> usize {
		self.received.len() + 1
	}

	/// Number of barcodes in the current round.
	pub fn segment_count(&self) -> usize {
		self.round.len()
	}

	/// The data to encode in the barcode the user should scan next.
	pub fn barcode_data(&self) -> Option<&str> {
		self.round.get(self.received.len()).map(|segment| segment.text.as_str())
	}

	/// The calibration data built so far.
	///
	/// Only final once the token is complete, and `None` after a failure.
	pub fn data(&self) -> Option<&CalibrationData> {
		self.data.as_ref()
	}

	/// The calibration data, if the calibration completed without errors.
	pub fn into_calibration_data(self) -> Option<CalibrationData> {
		match self.state {
			Some(CalibrationState::Complete) => self.data,
			_ => None,
		}
	}

	pub fn diagnostics(&self) -> &Diagnostics {
		&self.diagnostics
	}

	pub fn errors(&self) -> &[Information] {
		&self.diagnostics.errors
	}

	pub fn warnings(&self) -> &[Information] {
		&self.diagnostics.warnings
	}

	pub fn information(&self) -> &[Information] {
		&self.diagnostics.information
	}

	pub fn extended_data(&self) -> &ExtendedData {
		&self.extended
	}

	/// Check if the calibration is over, successfully or not.
	pub fn is_complete(&self) -> bool {
		matches!(self.state, Some(CalibrationState::Complete | CalibrationState::Failed))
	}

	/// Check if the calibration completed without recording any error.
	pub fn is_usable(&self) -> bool {
		self.state == Some(CalibrationState::Complete) && self.diagnostics.errors.is_empty()
	}

	fn fail(mut self, kind: InformationType, description: impl Into<String>) -> Self {
		self.diagnostics.record(kind, description);
		self.into_failed()
	}

	fn into_failed(mut self) -> Self {
		for error in &self.diagnostics.errors {
			warn!("Calibration failed: {error}");
		}
		self.state = Some(CalibrationState::Failed);
		self.data = None;
		self.round.clear();
		self.received.clear();
		self.context = None;
		self
	}
}

/// Drives calibrations.
#[derive(Clone, Debug, Default)]
pub struct Calibrator {
	config: CalibrationConfig,
}

impl Calibrator {
	pub fn new(config: CalibrationConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &CalibrationConfig {
		&self.config
	}

	/// The token that starts a calibration.
	pub fn first_token(&self) -> CalibrationToken {
		CalibrationToken {
			state: Some(CalibrationState::AwaitingBaseline),
			round: reference::baseline_barcode(self.config.max_segment_length),
			..Default::default()
		}
	}

	/// Iterate over the tokens of a calibration, feeding scans back with [`CalibrationTokens::calibrate`].
	pub fn calibration_tokens(&self) -> CalibrationTokens<'_> {
		CalibrationTokens {
			calibrator: self,
			next: Some(self.first_token()),
			latest: None,
		}
	}

	/// Process the characters reported for the barcode of `token` and return the next token.
	///
	/// Each character is given as a Unicode scalar value.
	/// A complete token is returned unchanged.
	pub fn calibrate(&self, characters: &[u32], token: CalibrationToken, hints: &ScanHints) -> CalibrationToken {
		let mut token = match token.state {
			None => {
				let step = token.step + 1;
				return CalibrationToken {
					step,
					..Default::default()
				}
				.fail(InformationType::NoCalibrationTokenProvided, "no calibration in progress");
			},
			Some(CalibrationState::Complete | CalibrationState::Failed) => return token,
			Some(_) => token,
		};
		token.step += 1;

		environment::check_performance(hints.elapsed, self.config.performance_threshold(), &mut token.diagnostics);
		token.extended.elapsed = token.extended.elapsed.max(hints.elapsed);

		let reported: Option<Vec<char>> = characters.iter().map(|&c| char::from_u32(c)).collect();
		let Some(reported) = reported else {
			return token.fail(InformationType::UnrecognisedData, "reported data contains invalid characters");
		};
		debug!("Step {}: received {} characters", token.step, reported.len());

		token.received.push(reported);
		if token.received.len() < token.round.len() {
			debug!("Waiting for barcode {} of {}", token.segment_index(), token.segment_count());
			return token;
		}

		match token.state.clone() {
			Some(CalibrationState::AwaitingBaseline) => self.complete_baseline(token, hints),
			Some(CalibrationState::AwaitingProbe { prefix, remaining }) => self.complete_probe(token, prefix, remaining),
			_ => token,
		}
	}

	fn complete_baseline(&self, mut token: CalibrationToken, hints: &ScanHints) -> CalibrationToken {
		let round = std::mem::take(&mut token.round);
		let received = std::mem::take(&mut token.received);

		let mut cells = Vec::new();
		let mut reports = Vec::new();
		let mut lead = Vec::new();
		let mut tail = Vec::new();
		for (index, (segment, reported)) in round.iter().zip(&received).enumerate() {
			let split = match split_scan(reported, &segment.cells, true, TailTokens::Detect) {
				Ok(split) => split,
				Err(kind) => return token.fail(kind, format!("baseline barcode {} of {}", index + 1, round.len())),
			};
			if index == 0 {
				lead = split.lead;
			}
			tail = split.tail;
			cells.extend_from_slice(&segment.cells);
			reports.extend(split.cells);
		}
		if lead.len() > self.config.max_prefix_length {
			return token.fail(
				InformationType::TooManyCharactersDetected,
				format!("{} characters before the barcode data", lead.len()),
			);
		}

		let mapping = Mapping::build(&cells, &reports);
		let diagnostics = &mut token.diagnostics;
		environment::report_undetected(&mapping, diagnostics);
		let case_conversion = environment::detect_case(&mapping);
		environment::report_case(case_conversion, hints, diagnostics);
		let keyboard_script = environment::detect_script(&mapping, diagnostics);
		token.extended.keyboard_script = keyboard_script;

		let mut inverse_map = ambiguity::resolve_keys(&mapping, case_conversion, diagnostics);
		let ligatures = ambiguity::resolve_sequences(&mapping, &inverse_map, diagnostics);
		ambiguity::classify_dead_key_prefixes(&mapping, diagnostics);
		environment::report_layout_differences(&mapping, case_conversion, diagnostics);

		let mut character_map = BTreeMap::new();
		let mut unassigned = std::collections::BTreeSet::new();
		let mut prefixes: Vec<DeadKeyPrefix> = Vec::new();
		for (expected, report) in &mapping.reports {
			match report {
				CellReport::Single(reported) => {
					character_map.insert(*expected, *reported);
				},
				CellReport::Undetected => {
					unassigned.insert(*expected);
				},
				CellReport::DeadKey(reported) => {
					if !prefixes.iter().any(|prefix| prefix.reported == *reported) {
						prefixes.push(DeadKeyPrefix {
							expected: *expected,
							reported: reported.clone(),
						});
					}
				},
				CellReport::Sequence(_) => (),
			}
		}
		character_map.insert(DELIMITER, DELIMITER);
		inverse_map.insert(DELIMITER, DELIMITER);

		let mut data = CalibrationData {
			character_map,
			inverse_map,
			ligatures,
			unassigned,
			case_conversion,
			keyboard_script,
			..Default::default()
		};
		environment::analyze_separators(&mapping, &mut data, diagnostics);
		for prefix in &prefixes {
			diagnostics.record(
				InformationType::DeadKeyDetected,
				format!("{} is a dead key reported as {}", prefix.expected, describe(prefix.reported.chars())),
			);
		}

		if token.diagnostics.has_errors() {
			return token.into_failed();
		}
		info!("Baseline processed, {} dead keys to probe", prefixes.len());

		token.context = Some(BaselineContext {
			lead,
			tail,
			probe_cells: mapping.detected_printable(),
		});
		token.data = Some(data);
		self.next_round(token, prefixes)
	}

	fn complete_probe(&self, mut token: CalibrationToken, prefix: DeadKeyPrefix, remaining: Vec<DeadKeyPrefix>) -> CalibrationToken {
		let round = std::mem::take(&mut token.round);
		let received = std::mem::take(&mut token.received);
		let prefix_chars: Vec<char> = prefix.reported.chars().collect();
		// Probes end with the same suffix and end-of-line as the baseline.
		let tail_delimiters = token.context
			.as_ref()
			.map_or(0, |context| context.tail.iter().filter(|&&c| c == DELIMITER).count());

		let mut following = BTreeMap::new();
		let mut prefixed = 0;
		for (index, (segment, reported)) in round.iter().zip(&received).enumerate() {
			let split = match split_scan(reported, &segment.cells, false, TailTokens::Known(tail_delimiters)) {
				Ok(split) => split,
				Err(kind) => {
					return token.fail(
						kind,
						format!("probe barcode {} of {} for {}", index + 1, round.len(), prefix.expected),
					)
				},
			};
			for (&cell, reported) in segment.cells.iter().zip(&split.cells) {
				if !reported.starts_with(&prefix_chars) {
					continue;
				}
				prefixed += 1;
				let output: String = reported[prefix_chars.len()..].iter().collect();
				if !output.is_empty() {
					following.insert(cell, output);
				}
			}
		}
		if prefixed == 0 {
			return token.fail(
				InformationType::UnrecognisedData,
				format!("probe for {} does not contain the dead key", prefix.expected),
			);
		}

		let following = ambiguity::resolve_dead_key_outputs(prefix.expected, following, &mut token.diagnostics);
		if token.diagnostics.has_errors() {
			return token.into_failed();
		}
		debug!("Dead key {} combines with {} characters", prefix.expected, following.len());

		if let Some(data) = token.data.as_mut() {
			data.dead_keys.insert(prefix.reported.clone(), DeadKeyTable {
				expected: prefix.expected,
				following,
			});
		}
		self.next_round(token, remaining)
	}

	/// Request the probe for the next dead key, or finish.
	fn next_round(&self, mut token: CalibrationToken, mut prefixes: Vec<DeadKeyPrefix>) -> CalibrationToken {
		if prefixes.is_empty() {
			return self.finish(token);
		}
		let prefix = prefixes.remove(0);
		let cells = token.context.as_ref().map(|context| context.probe_cells.clone()).unwrap_or_default();
		let spacing = prefix.reported.chars().nth(1).unwrap_or(DEAD_KEY_SENTINEL);
		info!("Probing dead key {} ({})", prefix.expected, spacing);

		token.round = reference::probe_barcode(prefix.expected, &cells, self.config.max_segment_length);
		token.received.clear();
		token.state = Some(CalibrationState::AwaitingProbe {
			prefix,
			remaining: prefixes,
		});
		token
	}

	fn finish(&self, mut token: CalibrationToken) -> CalibrationToken {
		let Some(mut data) = token.data.take() else {
			return token.fail(InformationType::UnrecognisedData, "no calibration data");
		};
		let context = token.context.take().unwrap_or_default();

		ambiguity::classify_cross_prefix(&data.dead_keys, &mut token.diagnostics);
		environment::analyze_boundaries(&context.lead, &context.tail, &mut data, &mut token.diagnostics);
		token.extended.prefix = data.prefix.clone();
		token.extended.suffix = data.suffix.clone();

		if token.diagnostics.has_errors() {
			return token.into_failed();
		}
		if !data.is_invertible() {
			let missing = data.non_invertible();
			return token.fail(InformationType::UndetectedInvariantCharacters, describe(missing));
		}

		info!(
			"Calibration complete with {} warnings, {} dead keys, {} ligatures",
			token.diagnostics.warnings.len(),
			data.dead_keys.len(),
			data.ligatures.len(),
		);
		token.state = Some(CalibrationState::Complete);
		token.data = Some(data);
		token
	}
}

/// The tokens of one calibration.
///
/// The iterator yields the next token to process until the calibration is complete.
pub struct CalibrationTokens<'a> {
	calibrator: &'a Calibrator,
	next: Option<CalibrationToken>,
	latest: Option<CalibrationToken>,
}

impl CalibrationTokens<'_> {
	/// Process a scan and queue the resulting token.
	pub fn calibrate(&mut self, characters: &[u32], token: CalibrationToken, hints: &ScanHints) -> CalibrationToken {
		let token = self.calibrator.calibrate(characters, token, hints);
		self.next = if token.is_complete() { None } else { Some(token.clone()) };
		self.latest = Some(token.clone());
		token
	}

	/// The most recent token returned by [`Self::calibrate`].
	pub fn latest(&self) -> Option<&CalibrationToken> {
		self.latest.as_ref()
	}
}

impl Iterator for CalibrationTokens<'_> {
	type Item = CalibrationToken;

	fn next(&mut self) -> Option<CalibrationToken> {
		self.next.take()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn codes(text: &str) -> Vec<u32> {
		text.chars().map(|c| c as u32).collect()
	}

	/// What a computer with a matching keyboard layout reports.
	fn identity_scan(token: &CalibrationToken) -> Vec<u32> {
		codes(&format!("]d1{}\r", token.barcode_data().unwrap()))
	}

	#[test]
	fn identity_layout_completes_in_one_step() {
		let calibrator = Calibrator::default();
		let token = calibrator.first_token();
		assert_eq!(token.segment_count(), 1);
		let scan = identity_scan(&token);
		let token = calibrator.calibrate(&scan, token, &ScanHints::default());
		assert_eq!(token.state(), Some(&CalibrationState::Complete));
		assert_eq!(token.step(), 1);
		assert!(token.is_usable());
		assert!(token.errors().is_empty(), "{:?}", token.errors());
		assert!(token.warnings().is_empty(), "{:?}", token.warnings());
		assert_eq!(token.data(), Some(&CalibrationData::identity()));
	}

	#[test]
	fn default_token_is_rejected() {
		let token = Calibrator::default().calibrate(&codes(" a \r"), CalibrationToken::default(), &ScanHints::default());
		assert!(token.is_complete());
		assert_eq!(token.errors()[0].kind, InformationType::NoCalibrationTokenProvided);
		assert!(token.data().is_none());
	}

	#[test]
	fn terminal_tokens_are_returned_unchanged() {
		let calibrator = Calibrator::default();
		let failed = calibrator.calibrate(&[], calibrator.first_token(), &ScanHints::default());
		assert_eq!(failed.state(), Some(&CalibrationState::Failed));
		assert_eq!(failed.errors()[0].kind, InformationType::NoCalibrationDataReported);
		assert!(!failed.is_usable());
		let again = calibrator.calibrate(&codes(" a \r"), failed.clone(), &ScanHints::default());
		assert_eq!(again, failed);
	}

	#[test]
	fn invalid_scalar_values() {
		let calibrator = Calibrator::default();
		let token = calibrator.calibrate(&[0xD800], calibrator.first_token(), &ScanHints::default());
		assert_eq!(token.errors()[0].kind, InformationType::UnrecognisedData);
	}

	#[test]
	fn segmented_baseline() {
		let calibrator = Calibrator::new(CalibrationConfig {
			max_segment_length: Some(100),
			..Default::default()
		});
		let mut token = calibrator.first_token();
		assert_eq!(token.segment_count(), 3);
		for index in 1..=3 {
			assert_eq!(token.segment_index(), index);
			let scan = identity_scan(&token);
			token = calibrator.calibrate(&scan, token, &ScanHints::default());
		}
		assert_eq!(token.step(), 3);
		assert_eq!(token.into_calibration_data(), Some(CalibrationData::identity()));
	}

	#[test]
	fn slow_scans_are_reported() {
		let calibrator = Calibrator::default();
		let token = calibrator.first_token();
		let scan = identity_scan(&token);
		let hints = ScanHints {
			elapsed: Some(Duration::from_millis(1500)),
			..Default::default()
		};
		let token = calibrator.calibrate(&scan, token, &hints);
		assert_eq!(token.state(), Some(&CalibrationState::Complete));
		assert_eq!(token.warnings()[0].kind, InformationType::SubOptimalScannerKeyboardPerformance);
		assert_eq!(token.extended_data().elapsed, Some(Duration::from_millis(1500)));
	}

	#[test]
	fn token_iterator() {
		let calibrator = Calibrator::default();
		let mut tokens = calibrator.calibration_tokens();
		let mut count = 0;
		while let Some(token) = tokens.next() {
			let scan = identity_scan(&token);
			tokens.calibrate(&scan, token, &ScanHints::default());
			count += 1;
		}
		assert_eq!(count, 1);
		assert!(tokens.latest().unwrap().is_complete());
	}
}
