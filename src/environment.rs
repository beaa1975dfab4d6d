//! Analysis of the scanner and computer configuration around the reported characters.

use std::time::Duration;

use crate::calibration_data::{CalibrationData, CaseConversion, KeyboardScript};
use crate::calibrator::{Platform, ScanHints};
use crate::information::{describe, Diagnostics, InformationType};
use crate::invert::Inverter;
use crate::mapping::{CellReport, Mapping};
use crate::reference::{CharacterClass, Separator, AIM_FLAG, CARRIAGE_RETURN, LINE_FEED};

/// Detect a case conversion from the letter cells.
pub(crate) fn detect_case(mapping: &Mapping) -> CaseConversion {
	// (letters reported as a letter, letters reported in the other case)
	let mut lower = (0, 0);
	let mut upper = (0, 0);
	for (expected, report) in &mapping.reports {
		let CellReport::Single(reported) = report else { continue };
		if !expected.is_ascii_alphabetic() || !reported.eq_ignore_ascii_case(expected) {
			continue;
		}
		let count = if expected.is_ascii_lowercase() { &mut lower } else { &mut upper };
		count.0 += 1;
		if reported != expected {
			count.1 += 1;
		}
	}

	if lower.0 == 0 || upper.0 == 0 {
		return CaseConversion::None;
	}
	let lower_converted = lower.1 == lower.0;
	let upper_converted = upper.1 == upper.0;
	match (lower_converted, upper_converted) {
		(true, true) => CaseConversion::Invert,
		(true, false) if upper.1 == 0 => CaseConversion::ToUpper,
		(false, true) if lower.1 == 0 => CaseConversion::ToLower,
		_ => CaseConversion::None,
	}
}

/// Report what a case conversion says about the scanner and Caps Lock.
pub(crate) fn report_case(case: CaseConversion, hints: &ScanHints, diagnostics: &mut Diagnostics) {
	let macintosh = hints.platform == Platform::Macintosh;
	match case {
		CaseConversion::Invert => {
			let kind = match hints.caps_lock {
				Some(true) => InformationType::CapsLockOn,
				Some(false) => InformationType::ScannerMayInvertCase,
				None if macintosh => InformationType::ScannerMayInvertCase,
				None => InformationType::CapsLockProbablyOn,
			};
			diagnostics.record(kind, "letters are reported in inverted case");
		},
		CaseConversion::ToUpper => {
			// Caps Lock on a Macintosh only affects letters, which explains the conversion.
			let caps_lock = hints.caps_lock == Some(true);
			if !(caps_lock && macintosh) {
				diagnostics.record(InformationType::ScannerMayConvertToUpperCase, "letters are reported in upper case");
			}
			if caps_lock {
				diagnostics.record(InformationType::CapsLockOn, "letters are reported in upper case");
			}
		},
		CaseConversion::ToLower => {
			diagnostics.record(InformationType::ScannerMayConvertToLowerCase, "letters are reported in lower case");
		},
		CaseConversion::None => {
			if hints.caps_lock == Some(true) {
				diagnostics.record(InformationType::ScannerMayCompensateForCapsLock, "Caps Lock is on");
			}
		},
	}
}

/// Determine the script of the letters the keyboard layout produces.
pub(crate) fn detect_script(mapping: &Mapping, diagnostics: &mut Diagnostics) -> KeyboardScript {
	let mut counts: Vec<(KeyboardScript, usize)> = Vec::new();
	for (expected, report) in &mapping.reports {
		let CellReport::Single(reported) = report else { continue };
		if !expected.is_ascii_alphabetic() {
			continue;
		}
		let Some(script) = KeyboardScript::of(*reported) else { continue };
		match counts.iter_mut().find(|(s, _)| *s == script) {
			Some((_, count)) => *count += 1,
			None => counts.push((script, 1)),
		}
	}

	let script = counts.iter()
		.fold(None, |best: Option<(KeyboardScript, usize)>, &(script, count)| match best {
			Some((_, best_count)) if best_count >= count => best,
			_ => Some((script, count)),
		})
		.map_or(KeyboardScript::Latin, |(script, _)| script);
	diagnostics.record(InformationType::KeyboardScript, format!("{script:?}"));
	script
}

/// Warn when the scanner took too long to deliver a barcode.
pub(crate) fn check_performance(elapsed: Option<Duration>, threshold: Duration, diagnostics: &mut Diagnostics) {
	if let Some(elapsed) = elapsed.filter(|&elapsed| elapsed > threshold) {
		diagnostics.record(
			InformationType::SubOptimalScannerKeyboardPerformance,
			format!("scanning took {} ms", elapsed.as_millis()),
		);
	}
}

/// Report expected characters that were not reported at all.
pub(crate) fn report_undetected(mapping: &Mapping, diagnostics: &mut Diagnostics) {
	let mut invariant = Vec::new();
	let mut non_invariant = Vec::new();
	for (c, class) in mapping.undetected() {
		match class {
			CharacterClass::Invariant => invariant.push(c),
			CharacterClass::NonInvariant => non_invariant.push(c),
			CharacterClass::Separator(_) => (),
		}
	}
	if !invariant.is_empty() {
		diagnostics.record(InformationType::UndetectedInvariantCharacters, describe(invariant));
	}
	if !non_invariant.is_empty() {
		diagnostics.record(InformationType::NonInvariantCharactersUnreported, describe(non_invariant));
	}
}

/// Warn when invariant characters are reported as something else.
pub(crate) fn report_layout_differences(mapping: &Mapping, case: CaseConversion, diagnostics: &mut Diagnostics) {
	let differing: Vec<char> = mapping.reports.iter()
		.filter(|(expected, _)| CharacterClass::of(*expected) == Some(CharacterClass::Invariant))
		.filter(|(expected, report)| match report {
			CellReport::Undetected => false,
			CellReport::Single(reported) => reported != expected && !case.explains(*expected, *reported),
			CellReport::DeadKey(_) | CellReport::Sequence(_) => true,
		})
		.map(|(expected, _)| *expected)
		.collect();
	if !differing.is_empty() {
		diagnostics.record(InformationType::NonCorrespondingKeyboardLayouts, describe(differing));
	}
}

/// Record how every control character is delivered.
pub(crate) fn analyze_separators(mapping: &Mapping, data: &mut CalibrationData, diagnostics: &mut Diagnostics) {
	for separator in Separator::CELLS {
		let expected = separator.character();
		let report = mapping.report(expected).unwrap_or(&CellReport::Undetected);
		let reported = match report {
			CellReport::Single(reported) if data.inverse_map.get(reported) == Some(&expected) => Some(reported.to_string()),
			CellReport::Sequence(sequence) if data.ligatures.get(sequence) == Some(&expected) => Some(sequence.clone()),
			_ => None,
		};
		data.separators.set(separator, reported.clone());

		let name = separator.name();
		match reported {
			Some(reported) => {
				let supported = match separator {
					Separator::Group => InformationType::GroupSeparatorSupported,
					Separator::Record => InformationType::RecordSeparatorSupported,
					Separator::File => InformationType::FileSeparatorSupported,
					Separator::Unit => InformationType::UnitSeparatorSupported,
					_ => InformationType::EndOfTransmissionSupported,
				};
				diagnostics.record(supported, format!("{name} reported as {}", describe(reported.chars())));
				if reported != expected.to_string() {
					match separator {
						Separator::Group => diagnostics.record(
							InformationType::NonCorrespondingKeyboardLayoutsGroupSeparator,
							describe(reported.chars()),
						),
						Separator::Record => diagnostics.record(
							InformationType::NonCorrespondingKeyboardLayoutsRecordSeparator,
							describe(reported.chars()),
						),
						_ => (),
					}
				}
			},
			None if *report == CellReport::Undetected => match separator {
				Separator::Group => diagnostics.record(InformationType::NoGroupSeparatorMapping, name),
				Separator::Record => {
					diagnostics.record(InformationType::RecordSeparatorNotSupported, name);
					diagnostics.record(InformationType::IsoIec15434SyntaxNotRecognised, name);
				},
				Separator::File => {
					diagnostics.record(InformationType::FileSeparatorNotSupported, name);
					diagnostics.record(InformationType::IsoIec15434EdiNotReliablyReadable, name);
				},
				Separator::Unit => {
					diagnostics.record(InformationType::UnitSeparatorNotSupported, name);
					diagnostics.record(InformationType::IsoIec15434EdiNotReliablyReadable, name);
				},
				_ => diagnostics.record(InformationType::EndOfTransmissionNotSupported, name),
			},
			// Reported ambiguously, already classified.
			None => (),
		}
	}
}

/// Split the end-of-line sequence off reported text.
pub(crate) fn split_end_of_line(reported: &[char]) -> (&[char], &[char]) {
	let length = match reported {
		[.., CARRIAGE_RETURN, LINE_FEED] => 2,
		[.., CARRIAGE_RETURN] | [.., LINE_FEED] => 1,
		_ => 0,
	};
	reported.split_at(reported.len() - length)
}

/// Analyze what the scanner transmits around the barcode data.
///
/// `lead` is everything reported before the first cell, `tail` everything after the last.
pub(crate) fn analyze_boundaries(lead: &[char], tail: &[char], data: &mut CalibrationData, diagnostics: &mut Diagnostics) {
	let (suffix, end_of_line) = split_end_of_line(tail);
	if end_of_line.is_empty() {
		data.separators.end_of_line = None;
		diagnostics.record(InformationType::EndOfLineNotTransmitted, "no end-of-line sequence");
	} else {
		data.separators.end_of_line = Some(end_of_line.iter().collect());
		diagnostics.record(InformationType::EndOfLineTransmitted, describe(end_of_line.iter().copied()));
	}
	data.suffix = suffix.iter().collect();
	if !suffix.is_empty() {
		diagnostics.record(InformationType::SuffixTransmitted, describe(suffix.iter().copied()));
	}

	let aim_flag = data.reported(AIM_FLAG).filter(|_| {
		!data.unassigned.contains(&AIM_FLAG)
			&& data.character_map.get(&AIM_FLAG).map_or(true, |c| data.inverse_map.get(c) == Some(&AIM_FLAG))
	});
	data.aim_supported = aim_flag.is_some();
	if let Some(aim_flag) = &aim_flag {
		diagnostics.record(InformationType::AimSupported, describe(aim_flag.chars()));
	}
	data.aim_flag = aim_flag;

	let inverted = Inverter::new(data).invert(lead);
	let aim_start = match inverted.as_slice() {
		[.., flag, symbology, modifier]
			if flag.expected == Some(AIM_FLAG)
				&& symbology.expected.map_or(false, |c| c.is_ascii_alphabetic())
				&& modifier.expected.map_or(false, |c| c.is_ascii_alphanumeric()) =>
		{
			let identifier: String = [flag, symbology, modifier].iter().filter_map(|c| c.expected).collect();
			diagnostics.record(InformationType::AimTransmitted, identifier);
			Some(flag.position)
		},
		_ => None,
	};

	let prefix = match aim_start {
		Some(start) => {
			if data.aim_flag.as_deref() != Some("]") {
				diagnostics.record(
					InformationType::NonCorrespondingKeyboardLayoutsForAimIdentifier,
					describe(lead[start..].iter().copied()),
				);
			}
			&lead[..start]
		},
		None => {
			if data.aim_supported {
				diagnostics.record(InformationType::AimNotTransmitted, "no AIM identifier");
			} else {
				diagnostics.record(InformationType::AimNotRecognised, "the AIM flag character can not be read");
			}
			lead
		},
	};
	data.prefix = prefix.iter().collect();
	if !prefix.is_empty() {
		diagnostics.record(InformationType::PrefixTransmitted, describe(prefix.iter().copied()));
	}
}
