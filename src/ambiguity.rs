//! Classification of reports that do not identify a single expected character.

use std::collections::BTreeMap;

use tracing::debug;

use crate::calibration_data::{CaseConversion, DeadKeyTable};
use crate::information::{describe, Diagnostics, InformationType};
use crate::mapping::Mapping;
use crate::reference::{self, CharacterClass, Separator, AIM_FLAG};

/// Several expected characters that were reported the same way.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Ambiguity {
	reported: String,
	candidates: Vec<char>,
}

impl Ambiguity {
	fn description(&self) -> String {
		format!("{} reported for {}", describe(self.reported.chars()), describe(self.candidates.iter().copied()))
	}

	fn invariant(&self) -> Vec<char> {
		self.candidates.iter().copied().filter(|&c| reference::is_invariant(c)).collect()
	}

	fn separators(&self) -> Vec<Separator> {
		self.candidates.iter().filter_map(|&c| Separator::from_char(c)).collect()
	}

	/// The expected character an ambiguous report inverts to, if any.
	///
	/// An invariant character wins over a control character, which wins over the others.
	fn preferred(&self) -> Option<char> {
		let mut reported = self.reported.chars();
		let identity = match (reported.next(), reported.next()) {
			(Some(c), None) if self.candidates.contains(&c) => Some(c),
			_ => None,
		};

		let invariant = self.invariant();
		if let Some(c) = identity.filter(|c| invariant.contains(c)) {
			return Some(c);
		}
		match invariant.len() {
			0 => (),
			1 => return Some(invariant[0]),
			_ => return None,
		}
		if let Some(separator) = self.separators().into_iter().min_by_key(|s| s.priority()) {
			return Some(separator.character());
		}
		identity
	}
}

/// Drop candidates that a case conversion explains away.
fn fold_case(case: CaseConversion, reported: char, mut candidates: Vec<char>) -> Vec<char> {
	if matches!(case, CaseConversion::ToUpper | CaseConversion::ToLower) && candidates.contains(&reported) {
		candidates.retain(|&c| c == reported || !case.explains(c, reported));
	}
	candidates
}

/// Classify a single reported character that stands for several expected characters.
fn classify_keys(ambiguity: &Ambiguity, diagnostics: &mut Diagnostics) {
	let description = ambiguity.description();
	let invariant = ambiguity.invariant();
	let separators = ambiguity.separators();
	let non_invariant = ambiguity.candidates.iter()
		.filter(|&&c| CharacterClass::of(c) == Some(CharacterClass::NonInvariant))
		.count();

	if separators.contains(&Separator::Group) {
		if invariant.is_empty() {
			diagnostics.record(InformationType::MultipleKeysNonInvariantCharacters, &description);
		} else {
			diagnostics.record(InformationType::GroupSeparatorNotReliablyReadableInvariant, &description);
		}
	} else if !invariant.is_empty() {
		diagnostics.record(InformationType::MultipleKeys, &description);
	} else if non_invariant > 2 {
		diagnostics.record(InformationType::MultipleKeysMultipleNonInvariantCharacters, &description);
	} else if non_invariant > 0 {
		diagnostics.record(InformationType::MultipleKeysNonInvariantCharacters, &description);
	}

	if separators.iter().any(|s| matches!(s, Separator::Record | Separator::EndOfTransmission)) {
		diagnostics.record(InformationType::IsoIec15434SyntaxNotRecognised, &description);
	}
	if separators.iter().any(|s| matches!(s, Separator::File | Separator::Unit)) {
		diagnostics.record(InformationType::IsoIec15434EdiNotReliablyReadable, &description);
	}
	if ambiguity.candidates.contains(&AIM_FLAG) {
		diagnostics.record(InformationType::MultipleKeysAimFlagCharacter, &description);
	}
}

/// Classify a reported sequence that stands for several expected characters.
fn classify_sequences(ambiguity: &Ambiguity, diagnostics: &mut Diagnostics) {
	if ambiguity.invariant().is_empty() {
		diagnostics.record(InformationType::NonInvariantCharacterSequence, ambiguity.description());
	} else {
		diagnostics.record(InformationType::MultipleSequences, ambiguity.description());
	}
}

/// Build the inverse map for single reported characters.
pub(crate) fn resolve_keys(mapping: &Mapping, case: CaseConversion, diagnostics: &mut Diagnostics) -> BTreeMap<char, char> {
	let mut inverse = BTreeMap::new();
	for (reported, candidates) in mapping.single_candidates() {
		let candidates = fold_case(case, reported, candidates);
		if let [expected] = candidates[..] {
			inverse.insert(reported, expected);
			continue;
		}
		let ambiguity = Ambiguity {
			reported: reported.to_string(),
			candidates,
		};
		debug!("{}", ambiguity.description());
		classify_keys(&ambiguity, diagnostics);
		if let Some(expected) = ambiguity.preferred() {
			inverse.insert(reported, expected);
		}
	}
	inverse
}

/// Build the ligature map for reported sequences.
///
/// A sequence that can also be read as a series of single characters is treated
/// like a sequence reported for several expected characters.
pub(crate) fn resolve_sequences(
	mapping: &Mapping,
	inverse: &BTreeMap<char, char>,
	diagnostics: &mut Diagnostics,
) -> BTreeMap<String, char> {
	let mut ligatures = BTreeMap::new();
	for (sequence, candidates) in mapping.sequence_candidates() {
		if candidates.len() > 1 {
			let ambiguity = Ambiguity {
				reported: sequence,
				candidates,
			};
			debug!("{}", ambiguity.description());
			classify_sequences(&ambiguity, diagnostics);
			continue;
		}

		let expected = candidates[0];
		let shadowed: Option<Vec<char>> = sequence.chars().map(|c| inverse.get(&c).copied()).collect();
		if let Some(shadowed) = shadowed {
			let mut candidates = vec![expected];
			candidates.extend(shadowed);
			let ambiguity = Ambiguity {
				reported: sequence.clone(),
				candidates,
			};
			debug!("{}", ambiguity.description());
			classify_sequences(&ambiguity, diagnostics);
		}
		ligatures.insert(sequence, expected);
	}
	ligatures
}

/// Report dead keys that are shared by several expected characters.
pub(crate) fn classify_dead_key_prefixes(mapping: &Mapping, diagnostics: &mut Diagnostics) {
	for (prefix, candidates) in mapping.dead_key_candidates() {
		if candidates.len() < 2 {
			continue;
		}
		let description = Ambiguity {
			reported: prefix,
			candidates,
		}.description();
		diagnostics.record(InformationType::MultipleSequencesForScannerDeadKey, &description);
		diagnostics.record(InformationType::IncompatibleScannerDeadKey, &description);
	}
}

/// Drop probe outputs that several following characters share.
///
/// Collisions involving an invariant character are errors.
pub(crate) fn resolve_dead_key_outputs(
	dead_key: char,
	following: BTreeMap<char, String>,
	diagnostics: &mut Diagnostics,
) -> BTreeMap<char, String> {
	let mut by_output: BTreeMap<&str, Vec<char>> = BTreeMap::new();
	for (&expected, output) in &following {
		by_output.entry(output.as_str()).or_default().push(expected);
	}

	let mut colliding = Vec::new();
	for (output, candidates) in by_output {
		if candidates.len() < 2 {
			continue;
		}
		let ambiguity = Ambiguity {
			reported: output.to_string(),
			candidates,
		};
		let description = format!("after {}: {}", describe([dead_key]), ambiguity.description());
		if ambiguity.invariant().is_empty() {
			diagnostics.record(InformationType::DeadKeyMultiMappingNonInvariantCharacters, description);
		} else if output.chars().count() == 1 {
			diagnostics.record(InformationType::DeadKeyMultipleKeys, description);
		} else {
			diagnostics.record(InformationType::DeadKeyMultiMapping, description);
		}
		colliding.extend(ambiguity.candidates);
	}

	let mut following = following;
	for expected in colliding {
		following.remove(&expected);
	}
	following
}

/// Report outputs that are produced after more than one dead key.
pub(crate) fn classify_cross_prefix(dead_keys: &BTreeMap<String, DeadKeyTable>, diagnostics: &mut Diagnostics) {
	let mut by_output: BTreeMap<&str, Vec<(char, char)>> = BTreeMap::new();
	for table in dead_keys.values() {
		for (&expected, output) in &table.following {
			by_output.entry(output.as_str()).or_default().push((table.expected, expected));
		}
	}

	for (output, sources) in by_output {
		let first = sources[0].0;
		if sources.iter().all(|(dead_key, _)| *dead_key == first) {
			continue;
		}
		let sources: Vec<String> = sources.iter()
			.map(|(dead_key, expected)| format!("{}{}", describe([*dead_key]), describe([*expected])))
			.collect();
		diagnostics.record(
			InformationType::MultipleSequences,
			format!("{} reported for {}", describe(output.chars()), sources.join(", ")),
		);
	}
}
