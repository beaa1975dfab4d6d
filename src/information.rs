//! Errors, warnings and information reported during calibration.

use serde::{Deserialize, Serialize};

/// How serious a finding is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
	/// Purely descriptive.
	Information,

	/// The calibration is usable, with reduced fidelity for non-invariant characters or optional syntax.
	Warning,

	/// The calibration is not usable.
	Error,
}

/// Discriminant of every finding the calibrator can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InformationType {
	// Information
	KeyboardScript,
	GroupSeparatorSupported,
	RecordSeparatorSupported,
	FileSeparatorSupported,
	UnitSeparatorSupported,
	EndOfTransmissionSupported,
	RecordSeparatorNotSupported,
	FileSeparatorNotSupported,
	UnitSeparatorNotSupported,
	EndOfTransmissionNotSupported,
	AimSupported,
	AimTransmitted,
	EndOfLineTransmitted,
	ScannerMayCompensateForCapsLock,
	DeadKeyDetected,

	// Warnings
	NonCorrespondingKeyboardLayouts,
	NonCorrespondingKeyboardLayoutsGroupSeparator,
	NonCorrespondingKeyboardLayoutsRecordSeparator,
	NonCorrespondingKeyboardLayoutsForAimIdentifier,
	NonInvariantCharactersUnreported,
	MultipleKeysNonInvariantCharacters,
	MultipleKeysMultipleNonInvariantCharacters,
	MultipleKeysAimFlagCharacter,
	NonInvariantCharacterSequence,
	DeadKeyMultiMappingNonInvariantCharacters,
	IsoIec15434SyntaxNotRecognised,
	IsoIec15434EdiNotReliablyReadable,
	PrefixTransmitted,
	SuffixTransmitted,
	AimNotRecognised,
	AimNotTransmitted,
	EndOfLineNotTransmitted,
	ScannerMayConvertToUpperCase,
	ScannerMayConvertToLowerCase,
	ScannerMayInvertCase,
	CapsLockOn,
	CapsLockProbablyOn,
	SubOptimalScannerKeyboardPerformance,

	// Errors
	NoCalibrationTokenProvided,
	NoCalibrationDataReported,
	NoDelimiters,
	TooManyCharactersDetected,
	UnrecognisedData,
	UndetectedInvariantCharacters,
	MultipleKeys,
	MultipleSequences,
	MultipleSequencesForScannerDeadKey,
	IncompatibleScannerDeadKey,
	DeadKeyMultipleKeys,
	DeadKeyMultiMapping,
	GroupSeparatorNotReliablyReadableInvariant,
	NoGroupSeparatorMapping,
}

impl InformationType {
	/// The severity of this kind of finding.
	pub fn severity(self) -> Severity {
		use InformationType::*;
		match self {
			KeyboardScript
			| GroupSeparatorSupported
			| RecordSeparatorSupported
			| FileSeparatorSupported
			| UnitSeparatorSupported
			| EndOfTransmissionSupported
			| RecordSeparatorNotSupported
			| FileSeparatorNotSupported
			| UnitSeparatorNotSupported
			| EndOfTransmissionNotSupported
			| AimSupported
			| AimTransmitted
			| EndOfLineTransmitted
			| ScannerMayCompensateForCapsLock
			| DeadKeyDetected => Severity::Information,

			NonCorrespondingKeyboardLayouts
			| NonCorrespondingKeyboardLayoutsGroupSeparator
			| NonCorrespondingKeyboardLayoutsRecordSeparator
			| NonCorrespondingKeyboardLayoutsForAimIdentifier
			| NonInvariantCharactersUnreported
			| MultipleKeysNonInvariantCharacters
			| MultipleKeysMultipleNonInvariantCharacters
			| MultipleKeysAimFlagCharacter
			| NonInvariantCharacterSequence
			| DeadKeyMultiMappingNonInvariantCharacters
			| IsoIec15434SyntaxNotRecognised
			| IsoIec15434EdiNotReliablyReadable
			| PrefixTransmitted
			| SuffixTransmitted
			| AimNotRecognised
			| AimNotTransmitted
			| EndOfLineNotTransmitted
			| ScannerMayConvertToUpperCase
			| ScannerMayConvertToLowerCase
			| ScannerMayInvertCase
			| CapsLockOn
			| CapsLockProbablyOn
			| SubOptimalScannerKeyboardPerformance => Severity::Warning,

			NoCalibrationTokenProvided
			| NoCalibrationDataReported
			| NoDelimiters
			| TooManyCharactersDetected
			| UnrecognisedData
			| UndetectedInvariantCharacters
			| MultipleKeys
			| MultipleSequences
			| MultipleSequencesForScannerDeadKey
			| IncompatibleScannerDeadKey
			| DeadKeyMultipleKeys
			| DeadKeyMultiMapping
			| GroupSeparatorNotReliablyReadableInvariant
			| NoGroupSeparatorMapping => Severity::Error,
		}
	}
}

/// A single finding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Information {
	/// What was found.
	pub kind: InformationType,

	/// Details, typically the characters involved.
	pub description: String,
}

impl Information {
	pub fn new(kind: InformationType, description: impl Into<String>) -> Self {
		Self {
			kind,
			description: description.into(),
		}
	}

	pub fn severity(&self) -> Severity {
		self.kind.severity()
	}
}

impl std::fmt::Display for Information {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}: {}", self.kind, self.description)
	}
}

/// Findings collected over a calibration, split by severity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
	pub errors: Vec<Information>,
	pub warnings: Vec<Information>,
	pub information: Vec<Information>,
}

impl Diagnostics {
	/// Record a finding in the list matching its severity.
	///
	/// Identical findings are only recorded once.
	pub fn record(&mut self, kind: InformationType, description: impl Into<String>) {
		let entry = Information::new(kind, description);
		let list = match kind.severity() {
			Severity::Error => &mut self.errors,
			Severity::Warning => &mut self.warnings,
			Severity::Information => &mut self.information,
		};
		if !list.contains(&entry) {
			list.push(entry);
		}
	}

	pub fn has_errors(&self) -> bool {
		!self.errors.is_empty()
	}

	/// Check if any finding of the given kind was recorded.
	pub fn contains(&self, kind: InformationType) -> bool {
		self.errors.iter()
			.chain(&self.warnings)
			.chain(&self.information)
			.any(|entry| entry.kind == kind)
	}
}

/// Render characters for use in a description, escaping control characters.
pub(crate) fn describe<I: IntoIterator<Item = char>>(chars: I) -> String {
	chars.into_iter()
		.map(|c| {
			if c.is_control() {
				format!("{:?}", c).trim_matches('\'').to_string()
			} else {
				c.to_string()
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}
