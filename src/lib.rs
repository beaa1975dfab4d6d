//! Calibrate keyboard-wedge barcode scanners and parse the pack identifiers they read.
//!
//! A barcode scanner that acts as a keyboard sends key strokes, not characters.
//! When the scanner and the computer disagree on the keyboard layout,
//! the application receives different characters than the ones encoded in the barcode.
//! The `barcode-scanner-calibration` crate finds out how the characters are transformed
//! by having the user scan a few calibration barcodes, and can then undo the transformation.
//!
//! Currently supported features:
//! * A [`Calibrator`] that derives [`CalibrationData`] from scanned calibration barcodes,
//!   including dead keys, ligatures, case conversion, prefixes, suffixes and AIM identifiers.
//! * Errors, warnings and information about the scanner configuration, see [`InformationType`].
//! * A [`Parser`] for GS1 element strings, ASC MH10.8.2 data and ISO/IEC 15434 envelopes.
//! * One [`BarcodeScanner`] struct to read USB hand scanners directly through evdev on Linux.
//!
//! # Example
//! This example calibrates a hand scanner and parses the barcodes it reads afterwards.
//!
//! ```no_run
//! # fn example() -> Result<(), barcode_scanner_calibration::Error> {
//!    use barcode_scanner_calibration::{BarcodeScanner, Calibrator, Parser, RecognizedDataElement, ScanHints};
//!
//!    let mut scanner = BarcodeScanner::open("/dev/input/by-id/usb-USB_Adapter_USB_Device-event-kbd")?;
//!    let calibrator = Calibrator::default();
//!    let mut tokens = calibrator.calibration_tokens();
//!    while let Some(token) = tokens.next() {
//!        println!("Please scan: {:?}", token.barcode_data());
//!        let scan = scanner.read()?;
//!        let hints = ScanHints { elapsed: Some(scan.elapsed), ..Default::default() };
//!        tokens.calibrate(&scan.characters, token, &hints);
//!    }
//!
//!    let token = tokens.latest().cloned().unwrap_or_default();
//!    for warning in token.warnings() {
//!        println!("{warning}");
//!    }
//!    let data = token.into_calibration_data().expect("calibration failed");
//!    let parser = Parser::new(&data, RecognizedDataElement::defaults())?;
//!    loop {
//!        let pack = parser.parse(&scanner.read()?.text());
//!        println!("{pack:?}");
//!    }
//! # }
//! ```

mod ambiguity;
mod calibration_data;
mod calibrator;
mod config;
mod environment;
mod error;
mod information;
mod invert;
mod mapping;
pub mod parser;
pub mod reference;
mod scanner;

pub use calibration_data::{CalibrationData, CaseConversion, DeadKeyTable, KeyboardScript, Separators, SCHEMA_VERSION};
pub use calibrator::{
	CalibrationState,
	CalibrationToken,
	CalibrationTokens,
	Calibrator,
	DeadKeyPrefix,
	ExtendedData,
	Platform,
	ScanHints,
};
pub use config::CalibrationConfig;
pub use error::{Error, Result};
pub use information::{Diagnostics, Information, InformationType, Severity};
pub use parser::{parse, DataElement, Dialect, PackIdentifier, Parser, RecognizedDataElement, Scheme, Syntax};
pub use scanner::{BarcodeScanner, KeyDecoder, Scan};
