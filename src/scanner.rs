//! Reading keyboard-wedge barcode scanners on Linux.
//!
//! The scanner is read through evdev, so the host keyboard layout is not involved:
//! key codes are translated with a fixed US layout.
//! The result is what a US-layout computer would report,
//! which makes a scan directly usable as input for the calibrator.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::reference::{CARRIAGE_RETURN, END_OF_TRANSMISSION, FILE_SEPARATOR, GROUP_SEPARATOR, RECORD_SEPARATOR, UNIT_SEPARATOR};
use crate::{Error, Result};

/// A barcode scanner.
pub struct BarcodeScanner {
	/// The underlying evdev device.
	device: evdev::Device,

	/// Modifier state, kept across reads.
	decoder: KeyDecoder,

	/// Keystrokes collected until a whole barcode has been read, with the time they arrived.
	buffer: Vec<(char, Instant)>,
}

/// One scanned barcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scan {
	/// Unicode scalar values of the reported characters, including the terminating carriage return.
	pub characters: Vec<u32>,

	/// Time between the first and the last keystroke.
	pub elapsed: Duration,
}

impl Scan {
	/// The reported characters as text.
	pub fn text(&self) -> String {
		self.characters.iter().filter_map(|&c| char::from_u32(c)).collect()
	}
}

impl BarcodeScanner {
	/// Create a barcode scanner and grab the device by a device path
	///
	/// # Example
	/// ```no_run
	/// # use barcode_scanner_calibration::BarcodeScanner;
	/// # fn foo() -> Result<(), barcode_scanner_calibration::Error> {
	/// let mut scanner = BarcodeScanner::open("/dev/input/event18")?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let mut device = evdev::Device::open(path)
			.map_err(|source| Error::OpenDevice { path: path.to_owned(), source })?;
		device.grab()
			.map_err(|source| Error::GrabDevice { device: path.display().to_string(), source })?;
		debug!("Grabbed input device {}", path.display());

		Ok(Self::new(device))
	}

	/// Create a barcode scanner and grab the device by a physical device path
	///
	/// # Example
	/// ```no_run
	/// # use barcode_scanner_calibration::BarcodeScanner;
	/// # fn foo() -> Result<(), ()> {
	/// let device_path = "usb-0000:00:14.0-3/input0";
	/// let mut scanner = BarcodeScanner::open_by_physical_path(device_path)
	///     .map_err(|e| eprintln!("{}", e))?
	///     .ok_or_else(|| eprintln!("No such device: {device_path}"))?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn open_by_physical_path(physical_path: impl AsRef<str>) -> Result<Option<Self>> {
		let physical_path = physical_path.as_ref();
		for (_path, mut device) in evdev::enumerate() {
			if device.physical_path() != Some(physical_path) {
				continue;
			}
			// Prevents other clients from receiving events from this device.
			device.grab()
				.map_err(|source| Error::GrabDevice { device: physical_path.to_string(), source })?;
			debug!("Grabbed input device {physical_path}");
			return Ok(Some(Self::new(device)));
		}
		Ok(None)
	}

	fn new(device: evdev::Device) -> Self {
		Self {
			device,
			decoder: KeyDecoder::default(),
			buffer: Vec::new(),
		}
	}

	/// Read a barcode from the device.
	///
	/// Blocks until an entire barcode has been read.
	///
	/// # Example
	/// ```no_run
	/// # use barcode_scanner_calibration::BarcodeScanner;
	/// # fn foo() -> Result<(), barcode_scanner_calibration::Error> {
	/// # let mut scanner = BarcodeScanner::open("/dev/input/event18")?;
	/// let scan = scanner.read()?;
	/// println!("Barcode: {}", scan.text());
	/// # Ok(())
	/// # }
	/// ```
	pub fn read(&mut self) -> Result<Scan> {
		loop {
			if let Some(scan) = self.take_scan() {
				return Ok(scan);
			}

			let events = self.device.fetch_events().map_err(Error::FetchEvents)?;
			for event in events {
				if event.event_type() != evdev::EventType::KEY {
					continue;
				}
				let key = evdev::Key(event.code());
				if let Some(c) = self.decoder.key_event(key, event.value()) {
					trace!("Key {key:?} reported as {c:?}");
					self.buffer.push((c, Instant::now()));
				}
			}
		}
	}

	/// Take the first complete barcode out of the buffer.
	fn take_scan(&mut self) -> Option<Scan> {
		let index = self.buffer.iter().position(|(c, _)| *c == CARRIAGE_RETURN)?;
		let keystrokes: Vec<(char, Instant)> = self.buffer.drain(..index + 1).collect();
		let elapsed = match (keystrokes.first(), keystrokes.last()) {
			(Some((_, first)), Some((_, last))) => last.duration_since(*first),
			_ => Duration::ZERO,
		};
		Some(Scan {
			characters: keystrokes.iter().map(|(c, _)| *c as u32).collect(),
			elapsed,
		})
	}

	/// Convert the device into a asynchonous stream of scanned barcodes.
	#[cfg(feature = "tokio")]
	pub fn into_async_stream(mut self) -> tokio::sync::mpsc::UnboundedReceiver<Result<Scan>> {
		let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
		tokio::task::spawn_blocking(move || {
			loop {
				if tx.send(self.read()).is_err() {
					break;
				}
			}
		});
		rx
	}
}

/// Translates key events to characters, tracking the modifier keys.
#[derive(Clone, Debug, Default)]
pub struct KeyDecoder {
	left_shift: bool,
	right_shift: bool,
	left_ctrl: bool,
	right_ctrl: bool,
	caps_lock: bool,
}

impl KeyDecoder {
	/// Process a key event.
	///
	/// `value` is 1 for a key press, 0 for a release and 2 for auto-repeat.
	/// Returns the character produced by a key press, if any.
	/// Enter produces a carriage return, Ctrl chords produce the ASCII control characters.
	pub fn key_event(&mut self, key: evdev::Key, value: i32) -> Option<char> {
		let pressed = value != 0;
		match key {
			evdev::Key::KEY_LEFTSHIFT => self.left_shift = pressed,
			evdev::Key::KEY_RIGHTSHIFT => self.right_shift = pressed,
			evdev::Key::KEY_LEFTCTRL => self.left_ctrl = pressed,
			evdev::Key::KEY_RIGHTCTRL => self.right_ctrl = pressed,
			evdev::Key::KEY_CAPSLOCK if value == 1 => self.caps_lock = !self.caps_lock,
			_ => (),
		}
		if value != 1 {
			return None;
		}

		let [plain, shifted] = key_to_chars(key)?;
		let c = if self.left_shift || self.right_shift { shifted } else { plain };
		if self.left_ctrl || self.right_ctrl {
			return control_character(c);
		}
		if self.caps_lock && c.is_ascii_alphabetic() {
			Some(if c.is_ascii_lowercase() { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
		} else {
			Some(c)
		}
	}
}

/// The control character a Ctrl chord produces.
fn control_character(c: char) -> Option<char> {
	match c {
		']' => Some(GROUP_SEPARATOR),
		'^' | '6' => Some(RECORD_SEPARATOR),
		'\\' => Some(FILE_SEPARATOR),
		'_' | '-' => Some(UNIT_SEPARATOR),
		'd' | 'D' => Some(END_OF_TRANSMISSION),
		'm' | 'M' => Some(CARRIAGE_RETURN),
		_ => None,
	}
}

/// Map a key to its unshifted and shifted character on a US keyboard.
fn key_to_chars(key: evdev::Key) -> Option<[char; 2]> {
	let chars = match key {
		// Digits
		evdev::Key::KEY_1 => ['1', '!'],
		evdev::Key::KEY_2 => ['2', '@'],
		evdev::Key::KEY_3 => ['3', '#'],
		evdev::Key::KEY_4 => ['4', '$'],
		evdev::Key::KEY_5 => ['5', '%'],
		evdev::Key::KEY_6 => ['6', '^'],
		evdev::Key::KEY_7 => ['7', '&'],
		evdev::Key::KEY_8 => ['8', '*'],
		evdev::Key::KEY_9 => ['9', '('],
		evdev::Key::KEY_0 => ['0', ')'],
		// Letters
		evdev::Key::KEY_A => ['a', 'A'],
		evdev::Key::KEY_B => ['b', 'B'],
		evdev::Key::KEY_C => ['c', 'C'],
		evdev::Key::KEY_D => ['d', 'D'],
		evdev::Key::KEY_E => ['e', 'E'],
		evdev::Key::KEY_F => ['f', 'F'],
		evdev::Key::KEY_G => ['g', 'G'],
		evdev::Key::KEY_H => ['h', 'H'],
		evdev::Key::KEY_I => ['i', 'I'],
		evdev::Key::KEY_J => ['j', 'J'],
		evdev::Key::KEY_K => ['k', 'K'],
		evdev::Key::KEY_L => ['l', 'L'],
		evdev::Key::KEY_M => ['m', 'M'],
		evdev::Key::KEY_N => ['n', 'N'],
		evdev::Key::KEY_O => ['o', 'O'],
		evdev::Key::KEY_P => ['p', 'P'],
		evdev::Key::KEY_Q => ['q', 'Q'],
		evdev::Key::KEY_R => ['r', 'R'],
		evdev::Key::KEY_S => ['s', 'S'],
		evdev::Key::KEY_T => ['t', 'T'],
		evdev::Key::KEY_U => ['u', 'U'],
		evdev::Key::KEY_V => ['v', 'V'],
		evdev::Key::KEY_W => ['w', 'W'],
		evdev::Key::KEY_X => ['x', 'X'],
		evdev::Key::KEY_Y => ['y', 'Y'],
		evdev::Key::KEY_Z => ['z', 'Z'],
		// Special
		evdev::Key::KEY_SPACE => [' ', ' '],
		evdev::Key::KEY_TAB => ['\t', '\t'],
		evdev::Key::KEY_APOSTROPHE => ['\'', '"'],
		evdev::Key::KEY_EQUAL => ['=', '+'],
		evdev::Key::KEY_COMMA => [',', '<'],
		evdev::Key::KEY_MINUS => ['-', '_'],
		evdev::Key::KEY_DOT => ['.', '>'],
		evdev::Key::KEY_SLASH => ['/', '?'],
		evdev::Key::KEY_BACKSLASH => ['\\', '|'],
		evdev::Key::KEY_SEMICOLON => [';', ':'],
		evdev::Key::KEY_LEFTBRACE => ['[', '{'],
		evdev::Key::KEY_RIGHTBRACE => [']', '}'],
		evdev::Key::KEY_GRAVE => ['`', '~'],
		evdev::Key::KEY_KPENTER | evdev::Key::KEY_ENTER => [CARRIAGE_RETURN, CARRIAGE_RETURN],
		_ => return None,
	};
	Some(chars)
}
