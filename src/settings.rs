//! Settings related to the supervised serial port.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, Parity, StopBits};

/// Interval between two attempts at re-opening a lost port.
pub(crate) const RETRY_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings related to the serial port supervised by `tether`.
///
/// The same settings are applied on the initial open and on every reconnect,
/// so a board that comes back after an unplug is talked to at the same speed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: String,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,
    /// Longest time a single read on the port blocks. A read that times out
    /// is treated like an idle line, not like a failure.
    pub read_timeout: Duration,

    /// Wait between reconnect attempts. Fixed, only tests shorten it.
    pub(crate) retry_interval: Duration,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// Only the port path is mandatory, everything else has a default value that
/// will be used if not explicitly set.
///
/// **Example**
///
/// ```
/// let settings = tether::SettingsBuilder::new("/dev/ttyUSB0")
///     .baud_rate(9_600)
///     .finalize();
/// assert_eq!(settings.baud_rate, 9_600);
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings for the port at `path` using default
    /// values for everything else.
    pub fn new<'a>(path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        SettingsBuilder {
            settings: Settings {
                path: path.into().into_owned(),
                baud_rate: 115_200,
                data_bits: DataBits::Eight,
                parity: Parity::None,
                stop_bits: StopBits::One,
                read_timeout: Duration::from_millis(100),
                retry_interval: RETRY_INTERVAL,
                _private_use_builder: (),
            },
        }
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Set how long a single read may block before it is retried
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.settings.read_timeout = read_timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.settings.retry_interval = retry_interval;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new("/dev/ttyUSB0").finalize();
    assert_eq!(
        settings,
        Settings {
            path: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: Duration::from_millis(100),
            retry_interval: Duration::from_secs(1),
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new(String::from("COM4")).finalize();
    assert_eq!(settings.path, "COM4");
}

#[test]
fn baud_rate() {
    let baud_rate = 9_600;
    let settings = SettingsBuilder::new("/dev/ttyACM0")
        .baud_rate(baud_rate)
        .finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn data_bits() {
    let data_bits = DataBits::Seven;
    let settings = SettingsBuilder::new("/dev/ttyACM0")
        .data_bits(data_bits)
        .finalize();
    assert_eq!(settings.data_bits, data_bits);
}

#[test]
fn stop_bits() {
    let stop_bits = StopBits::Two;
    let settings = SettingsBuilder::new("/dev/ttyACM0")
        .stop_bits(stop_bits)
        .finalize();
    assert_eq!(settings.stop_bits, stop_bits);
}

#[test]
fn parity() {
    let parity = Parity::Even;
    let settings = SettingsBuilder::new("/dev/ttyACM0")
        .parity(parity)
        .finalize();
    assert_eq!(settings.parity, parity);
}

#[test]
fn read_timeout() {
    let settings = SettingsBuilder::new("/dev/ttyACM0")
        .read_timeout(Duration::from_millis(5))
        .finalize();
    assert_eq!(settings.read_timeout, Duration::from_millis(5));
}

#[test]
fn retry_interval_is_fixed_by_default() {
    let settings = SettingsBuilder::new("/dev/ttyACM0").finalize();
    assert_eq!(settings.retry_interval, RETRY_INTERVAL);
}
