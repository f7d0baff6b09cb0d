use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::fields::Fields;
use crate::derived::tilt;
use crate::sentence::Sentence;
use crate::Result;

/// Instrument orientation from bits 27-25 of the `PNORS` status code.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Orientation {
    XUp,
    XDown,
    YUp,
    YDown,
    /// Typical for bottom mounted instruments looking at the surface.
    ZUp,
    /// Typical for surface mounted instruments looking down.
    ZDown,
    /// Arbitrary orientation reported by an AHRS unit.
    Ahrs,
}

impl Orientation {
    /// Bit offset of the orientation field within the status code.
    pub const SHIFT: u32 = 25;
    pub const MASK: u32 = 0b111;

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::XUp),
            1 => Some(Self::XDown),
            2 => Some(Self::YUp),
            3 => Some(Self::YDown),
            4 => Some(Self::ZUp),
            5 => Some(Self::ZDown),
            7 => Some(Self::Ahrs),
            _ => None,
        }
    }

    /// Extract the orientation from a status word, or `None` for the unused code 6.
    #[must_use]
    pub fn from_status(status: u32) -> Option<Self> {
        Self::from_code(((status >> Self::SHIFT) & Self::MASK) as u8)
    }

    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Self::XUp => 0,
            Self::XDown => 1,
            Self::YUp => 2,
            Self::YDown => 3,
            Self::ZUp => 4,
            Self::ZDown => 5,
            Self::Ahrs => 7,
        }
    }
}

/// Sensor and status record from a `PNORS` sentence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnvironmentalData {
    /// Measurement time
    pub date: DateTime<Utc>,
    /// Error status word as sent, hexadecimal.
    pub error_status: String,
    /// Status word as sent, hexadecimal.
    pub status_code: String,
    /// Volts
    pub battery_voltage: f64,
    /// Meters per second
    pub sound_speed: f64,
    /// Degrees
    pub heading: f64,
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub roll: f64,
    /// Decibar
    pub pressure: f64,
    /// Degrees Celsius
    pub temperature: f64,
    pub analog_input1: Option<f64>,
    pub analog_input2: Option<f64>,
    /// Total tilt in degrees, see [tilt].
    pub tilt: f64,
    /// `None` when the status code holds the reserved orientation value 6.
    pub orientation: Option<Orientation>,
}

impl EnvironmentalData {
    /// Minimum number of fields, including the tag.
    pub const MIN_FIELDS: usize = 12;
    /// Fields including both optional analog inputs.
    pub const MAX_FIELDS: usize = 14;
}

/// Decode a `PNORS` sentence.
///
/// # Errors
/// [FieldCount](crate::Error::FieldCount) for fewer than 12 or more than 14 fields and
/// [FieldParse](crate::Error::FieldParse) for malformed fields. A status code whose
/// orientation bits hold the unused value 6 is not an error; the record is kept without an
/// orientation.
pub fn decode(sentence: &Sentence) -> Result<EnvironmentalData> {
    let fields = Fields::new(
        sentence,
        EnvironmentalData::MIN_FIELDS..=EnvironmentalData::MAX_FIELDS,
    )?;

    let status_code = fields.str(4);
    let orientation = Orientation::from_status(fields.hex_u32(4)?);
    if orientation.is_none() {
        warn!(status_code, "reserved orientation code");
    }
    // validated for hex but kept as sent
    fields.hex_u32(3)?;

    let pitch = fields.f64(8)?;
    let roll = fields.f64(9)?;

    Ok(EnvironmentalData {
        date: fields.datetime(1, 2)?,
        error_status: fields.str(3).to_string(),
        status_code: status_code.to_string(),
        battery_voltage: fields.f64(5)?,
        sound_speed: fields.f64(6)?,
        heading: fields.f64(7)?,
        pitch,
        roll,
        pressure: fields.f64(10)?,
        temperature: fields.f64(11)?,
        analog_input1: fields.opt_f64(12)?,
        analog_input2: fields.opt_f64(13)?,
        tilt: tilt(pitch, roll),
        orientation,
    })
}
