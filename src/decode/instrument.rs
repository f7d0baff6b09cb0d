use serde::{Deserialize, Serialize};

use super::fields::Fields;
use crate::sentence::Sentence;
use crate::{Error, Result};

/// Velocity coordinate system reported in `PNORI`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinateSystem {
    Enu,
    Xyz,
    Beam,
}

impl CoordinateSystem {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Enu),
            1 => Some(Self::Xyz),
            2 => Some(Self::Beam),
            _ => None,
        }
    }
}

/// Session instrument configuration from a `PNORI` sentence.
///
/// Required to place current cells in the water column; see [InstrumentConfig::cell_depth].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    pub instrument_type: u8,
    /// Head identifier, usually model and serial number.
    pub head_id: String,
    /// Number of acoustic beams, 3 or 4.
    pub beam_count: u8,
    pub cell_count: u16,
    /// Blanking distance in meters.
    pub blanking_distance: f64,
    /// Cell size in meters, always positive.
    pub cell_size: f64,
    pub coordinate_system: CoordinateSystem,
}

impl InstrumentConfig {
    /// Number of fields in a `PNORI` sentence, including the tag.
    pub const FIELDS: usize = 8;

    /// Distance from the transducer to the center of 1-based `cell_number`.
    ///
    /// This does not account for orientation or mounting depth.
    #[must_use]
    pub fn cell_depth(&self, cell_number: u16) -> f64 {
        self.blanking_distance + f64::from(cell_number.saturating_sub(1)) * self.cell_size
    }
}

/// Decode a `PNORI` sentence.
///
/// # Errors
/// [Error::FieldCount] if the sentence does not have exactly 8 fields and
/// [Error::FieldParse] for any field that is malformed or violates the beam count, cell
/// count and cell size invariants.
pub fn decode(sentence: &Sentence) -> Result<InstrumentConfig> {
    let fields = Fields::new(sentence, InstrumentConfig::FIELDS..=InstrumentConfig::FIELDS)?;

    let beam_count = fields.u8(3)?;
    if !(3..=4).contains(&beam_count) {
        return Err(Error::FieldParse {
            index: 3,
            value: fields.str(3).to_string(),
            expected: "beam count of 3 or 4",
        });
    }
    let cell_count = fields.u16(4)?;
    if cell_count == 0 {
        return Err(Error::FieldParse {
            index: 4,
            value: fields.str(4).to_string(),
            expected: "positive cell count",
        });
    }
    let cell_size = fields.f64(6)?;
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(Error::FieldParse {
            index: 6,
            value: fields.str(6).to_string(),
            expected: "positive cell size",
        });
    }
    let coordinate_system =
        CoordinateSystem::from_code(fields.u8(7)?).ok_or_else(|| Error::FieldParse {
            index: 7,
            value: fields.str(7).to_string(),
            expected: "coordinate system code 0, 1 or 2",
        })?;

    Ok(InstrumentConfig {
        instrument_type: fields.u8(1)?,
        head_id: fields.str(2).to_string(),
        beam_count,
        cell_count,
        blanking_distance: fields.f64(5)?,
        cell_size,
        coordinate_system,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::frame;

    fn decode_body(body: &str) -> Result<InstrumentConfig> {
        let line = frame(body);
        decode(&Sentence::parse(&line)?)
    }

    #[test]
    fn decode_config() {
        let config = decode_body("PNORI,4,Signature1000_100297,4,20,0.50,1.00,0").unwrap();
        assert_eq!(config.instrument_type, 4);
        assert_eq!(config.head_id, "Signature1000_100297");
        assert_eq!(config.beam_count, 4);
        assert_eq!(config.cell_count, 20);
        assert_eq!(config.blanking_distance, 0.5);
        assert_eq!(config.cell_size, 1.0);
        assert_eq!(config.coordinate_system, CoordinateSystem::Enu);
    }

    #[test]
    fn decode_rejects_invariant_violations() {
        for (body, bad) in [
            ("PNORI,4,X,5,20,0.50,1.00,0", 3),
            ("PNORI,4,X,2,20,0.50,1.00,0", 3),
            ("PNORI,4,X,4,20,0.50,0.00,0", 6),
            ("PNORI,4,X,4,20,0.50,-1.0,0", 6),
            ("PNORI,4,X,4,20,0.50,1.00,3", 7),
            ("PNORI,4,X,4,twenty,0.50,1.00,0", 4),
            ("PNORI,4,X,4,0,0.50,1.00,0", 4),
        ] {
            match decode_body(body) {
                Err(Error::FieldParse { index, .. }) => assert_eq!(index, bad, "{body}"),
                other => panic!("{body}: expected field error, got {other:?}"),
            }
        }
    }

    #[test]
    fn decode_rejects_field_count() {
        assert!(matches!(
            decode_body("PNORI,4,X,4,20,0.50,1.00"),
            Err(Error::FieldCount { actual: 7, .. })
        ));
        assert!(matches!(
            decode_body("PNORI,4,X,4,20,0.50,1.00,0,"),
            Err(Error::FieldCount { actual: 9, .. })
        ));
    }

    #[test]
    fn depth_is_monotonic() {
        let config = decode_body("PNORI,4,X,3,30,0.40,0.25,1").unwrap();
        assert_eq!(config.cell_depth(1), 0.4);
        for n in 1..30 {
            assert!(config.cell_depth(n + 1) > config.cell_depth(n));
        }
    }
}
