use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::Fields;
use super::instrument::InstrumentConfig;
use crate::derived::{mean, QualityGrade, QualityThresholds};
use crate::sentence::Sentence;
use crate::{Error, Result};

/// Beam count assumed when no instrument configuration is available.
pub const DEFAULT_BEAM_COUNT: u8 = 4;
/// Cell size in meters assumed when no instrument configuration is available.
pub const FALLBACK_CELL_SIZE: f64 = 1.0;

/// Position of the first amplitude value; correlations follow the amplitudes.
const AMPLITUDE_START: usize = 11;

/// One depth cell of a current profile from a `PNORC` sentence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CurrentCellData {
    /// Sampling instant shared by all cells of a profile.
    pub date: DateTime<Utc>,
    /// 1-based cell number
    pub cell_number: u16,
    /// Distance from the transducer in meters.
    pub depth: f64,
    /// True when `depth` was computed without an instrument configuration.
    pub depth_estimated: bool,
    /// Meters per second
    pub east_velocity: f64,
    pub north_velocity: f64,
    pub up_velocity1: f64,
    /// Only reported by 4 beam instruments.
    pub up_velocity2: Option<f64>,
    /// Meters per second
    pub speed: f64,
    /// Degrees
    pub direction: f64,
    pub amplitude_unit: String,
    /// Echo amplitude per beam
    pub amplitude: Vec<u16>,
    /// Correlation per beam, percent
    pub correlation: Vec<u16>,
    pub is_valid: bool,
    pub quality: QualityGrade,
}

impl CurrentCellData {
    /// Number of fields, including the tag, for an instrument with `beams` beams.
    #[must_use]
    pub fn field_count(beams: u8) -> usize {
        AMPLITUDE_START + 2 * beams as usize
    }

    #[must_use]
    pub fn mean_amplitude(&self) -> f64 {
        mean_u16(&self.amplitude)
    }

    #[must_use]
    pub fn mean_correlation(&self) -> f64 {
        mean_u16(&self.correlation)
    }
}

fn mean_u16(values: &[u16]) -> f64 {
    let values: Vec<f64> = values.iter().copied().map(f64::from).collect();
    mean(&values).unwrap_or(f64::NAN)
}

/// Depth of `cell_number`, falling back to `cell_number * 1.0` meters without a
/// configuration. The flag is true when the fallback was used.
#[must_use]
pub fn cell_depth(instrument: Option<&InstrumentConfig>, cell_number: u16) -> (f64, bool) {
    match instrument {
        Some(config) => (config.cell_depth(cell_number), false),
        None => (f64::from(cell_number) * FALLBACK_CELL_SIZE, true),
    }
}

/// Decode a `PNORC` sentence.
///
/// The beam count of `instrument` (default 4) determines how many amplitude and
/// correlation values follow the fixed fields.
///
/// # Errors
/// [Error::FieldCount] when the field count does not match the beam count,
/// [Error::FieldParse] for malformed fields.
pub fn decode(
    sentence: &Sentence,
    instrument: Option<&InstrumentConfig>,
    thresholds: &QualityThresholds,
) -> Result<CurrentCellData> {
    let beams = instrument.map_or(DEFAULT_BEAM_COUNT, |c| c.beam_count);
    let count = CurrentCellData::field_count(beams);
    let fields = Fields::new(sentence, count..=count)?;

    let cell_number = fields.u16(3)?;
    if cell_number == 0 {
        return Err(Error::FieldParse {
            index: 3,
            value: fields.str(3).to_string(),
            expected: "1-based cell number",
        });
    }
    let (depth, depth_estimated) = cell_depth(instrument, cell_number);

    let beams = beams as usize;
    let amplitude = (AMPLITUDE_START..AMPLITUDE_START + beams)
        .map(|idx| fields.u16(idx))
        .collect::<Result<Vec<_>>>()?;
    let correlation = (AMPLITUDE_START + beams..AMPLITUDE_START + 2 * beams)
        .map(|idx| fields.u16(idx))
        .collect::<Result<Vec<_>>>()?;

    let speed = fields.f64(8)?;
    let mut cell = CurrentCellData {
        date: fields.datetime(1, 2)?,
        cell_number,
        depth,
        depth_estimated,
        east_velocity: fields.f64(4)?,
        north_velocity: fields.f64(5)?,
        up_velocity1: fields.f64(6)?,
        up_velocity2: fields.opt_f64(7)?,
        speed,
        direction: fields.f64(9)?,
        amplitude_unit: fields.str(10).to_string(),
        amplitude,
        correlation,
        is_valid: false,
        quality: QualityGrade::Poor,
    };
    let mean_correlation = cell.mean_correlation();
    cell.is_valid = thresholds.is_valid(mean_correlation, speed);
    cell.quality = thresholds.grade(mean_correlation, cell.mean_amplitude());

    Ok(cell)
}
