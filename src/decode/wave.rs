use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::Fields;
use crate::sentence::Sentence;
use crate::{Error, Result};

/// Source of the energy spectrum used for wave processing.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpectrumBasis {
    Pressure,
    Velocity,
    /// Acoustic surface tracking
    Ast,
}

impl SpectrumBasis {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pressure),
            1 => Some(Self::Velocity),
            3 => Some(Self::Ast),
            _ => None,
        }
    }
}

/// Directional wave processing method.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcessingMethod {
    Puv,
    Suv,
    Mlm,
    Mlmst,
}

impl ProcessingMethod {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Puv),
            2 => Some(Self::Suv),
            3 => Some(Self::Mlm),
            4 => Some(Self::Mlmst),
            _ => None,
        }
    }
}

/// Wave statistics from a `PNORW` sentence.
///
/// Heights are meters, periods seconds and directions degrees.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WaveData {
    pub date: DateTime<Utc>,
    pub spectrum_basis: SpectrumBasis,
    pub processing_method: ProcessingMethod,
    /// Significant wave height
    pub hm0: f64,
    /// Mean height of the highest third of waves
    pub h3: f64,
    /// Mean height of the highest tenth of waves
    pub h10: f64,
    pub hmax: f64,
    /// Mean energy period
    pub tm02: f64,
    /// Peak period
    pub tp: f64,
    /// Mean zero-crossing period
    pub tz: f64,
    pub peak_direction: f64,
    /// Directional spreading at the peak
    pub spreading: f64,
    pub mean_direction: f64,
    pub unidirectivity_index: f64,
    /// Decibar
    pub mean_pressure: f64,
    pub no_detects: u32,
    pub bad_detects: u32,
    /// Meters per second
    pub near_surface_current_speed: f64,
    pub near_surface_current_direction: f64,
    /// Error code as sent, hexadecimal, possibly empty.
    pub error_code: String,
}

impl WaveData {
    /// Number of fields in a `PNORW` sentence, including the tag.
    pub const FIELDS: usize = 22;
}

/// Decode a `PNORW` sentence. Any malformed numeric field fails the whole sentence.
///
/// # Errors
/// [Error::FieldCount] unless the sentence has exactly 22 fields, [Error::FieldParse]
/// for any malformed field.
pub fn decode(sentence: &Sentence) -> Result<WaveData> {
    let fields = Fields::new(sentence, WaveData::FIELDS..=WaveData::FIELDS)?;

    let spectrum_basis =
        SpectrumBasis::from_code(fields.u8(3)?).ok_or_else(|| Error::FieldParse {
            index: 3,
            value: fields.str(3).to_string(),
            expected: "spectrum basis code 0, 1 or 3",
        })?;
    let processing_method =
        ProcessingMethod::from_code(fields.u8(4)?).ok_or_else(|| Error::FieldParse {
            index: 4,
            value: fields.str(4).to_string(),
            expected: "processing method code 1 to 4",
        })?;

    Ok(WaveData {
        date: fields.datetime(1, 2)?,
        spectrum_basis,
        processing_method,
        hm0: fields.f64(5)?,
        h3: fields.f64(6)?,
        h10: fields.f64(7)?,
        hmax: fields.f64(8)?,
        tm02: fields.f64(9)?,
        tp: fields.f64(10)?,
        tz: fields.f64(11)?,
        peak_direction: fields.f64(12)?,
        spreading: fields.f64(13)?,
        mean_direction: fields.f64(14)?,
        unidirectivity_index: fields.f64(15)?,
        mean_pressure: fields.f64(16)?,
        no_detects: fields.u32(17)?,
        bad_detects: fields.u32(18)?,
        near_surface_current_speed: fields.f64(19)?,
        near_surface_current_direction: fields.f64(20)?,
        error_code: fields.str(21).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::frame;
    use chrono::TimeZone;

    const BODY: &str = "PNORW,073010,051001,3,4,0.55,0.51,0.63,0.82,2.52,3.80,2.60,\
                        302.1,36.2,305.4,0.48,22.37,0,1,0.21,297.3,0000";

    fn decode_body(body: &str) -> Result<WaveData> {
        let line = frame(body);
        decode(&Sentence::parse(&line)?)
    }

    #[test]
    fn decode_wave() {
        let wave = decode_body(BODY).unwrap();

        assert_eq!(wave.date, Utc.with_ymd_and_hms(2010, 7, 30, 5, 10, 1).unwrap());
        assert_eq!(wave.spectrum_basis, SpectrumBasis::Ast);
        assert_eq!(wave.processing_method, ProcessingMethod::Mlmst);
        assert_eq!(wave.hm0, 0.55);
        assert_eq!(wave.h3, 0.51);
        assert_eq!(wave.h10, 0.63);
        assert_eq!(wave.hmax, 0.82);
        assert_eq!(wave.tm02, 2.52);
        assert_eq!(wave.tp, 3.80);
        assert_eq!(wave.tz, 2.60);
        assert_eq!(wave.peak_direction, 302.1);
        assert_eq!(wave.spreading, 36.2);
        assert_eq!(wave.mean_direction, 305.4);
        assert_eq!(wave.unidirectivity_index, 0.48);
        assert_eq!(wave.mean_pressure, 22.37);
        assert_eq!(wave.no_detects, 0);
        assert_eq!(wave.bad_detects, 1);
        assert_eq!(wave.near_surface_current_speed, 0.21);
        assert_eq!(wave.near_surface_current_direction, 297.3);
        assert_eq!(wave.error_code, "0000");
    }

    #[test]
    fn empty_error_code_is_allowed() {
        let body = BODY.trim_end_matches("0000");
        let wave = decode_body(body).unwrap();
        assert_eq!(wave.error_code, "");
    }

    #[test]
    fn any_bad_number_fails_the_sentence() {
        let parts: Vec<&str> = BODY.split(',').collect();
        for index in 5..=20 {
            let mut broken = parts.clone();
            broken[index] = "n/a";
            let body = broken.join(",");
            match decode_body(&body) {
                Err(Error::FieldParse { index: got, .. }) => assert_eq!(got, index),
                other => panic!("field {index}: expected parse error, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        let body = BODY.replacen(",3,4,", ",2,4,", 1);
        assert!(matches!(
            decode_body(&body),
            Err(Error::FieldParse { index: 3, .. })
        ));
        let body = BODY.replacen(",3,4,", ",3,5,", 1);
        assert!(matches!(
            decode_body(&body),
            Err(Error::FieldParse { index: 4, .. })
        ));
    }

    #[test]
    fn decode_is_deterministic() {
        assert_eq!(decode_body(BODY).unwrap(), decode_body(BODY).unwrap());
    }
}
