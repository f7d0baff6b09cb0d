//! Per message type field decoding.
//!
//! Each decoder is a pure function of a validated [Sentence]. Current cells additionally
//! take the session's [InstrumentConfig] as an explicit argument.
pub mod current;
pub mod environmental;
mod fields;
pub mod instrument;
pub mod wave;

pub use current::{cell_depth, CurrentCellData};
pub use environmental::{EnvironmentalData, Orientation};
pub use instrument::{CoordinateSystem, InstrumentConfig};
pub use wave::{ProcessingMethod, SpectrumBasis, WaveData};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::derived::QualityThresholds;
use crate::sentence::{MessageTag, Sentence};
use crate::{Error, Result};

/// A typed record decoded from one sentence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Wave(WaveData),
    Environmental(EnvironmentalData),
    InstrumentConfig(InstrumentConfig),
    CurrentCell(CurrentCellData),
}

impl DecodedMessage {
    #[must_use]
    pub fn tag(&self) -> MessageTag {
        match self {
            DecodedMessage::Wave(_) => MessageTag::Wave,
            DecodedMessage::Environmental(_) => MessageTag::Environmental,
            DecodedMessage::InstrumentConfig(_) => MessageTag::InstrumentConfig,
            DecodedMessage::CurrentCell(_) => MessageTag::CurrentCell,
        }
    }
}

/// Decodes sentences into [DecodedMessage]s.
///
/// # Example
/// ```
/// use adcp::decode::{DecodedMessage, Decoder};
/// use adcp::sentence::frame;
///
/// let decoder = Decoder::default();
/// let line = frame("PNORI,4,Signature1000,4,20,0.50,1.00,0");
/// let Ok(DecodedMessage::InstrumentConfig(config)) = decoder.decode_line(&line, None) else {
///     panic!("expected a configuration");
/// };
///
/// let line = frame("PNORC,010124,120000,3,0.1,0.2,0.0,0.0,0.22,26.6,C,110,110,110,110,85,85,85,85");
/// let Ok(DecodedMessage::CurrentCell(cell)) = decoder.decode_line(&line, Some(&config)) else {
///     panic!("expected a cell");
/// };
/// assert_eq!(cell.depth, 2.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    thresholds: QualityThresholds,
    require_instrument_config: bool,
}

impl Decoder {
    #[must_use]
    pub fn new(thresholds: QualityThresholds) -> Self {
        Decoder {
            thresholds,
            require_instrument_config: false,
        }
    }

    /// Fail current cells with [Error::MissingInstrumentConfig] instead of estimating
    /// their depth when no configuration is available.
    #[must_use]
    pub fn with_strict_config(mut self, strict: bool) -> Self {
        self.require_instrument_config = strict;
        self
    }

    #[must_use]
    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Validate and decode a single line.
    ///
    /// # Errors
    /// Any per-line [Error]; the caller may continue with the next line.
    pub fn decode_line(
        &self,
        line: &str,
        instrument: Option<&InstrumentConfig>,
    ) -> Result<DecodedMessage> {
        let sentence = Sentence::parse(line)?;
        let msg = self.decode(&sentence, instrument)?;
        trace!(tag = %sentence.tag, fields = sentence.len(), "decoded sentence");
        Ok(msg)
    }

    /// Decode an already validated sentence.
    ///
    /// # Errors
    /// [Error::FieldCount] or [Error::FieldParse] from the type specific decoder, or
    /// [Error::MissingInstrumentConfig] in strict mode.
    pub fn decode(
        &self,
        sentence: &Sentence,
        instrument: Option<&InstrumentConfig>,
    ) -> Result<DecodedMessage> {
        Ok(match sentence.tag {
            MessageTag::Wave => DecodedMessage::Wave(wave::decode(sentence)?),
            MessageTag::Environmental => {
                DecodedMessage::Environmental(environmental::decode(sentence)?)
            }
            MessageTag::InstrumentConfig => {
                DecodedMessage::InstrumentConfig(instrument::decode(sentence)?)
            }
            MessageTag::CurrentCell => {
                if instrument.is_none() && self.require_instrument_config {
                    return Err(Error::MissingInstrumentConfig);
                }
                DecodedMessage::CurrentCell(current::decode(
                    sentence,
                    instrument,
                    &self.thresholds,
                )?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::frame;

    const CELL: &str =
        "PNORC,010124,120000,3,0.1,0.2,0.0,0.0,0.22,26.6,C,110,110,110,110,85,85,85,85";

    #[test]
    fn dispatch_by_tag() {
        let decoder = Decoder::default();
        for (body, tag) in [
            ("PNORI,4,Signature1000,4,20,0.50,1.00,0", MessageTag::InstrumentConfig),
            (
                "PNORS,010124,120000,00000000,2A480000,14.4,1523.0,275.9,3.0,4.0,15.1,20.4",
                MessageTag::Environmental,
            ),
            (CELL, MessageTag::CurrentCell),
            (
                "PNORW,073010,051001,3,4,0.55,0.51,0.63,0.82,2.52,3.80,2.60,302.1,36.2,305.4,0.48,22.37,0,1,0.21,297.3,0000",
                MessageTag::Wave,
            ),
        ] {
            let msg = decoder.decode_line(&frame(body), None).unwrap();
            assert_eq!(msg.tag(), tag);
        }
    }

    #[test]
    fn strict_mode_requires_config() {
        let decoder = Decoder::default().with_strict_config(true);
        assert!(matches!(
            decoder.decode_line(&frame(CELL), None),
            Err(Error::MissingInstrumentConfig)
        ));

        let lenient = Decoder::default();
        let Ok(DecodedMessage::CurrentCell(cell)) = lenient.decode_line(&frame(CELL), None) else {
            panic!("expected a cell");
        };
        assert!(cell.depth_estimated);
        assert_eq!(cell.depth, 3.0);
    }

    #[test]
    fn decoding_twice_is_identical() {
        let decoder = Decoder::default();
        let line = frame(CELL);
        assert_eq!(
            decoder.decode_line(&line, None).unwrap(),
            decoder.decode_line(&line, None).unwrap()
        );
    }

    #[test]
    fn errors_are_per_line() {
        let decoder = Decoder::default();
        for line in [
            "garbage".to_string(),
            frame("PNORX,1,2"),
            frame("PNORI,4,X,9,20,0.5,1.0,0"),
            frame("PNORI,4,X"),
            frame(CELL).replace('*', "0*"),
        ] {
            let err = decoder.decode_line(&line, None).unwrap_err();
            assert!(err.is_per_line(), "{err}");
        }
    }
}
