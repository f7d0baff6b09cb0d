//! Sentence framing and checksum validation.
//!
//! Every telemetry line is framed as `$<TAG>,<field1>,...,<fieldN>*<CK>` where `CK` is two
//! hex digits holding the XOR of every byte between the `$` and the `*`.
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Leading character of every sentence.
pub const SENTINEL: char = '$';
/// Separates the sentence body from its checksum.
pub const CHECKSUM_DELIMITER: char = '*';

/// Message types understood by the decoder.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageTag {
    /// `PNORW`, wave statistics.
    Wave,
    /// `PNORI`, instrument configuration.
    InstrumentConfig,
    /// `PNORS`, sensor and status data.
    Environmental,
    /// `PNORC`, current velocity for one cell.
    CurrentCell,
}

impl MessageTag {
    pub const ALL: [MessageTag; 4] = [
        MessageTag::Wave,
        MessageTag::InstrumentConfig,
        MessageTag::Environmental,
        MessageTag::CurrentCell,
    ];

    /// The tag text as it appears on the wire, without the sentinel.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageTag::Wave => "PNORW",
            MessageTag::InstrumentConfig => "PNORI",
            MessageTag::Environmental => "PNORS",
            MessageTag::CurrentCell => "PNORC",
        }
    }
}

impl Display for MessageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MessageTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| Error::UnknownMessageType(s.to_string()))
    }
}

/// A sentence that passed framing and checksum validation.
///
/// `fields` holds every comma separated value of the body, including the tag at index 0,
/// so indexes match the positions used when reporting field errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence<'a> {
    pub tag: MessageTag,
    pub fields: Vec<&'a str>,
}

impl<'a> Sentence<'a> {
    /// Validate `line` and split it into its tag and fields.
    ///
    /// # Errors
    /// [Error::Format] if the line is not framed correctly, [Error::Checksum] if the
    /// checksum does not match, or [Error::UnknownMessageType] if the checksum is valid but
    /// the tag is not one we decode.
    pub fn parse(line: &'a str) -> Result<Self> {
        let body = validate(line)?;
        let fields: Vec<&str> = body.split(',').collect();
        let tag = fields[0].parse()?;
        Ok(Sentence { tag, fields })
    }

    /// Number of fields, including the tag.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// XOR of all bytes in `body`.
#[must_use]
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Frame `body` (the text between `$` and `*`) into a complete sentence.
///
/// ```
/// let line = adcp::sentence::frame("PNORI,4,Signature1000,4,20,0.50,1.00,0");
/// assert!(adcp::sentence::validate(&line).is_ok());
/// ```
#[must_use]
pub fn frame(body: &str) -> String {
    format!("{SENTINEL}{body}{CHECKSUM_DELIMITER}{:02X}", checksum(body))
}

/// Check framing and checksum of `line`, returning the body without the sentinel and
/// checksum. Trailing CR/LF is ignored and the checksum digits are compared
/// case-insensitively.
///
/// # Errors
/// [Error::Format] for framing problems and [Error::Checksum] when the checksum does not
/// match.
pub fn validate(line: &str) -> Result<&str> {
    let format_err = |reason: &str| Error::Format {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = trimmed.strip_prefix(SENTINEL) else {
        return Err(format_err("missing leading '$'"));
    };

    let mut parts = rest.split(CHECKSUM_DELIMITER);
    let (Some(body), Some(digits), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format_err("expected exactly one '*'"));
    };

    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format_err("checksum must be two hex digits"));
    }
    let expected = u8::from_str_radix(digits, 16)
        .map_err(|_| format_err("checksum must be two hex digits"))?;
    let actual = checksum(body);
    if expected != actual {
        return Err(Error::Checksum {
            line: line.to_string(),
            expected,
            actual,
        });
    }

    if body.is_empty() {
        return Err(format_err("empty sentence body"));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Checksums below computed independently of this module.
    const CONFIG_LINE: &str = "$PNORI,4,Signature1000,4,20,0.50,1.00,0*15";

    #[test]
    fn known_checksum() {
        let body = "PNORI,4,Signature1000,4,20,0.50,1.00,0";
        assert_eq!(checksum(body), 0x15);
        assert_eq!(frame(body), CONFIG_LINE);
    }

    #[test]
    fn validate_accepts_known_line() {
        let body = validate(CONFIG_LINE).unwrap();
        assert_eq!(body, "PNORI,4,Signature1000,4,20,0.50,1.00,0");
    }

    #[test]
    fn validate_ignores_crlf_and_case() {
        let body = "PNORC,010124,120000,1,0.1,0.2,0.0,,0.22,26.6,C,90,90,90,90,80,80,80,80";
        let lower = format!("${body}*{:02x}\r\n", checksum(body));
        assert_eq!(validate(&lower).unwrap(), body);
        assert!(validate(&format!("{CONFIG_LINE}\n")).is_ok());
    }

    #[test]
    fn validate_rejects_bad_checksum() {
        let line = CONFIG_LINE.replace("*15", "*10");
        match validate(&line) {
            Err(Error::Checksum {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0x10);
                assert_eq!(actual, 0x15);
            }
            other => panic!("expected checksum error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_framing() {
        for line in [
            "PNORI,4*0F",
            "$PNORI,4",
            "$PNORI,4*0F*0F",
            "$PNORI,4*F",
            "$PNORI,4*GG",
            "",
        ] {
            assert!(
                matches!(validate(line), Err(Error::Format { .. })),
                "{line:?} should be a format error"
            );
        }
    }

    #[test]
    fn parse_splits_fields() {
        let sentence = Sentence::parse(CONFIG_LINE).unwrap();
        assert_eq!(sentence.tag, MessageTag::InstrumentConfig);
        assert_eq!(sentence.len(), 8);
        assert_eq!(sentence.fields[0], "PNORI");
        assert_eq!(sentence.fields[2], "Signature1000");
    }

    #[test]
    fn parse_unknown_tag() {
        let line = frame("GPGGA,1,2,3");
        match Sentence::parse(&line) {
            Err(Error::UnknownMessageType(tag)) => assert_eq!(tag, "GPGGA"),
            other => panic!("expected unknown message type, got {other:?}"),
        }
    }

    #[test]
    fn tag_roundtrip() {
        for tag in MessageTag::ALL {
            assert_eq!(tag.as_str().parse::<MessageTag>().unwrap(), tag);
        }
    }
}
