use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decode::DecodedMessage;
use crate::profile::CurrentProfile;
use crate::sentence::MessageTag;
use crate::Error;

/// Per class counts of lines that could not be decoded.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub checksum: usize,
    pub format: usize,
    pub field_count: usize,
    pub field_parse: usize,
    pub unknown_type: usize,
    pub missing_config: usize,
}

impl ErrorSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.checksum
            + self.format
            + self.field_count
            + self.field_parse
            + self.unknown_type
            + self.missing_config
    }
}

/// Tracks stats on ingested lines and built profiles.
///
/// # Example
/// ```
/// use adcp::decode::Decoder;
/// use adcp::sentence::frame;
/// use adcp::Summary;
///
/// let decoder = Decoder::default();
/// let mut summary = Summary::default();
/// for line in [frame("PNORI,4,Signature1000,4,20,0.50,1.00,0"), "$PNORI*00".to_string()] {
///     match decoder.decode_line(&line, None) {
///         Ok(msg) => summary.add(&msg),
///         Err(err) => summary.add_error(&err),
///     }
/// }
/// assert_eq!(summary.lines, 2);
/// assert_eq!(summary.decoded, 1);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Lines offered, decoded or not.
    pub lines: usize,
    pub decoded: usize,
    pub tags: HashMap<MessageTag, usize>,
    pub errors: ErrorSummary,
    pub profiles_complete: usize,
    pub profiles_partial: usize,
    pub duplicate_cells: usize,
    /// Cells dropped because their profile was already built.
    pub late_cells: usize,
}

impl Summary {
    pub fn add(&mut self, msg: &DecodedMessage) {
        self.lines += 1;
        self.decoded += 1;
        *self.tags.entry(msg.tag()).or_default() += 1;
    }

    /// Count a line that failed with `err`. Errors that are not scoped to a line are
    /// ignored.
    pub fn add_error(&mut self, err: &Error) {
        let counter = match err {
            Error::Checksum { .. } => &mut self.errors.checksum,
            Error::Format { .. } => &mut self.errors.format,
            Error::FieldCount { .. } => &mut self.errors.field_count,
            Error::FieldParse { .. } => &mut self.errors.field_parse,
            Error::UnknownMessageType(_) => &mut self.errors.unknown_type,
            Error::MissingInstrumentConfig => &mut self.errors.missing_config,
            _ => return,
        };
        *counter += 1;
        self.lines += 1;
    }

    pub fn add_profile(&mut self, profile: &CurrentProfile) {
        if profile.complete {
            self.profiles_complete += 1;
        } else {
            self.profiles_partial += 1;
        }
        self.duplicate_cells += profile.duplicate_cells;
    }

    pub fn add_late_cell(&mut self) {
        self.late_cells += 1;
    }

    #[must_use]
    pub fn count(&self, tag: MessageTag) -> usize {
        self.tags.get(&tag).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Decoder;
    use crate::sentence::frame;
    use chrono::{TimeZone, Utc};

    #[test]
    fn summary() {
        let decoder = Decoder::default();
        let lines = [
            frame("PNORI,4,Signature1000,4,20,0.50,1.00,0"),
            frame("PNORI,4,Signature1000,4,20,0.50,1.00,0"),
            frame("PNORX,1"),
            frame("PNORI,4,Signature1000"),
            "$PNORI,4*00".to_string(),
            "PNORI,4".to_string(),
        ];

        let mut summary = Summary::default();
        for line in &lines {
            match decoder.decode_line(line, None) {
                Ok(msg) => summary.add(&msg),
                Err(err) => summary.add_error(&err),
            }
        }

        assert_eq!(summary.lines, 6);
        assert_eq!(summary.decoded, 2);
        assert_eq!(summary.count(MessageTag::InstrumentConfig), 2);
        assert_eq!(summary.count(MessageTag::Wave), 0);
        assert_eq!(summary.errors.unknown_type, 1);
        assert_eq!(summary.errors.field_count, 1);
        assert_eq!(summary.errors.checksum, 1);
        assert_eq!(summary.errors.format, 1);
        assert_eq!(summary.errors.total(), 4);
    }

    #[test]
    fn profiles_are_counted() {
        let key = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut profile = CurrentProfile::from_cells(key, 0, vec![], None, None);
        profile.duplicate_cells = 2;

        let mut summary = Summary::default();
        summary.add_profile(&profile);
        profile.complete = true;
        summary.add_profile(&profile);

        assert_eq!(summary.profiles_partial, 1);
        assert_eq!(summary.profiles_complete, 1);
        assert_eq!(summary.duplicate_cells, 4);
    }

    #[test]
    fn serializes_to_json() {
        let mut summary = Summary::default();
        summary.tags.insert(MessageTag::Wave, 3);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"Wave\":3"), "{json}");
    }
}
