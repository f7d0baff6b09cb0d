//! Positional field access with error reporting by field index.
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::sentence::{MessageTag, Sentence};
use crate::{Error, Result};

/// Borrowed view over a validated sentence's fields.
///
/// Indexes are positions in the sentence with the tag at 0, the same numbering used in
/// [Error::FieldParse].
pub(crate) struct Fields<'a> {
    fields: &'a [&'a str],
}

impl<'a> Fields<'a> {
    /// Wrap `sentence`, failing closed unless its field count is in `expected`.
    pub fn new(
        sentence: &'a Sentence<'a>,
        expected: std::ops::RangeInclusive<usize>,
    ) -> Result<Self> {
        check_count(sentence.tag, sentence.len(), expected)?;
        Ok(Fields {
            fields: &sentence.fields,
        })
    }

    /// Raw text of field `index`, empty when the field is absent.
    pub fn str(&self, index: usize) -> &'a str {
        self.fields.get(index).copied().unwrap_or("")
    }

    fn parse<T: FromStr>(&self, index: usize, expected: &'static str) -> Result<T> {
        let value = self.str(index);
        value.trim().parse().map_err(|_| Error::FieldParse {
            index,
            value: value.to_string(),
            expected,
        })
    }

    pub fn f64(&self, index: usize) -> Result<f64> {
        self.parse(index, "number")
    }

    /// Like [Fields::f64] but an empty or absent field is `None`.
    pub fn opt_f64(&self, index: usize) -> Result<Option<f64>> {
        if self.str(index).trim().is_empty() {
            Ok(None)
        } else {
            self.f64(index).map(Some)
        }
    }

    pub fn u32(&self, index: usize) -> Result<u32> {
        self.parse(index, "unsigned integer")
    }

    pub fn u16(&self, index: usize) -> Result<u16> {
        self.parse(index, "unsigned integer")
    }

    pub fn u8(&self, index: usize) -> Result<u8> {
        self.parse(index, "unsigned integer")
    }

    /// Parse a hexadecimal status word.
    pub fn hex_u32(&self, index: usize) -> Result<u32> {
        let value = self.str(index);
        u32::from_str_radix(value.trim(), 16).map_err(|_| Error::FieldParse {
            index,
            value: value.to_string(),
            expected: "hexadecimal status code",
        })
    }

    /// Decode an `MMDDYY` date field and an `HHMMSS` time field into a UTC instant.
    /// Years are offset from 2000.
    pub fn datetime(&self, date_index: usize, time_index: usize) -> Result<DateTime<Utc>> {
        let [month, day, year] = six_digits(self.str(date_index), date_index, "MMDDYY date")?;
        let [hour, minute, second] = six_digits(self.str(time_index), time_index, "HHMMSS time")?;

        let date = NaiveDate::from_ymd_opt(2000 + year as i32, month, day).ok_or_else(|| {
            Error::FieldParse {
                index: date_index,
                value: self.str(date_index).to_string(),
                expected: "calendar date",
            }
        })?;
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
            Error::FieldParse {
                index: time_index,
                value: self.str(time_index).to_string(),
                expected: "time of day",
            }
        })?;
        Ok(NaiveDateTime::new(date, time).and_utc())
    }
}

/// Split a 6 character numeric field into three 2 digit values.
fn six_digits(value: &str, index: usize, expected: &'static str) -> Result<[u32; 3]> {
    let err = || Error::FieldParse {
        index,
        value: value.to_string(),
        expected,
    };
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }
    let pair = |start: usize| value[start..start + 2].parse::<u32>().map_err(|_| err());
    Ok([pair(0)?, pair(2)?, pair(4)?])
}

pub(crate) fn check_count(
    tag: MessageTag,
    actual: usize,
    expected: std::ops::RangeInclusive<usize>,
) -> Result<()> {
    if expected.contains(&actual) {
        return Ok(());
    }
    let expected = if expected.start() == expected.end() {
        expected.start().to_string()
    } else {
        format!("{} to {}", expected.start(), expected.end())
    };
    Err(Error::FieldCount {
        tag,
        expected,
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn sentence(fields: &[&'static str]) -> Sentence<'static> {
        Sentence {
            tag: MessageTag::Wave,
            fields: fields.to_vec(),
        }
    }

    #[test]
    fn datetime_decodes_fixed_subfields() {
        let s = sentence(&["PNORW", "123124", "235958"]);
        let fields = Fields::new(&s, 3..=3).unwrap();
        let dt = fields.datetime(1, 2).unwrap();

        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 12);
        assert_eq!(dt.day(), 31);
        assert_eq!(dt.hour(), 23);
        assert_eq!(dt.minute(), 59);
        assert_eq!(dt.second(), 58);
    }

    #[test]
    fn datetime_rejects_malformed() {
        for (date, time, bad_index) in [
            ("1231", "235958", 1),
            ("12312a", "235958", 1),
            ("123124", "23:59:", 2),
            ("133124", "235958", 1),
            ("123124", "256000", 2),
            ("123124", "236100", 2),
            ("123124", "235960", 2),
            ("023024", "120000", 1),
            ("023024", "256000", 1),
        ] {
            let s = sentence(&["PNORW", date, time]);
            let fields = Fields::new(&s, 3..=3).unwrap();
            match fields.datetime(1, 2) {
                Err(Error::FieldParse { index, .. }) => assert_eq!(index, bad_index, "{date} {time}"),
                other => panic!("expected field error for {date} {time}, got {other:?}"),
            }
        }
    }

    #[test]
    fn count_is_checked() {
        let s = sentence(&["PNORW", "1", "2"]);
        match Fields::new(&s, 4..=5) {
            Err(Error::FieldCount {
                expected, actual, ..
            }) => {
                assert_eq!(expected, "4 to 5");
                assert_eq!(actual, 3);
            }
            Err(err) => panic!("unexpected error {err}"),
            Ok(_) => panic!("expected field count error"),
        }
    }

    #[test]
    fn numeric_fields() {
        let s = sentence(&["PNORW", "1.5", "", "abc", "2A480000", " 7 "]);
        let fields = Fields::new(&s, 6..=6).unwrap();

        assert_eq!(fields.f64(1).unwrap(), 1.5);
        assert_eq!(fields.opt_f64(2).unwrap(), None);
        assert_eq!(fields.opt_f64(1).unwrap(), Some(1.5));
        assert!(matches!(
            fields.f64(3),
            Err(Error::FieldParse { index: 3, .. })
        ));
        assert_eq!(fields.hex_u32(4).unwrap(), 0x2A48_0000);
        assert_eq!(fields.u8(5).unwrap(), 7);
        assert!(fields.f64(2).is_err());
    }
}
