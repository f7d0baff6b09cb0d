use std::path::PathBuf;

use chrono::{DateTime, Duration, TimeZone, Utc};

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

/// Lines of a fixture capture with their CR/LF terminators intact.
pub fn fixture_lines(name: &str) -> Vec<String> {
    let data = std::fs::read_to_string(fixture_path(name)).unwrap();
    data.split_inclusive('\n').map(str::to_string).collect()
}

/// `secs` after the sampling instant of the first profile in the capture.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}
