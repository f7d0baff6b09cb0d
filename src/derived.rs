//! Quantities derived from decoded measurements.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Total instrument tilt in degrees from pitch and roll.
#[must_use]
pub fn tilt(pitch: f64, roll: f64) -> f64 {
    (pitch * pitch + roll * roll).sqrt()
}

/// Arithmetic mean, or `None` for an empty slice or a non-finite result.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    mean.is_finite().then_some(mean)
}

/// Direction of the mean velocity vector in degrees clockwise from north, normalized
/// into `[0, 360)`.
///
/// Returns `None` when there are no components or the result would not be finite, in
/// which case callers substitute 0 and flag the record.
///
/// ```
/// let dir = adcp::derived::circular_mean(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
/// assert!((dir - 45.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn circular_mean(east: &[f64], north: &[f64]) -> Option<f64> {
    if east.len() != north.len() {
        return None;
    }
    let mean_east = mean(east)?;
    let mean_north = mean(north)?;
    let mut direction = mean_east.atan2(mean_north).to_degrees();
    if direction < 0.0 {
        direction += 360.0;
    }
    // -0.0 and values rounding up to 360 both belong at 0
    if direction >= 360.0 || direction == 0.0 {
        direction = 0.0;
    }
    direction.is_finite().then_some(direction)
}

/// Coarse reliability classification of a current reading.
///
/// Ordered from worst to best so the lower of two grades is their `min`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QualityGrade {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QualityGrade::Poor => "poor",
            QualityGrade::Fair => "fair",
            QualityGrade::Good => "good",
            QualityGrade::Excellent => "excellent",
        };
        write!(f, "{s}")
    }
}

/// Grading thresholds for beam correlation (percent) and echo amplitude (counts).
///
/// Each mean is placed in the highest tier whose threshold it meets; the final grade is
/// the lower of the correlation and amplitude tiers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct QualityThresholds {
    pub correlation_excellent: f64,
    pub correlation_good: f64,
    pub correlation_fair: f64,
    pub amplitude_excellent: f64,
    pub amplitude_good: f64,
    pub amplitude_fair: f64,
    /// A cell is valid only when its mean correlation is strictly above this value.
    pub min_valid_correlation: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            correlation_excellent: 80.0,
            correlation_good: 70.0,
            correlation_fair: 50.0,
            amplitude_excellent: 100.0,
            amplitude_good: 80.0,
            amplitude_fair: 50.0,
            min_valid_correlation: 50.0,
        }
    }
}

impl QualityThresholds {
    /// Grade a reading from its mean correlation and mean amplitude.
    #[must_use]
    pub fn grade(&self, mean_correlation: f64, mean_amplitude: f64) -> QualityGrade {
        let correlation = tier(
            mean_correlation,
            self.correlation_excellent,
            self.correlation_good,
            self.correlation_fair,
        );
        let amplitude = tier(
            mean_amplitude,
            self.amplitude_excellent,
            self.amplitude_good,
            self.amplitude_fair,
        );
        correlation.min(amplitude)
    }

    /// Validity rule for a single cell.
    #[must_use]
    pub fn is_valid(&self, mean_correlation: f64, speed: f64) -> bool {
        mean_correlation > self.min_valid_correlation && speed.is_finite()
    }

    /// # Errors
    /// [Error::Config] if a set of tiers is not ordered `excellent >= good >= fair` or a
    /// threshold is not finite.
    pub fn validate(&self) -> Result<()> {
        let sets = [
            (
                "correlation",
                self.correlation_excellent,
                self.correlation_good,
                self.correlation_fair,
            ),
            (
                "amplitude",
                self.amplitude_excellent,
                self.amplitude_good,
                self.amplitude_fair,
            ),
        ];
        for (name, excellent, good, fair) in sets {
            if ![excellent, good, fair].iter().all(|v| v.is_finite()) {
                return Err(Error::Config(format!("{name} thresholds must be finite")));
            }
            if !(excellent >= good && good >= fair) {
                return Err(Error::Config(format!(
                    "{name} thresholds must satisfy excellent >= good >= fair; got {excellent}, {good}, {fair}"
                )));
            }
        }
        if !self.min_valid_correlation.is_finite() {
            return Err(Error::Config(
                "min_valid_correlation must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

fn tier(value: f64, excellent: f64, good: f64, fair: f64) -> QualityGrade {
    if value >= excellent {
        QualityGrade::Excellent
    } else if value >= good {
        QualityGrade::Good
    } else if value >= fair {
        QualityGrade::Fair
    } else {
        // NaN lands here as well
        QualityGrade::Poor
    }
}
