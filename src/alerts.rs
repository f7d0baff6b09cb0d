//! Wave height and period limit checks.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::decode::WaveData;
use crate::parameter::WaveParameter;
use crate::{Error, Result};

/// Limits above which a wave record raises an alert.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AlertLimits {
    pub enabled: bool,
    /// Meters
    pub hm0: f64,
    /// Meters
    pub hmax: f64,
    /// Seconds
    pub tm02: f64,
}

impl Default for AlertLimits {
    fn default() -> Self {
        Self {
            enabled: false,
            hm0: 3.0,
            hmax: 5.0,
            tm02: 12.0,
        }
    }
}

/// A wave parameter that exceeded its limit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WaveAlert {
    pub parameter: WaveParameter,
    pub value: f64,
    pub limit: f64,
}

impl Display for WaveAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {:.2}{unit} > {}{unit}",
            self.parameter.label(),
            self.value,
            self.limit,
            unit = self.parameter.unit()
        )
    }
}

impl AlertLimits {
    fn limits(&self) -> [(WaveParameter, f64); 3] {
        [
            (WaveParameter::Hm0, self.hm0),
            (WaveParameter::Hmax, self.hmax),
            (WaveParameter::Tm02, self.tm02),
        ]
    }

    /// Parameters of `wave` strictly above their limit. Always empty when disabled.
    #[must_use]
    pub fn check(&self, wave: &WaveData) -> Vec<WaveAlert> {
        if !self.enabled {
            return Vec::new();
        }
        self.limits()
            .into_iter()
            .filter_map(|(parameter, limit)| {
                let value = parameter.value(wave);
                (value > limit).then_some(WaveAlert {
                    parameter,
                    value,
                    limit,
                })
            })
            .collect()
    }

    /// # Errors
    /// [Error::Config] if a limit is not a positive number.
    pub fn validate(&self) -> Result<()> {
        for (parameter, limit) in self.limits() {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(Error::Config(format!(
                    "alert limit for {parameter} must be positive, got {limit}"
                )));
            }
        }
        Ok(())
    }
}
