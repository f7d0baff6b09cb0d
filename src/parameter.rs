//! Typed selectors for the values served by dataset queries.
//!
//! Parameter names use the camelCase spelling the presentation layer sends, e.g.
//! `"hm0"`, `"batteryVoltage"`, `"eastVelocity"`.
use std::fmt::Display;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::decode::{CurrentCellData, EnvironmentalData, WaveData};
use crate::profile::CurrentProfile;
use crate::{Error, Result};

macro_rules! parameters {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($text:literal, $label:literal, $unit:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
        #[serde(rename_all = "camelCase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name of the parameter.
            #[must_use]
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            #[must_use]
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Unit of the values, empty for dimensionless values.
            #[must_use]
            pub fn unit(&self) -> &'static str {
                match self {
                    $($name::$variant => $unit),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                $name::ALL
                    .iter()
                    .find(|p| p.name() == s)
                    .copied()
                    .ok_or_else(|| Error::Config(format!(
                        "unknown {} {s:?}", stringify!($name)
                    )))
            }
        }
    };
}

parameters! {
    /// Values of a [WaveData] record.
    WaveParameter {
        Hm0 => ("hm0", "Significant Wave Height", "m"),
        H3 => ("h3", "H1/3", "m"),
        H10 => ("h10", "H1/10", "m"),
        Hmax => ("hmax", "Maximum Wave Height", "m"),
        Tm02 => ("tm02", "Mean Energy Period", "s"),
        Tp => ("tp", "Peak Period", "s"),
        Tz => ("tz", "Zero-Crossing Period", "s"),
        PeakDirection => ("dirTp", "Peak Direction", "°"),
        Spreading => ("sprTp", "Directional Spreading", "°"),
        MeanDirection => ("mainDirection", "Mean Direction", "°"),
        UnidirectivityIndex => ("unidirectivityIndex", "Unidirectionality", ""),
        MeanPressure => ("meanPressure", "Mean Pressure", "dBar"),
        NoDetects => ("noDetects", "No Detects", "count"),
        BadDetects => ("badDetects", "Bad Detects", "count"),
        NearSurfaceCurrentSpeed => ("nearSurfaceCurrentSpeed", "Surface Current Speed", "m/s"),
        NearSurfaceCurrentDirection => ("nearSurfaceCurrentDirection", "Surface Current Direction", "°"),
    }
}

parameters! {
    /// Values of an [EnvironmentalData] record.
    EnvironmentalParameter {
        BatteryVoltage => ("batteryVoltage", "Battery Voltage", "V"),
        SoundSpeed => ("soundSpeed", "Sound Speed", "m/s"),
        Heading => ("heading", "Heading", "°"),
        Pitch => ("pitch", "Pitch", "°"),
        Roll => ("roll", "Roll", "°"),
        Tilt => ("tilt", "Tilt", "°"),
        Pressure => ("pressure", "Pressure", "dBar"),
        Temperature => ("temperature", "Temperature", "°C"),
    }
}

parameters! {
    /// Profile level aggregates of a [CurrentProfile].
    ProfileParameter {
        MeanSpeed => ("speed", "Speed", "m/s"),
        MeanDirection => ("direction", "Direction", "°"),
        ValidCellCount => ("validCellCount", "Valid Cells", "count"),
    }
}

parameters! {
    /// Values of a single [CurrentCellData]. Amplitude and correlation are beam means.
    CellParameter {
        EastVelocity => ("eastVelocity", "East Velocity", "m/s"),
        NorthVelocity => ("northVelocity", "North Velocity", "m/s"),
        UpVelocity1 => ("upVelocity1", "Up Velocity 1", "m/s"),
        UpVelocity2 => ("upVelocity2", "Up Velocity 2", "m/s"),
        Speed => ("speed", "Speed", "m/s"),
        Direction => ("direction", "Direction", "°"),
        Amplitude => ("amplitude", "Amplitude", "counts"),
        Correlation => ("correlation", "Correlation", "%"),
    }
}

impl WaveParameter {
    #[must_use]
    pub fn value(&self, wave: &WaveData) -> f64 {
        match self {
            Self::Hm0 => wave.hm0,
            Self::H3 => wave.h3,
            Self::H10 => wave.h10,
            Self::Hmax => wave.hmax,
            Self::Tm02 => wave.tm02,
            Self::Tp => wave.tp,
            Self::Tz => wave.tz,
            Self::PeakDirection => wave.peak_direction,
            Self::Spreading => wave.spreading,
            Self::MeanDirection => wave.mean_direction,
            Self::UnidirectivityIndex => wave.unidirectivity_index,
            Self::MeanPressure => wave.mean_pressure,
            Self::NoDetects => f64::from(wave.no_detects),
            Self::BadDetects => f64::from(wave.bad_detects),
            Self::NearSurfaceCurrentSpeed => wave.near_surface_current_speed,
            Self::NearSurfaceCurrentDirection => wave.near_surface_current_direction,
        }
    }
}

impl EnvironmentalParameter {
    #[must_use]
    pub fn value(&self, env: &EnvironmentalData) -> f64 {
        match self {
            Self::BatteryVoltage => env.battery_voltage,
            Self::SoundSpeed => env.sound_speed,
            Self::Heading => env.heading,
            Self::Pitch => env.pitch,
            Self::Roll => env.roll,
            Self::Tilt => env.tilt,
            Self::Pressure => env.pressure,
            Self::Temperature => env.temperature,
        }
    }
}

impl ProfileParameter {
    #[must_use]
    pub fn value(&self, profile: &CurrentProfile) -> f64 {
        match self {
            Self::MeanSpeed => profile.mean_speed,
            Self::MeanDirection => profile.mean_direction,
            Self::ValidCellCount => profile.valid_cell_count as f64,
        }
    }
}

impl CellParameter {
    /// Value for `cell`, `None` when the cell does not report it.
    #[must_use]
    pub fn value(&self, cell: &CurrentCellData) -> Option<f64> {
        let value = match self {
            Self::EastVelocity => cell.east_velocity,
            Self::NorthVelocity => cell.north_velocity,
            Self::UpVelocity1 => cell.up_velocity1,
            Self::UpVelocity2 => cell.up_velocity2?,
            Self::Speed => cell.speed,
            Self::Direction => cell.direction,
            Self::Amplitude => cell.mean_amplitude(),
            Self::Correlation => cell.mean_correlation(),
        };
        value.is_finite().then_some(value)
    }
}

/// A time series source: which history to read and which value to extract.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SeriesParameter {
    Wave(WaveParameter),
    Environmental(EnvironmentalParameter),
    Profile(ProfileParameter),
}

impl SeriesParameter {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Wave(p) => p.label(),
            Self::Environmental(p) => p.label(),
            Self::Profile(p) => p.label(),
        }
    }

    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Wave(p) => p.unit(),
            Self::Environmental(p) => p.unit(),
            Self::Profile(p) => p.unit(),
        }
    }
}

impl From<WaveParameter> for SeriesParameter {
    fn from(p: WaveParameter) -> Self {
        Self::Wave(p)
    }
}

impl From<EnvironmentalParameter> for SeriesParameter {
    fn from(p: EnvironmentalParameter) -> Self {
        Self::Environmental(p)
    }
}

impl From<ProfileParameter> for SeriesParameter {
    fn from(p: ProfileParameter) -> Self {
        Self::Profile(p)
    }
}

impl FromStr for SeriesParameter {
    type Err = Error;

    /// Environmental names are tried first, then profile aggregates, then wave names.
    fn from_str(s: &str) -> Result<Self> {
        s.parse::<EnvironmentalParameter>()
            .map(Self::Environmental)
            .or_else(|_| s.parse::<ProfileParameter>().map(Self::Profile))
            .or_else(|_| s.parse::<WaveParameter>().map(Self::Wave))
            .map_err(|_| Error::Config(format!("unknown series parameter {s:?}")))
    }
}

/// Parse a query window such as `"1h"`, `"7d"` or `"90s"`.
///
/// Accepted units are `s`, `m`, `h` and `d`.
///
/// # Errors
/// [Error::Config] if the text is not a positive count followed by a unit.
pub fn parse_window(s: &str) -> Result<Duration> {
    let err = || Error::Config(format!("invalid time window {s:?}"));
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(err)?;
    let (count, unit) = s.split_at(split);
    let count: i64 = count.parse().map_err(|_| err())?;
    if count <= 0 {
        return Err(err());
    }
    let duration = match unit {
        "s" => Duration::try_seconds(count),
        "m" => Duration::try_minutes(count),
        "h" => Duration::try_hours(count),
        "d" => Duration::try_days(count),
        _ => None,
    };
    duration.ok_or_else(err)
}
