use std::path::Path;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::alerts::AlertLimits;
use crate::dataset::Capacity;
use crate::derived::QualityThresholds;
use crate::profile::CompletionPolicy;
use crate::{Error, Result};

/// Settings for a [Session](crate::Session).
///
/// Every field has a default so a partial JSON document, or `{}`, is a valid configuration.
///
/// # Example
/// ```
/// use adcp::{Config, AlertLimits};
///
/// let config = Config::builder()
///     .alerts(AlertLimits { enabled: true, ..Default::default() })
///     .require_instrument_config(true)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Serialize, Deserialize, TypedBuilder, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Cell grading and validity thresholds.
    #[builder(default)]
    pub quality: QualityThresholds,
    /// Number of records kept per history.
    #[builder(default)]
    pub capacity: Capacity,
    /// When partially received profiles are flushed.
    #[builder(default)]
    pub completion: CompletionPolicy,
    #[builder(default)]
    pub alerts: AlertLimits,
    /// Reject current cells received before any instrument configuration instead of
    /// estimating their depth.
    #[builder(default)]
    pub require_instrument_config: bool,
}

impl Config {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// [Error::Json] if the document cannot be parsed, [Error::Config] if it is invalid.
    pub fn from_json(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    /// [Error::Io] if the file cannot be read, otherwise as [Config::from_json].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// # Errors
    /// [Error::Config] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.quality.validate()?;
        self.capacity.validate()?;
        self.alerts.validate()?;
        if self.completion.max_open == 0 {
            return Err(Error::Config("max_open must be positive".to_string()));
        }
        if self.completion.stale_after_secs < 0 {
            return Err(Error::Config(format!(
                "stale_after_secs must not be negative, got {}",
                self.completion.stale_after_secs
            )));
        }
        Ok(())
    }
}
