//! Bounded history of decoded records and the read-only queries over it.
use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::decode::{EnvironmentalData, InstrumentConfig, WaveData};
use crate::parameter::{CellParameter, SeriesParameter};
use crate::profile::CurrentProfile;
use crate::{Error, Result};

/// A record with the time it was received by the session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    pub received: DateTime<Utc>,
    pub record: T,
}

/// Fixed capacity FIFO of [Stamped] records; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct History<T> {
    capacity: usize,
    items: VecDeque<Stamped<T>>,
}

impl<T> History<T> {
    /// # Panics
    /// If `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        History {
            capacity,
            items: VecDeque::new(),
        }
    }

    /// Append `item`, returning the evicted record when at capacity.
    pub fn push(&mut self, item: Stamped<T>) -> Option<Stamped<T>> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Stamped<T>> {
        self.items.back()
    }

    /// Records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Stamped<T>> {
        self.items.iter()
    }

    /// Records received at or after `cutoff`, in arrival order.
    pub fn since(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &Stamped<T>> {
        self.items.iter().filter(move |s| s.received >= cutoff)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// History capacities per record kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Capacity {
    pub wave: usize,
    pub environmental: usize,
    pub profile: usize,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            wave: 100,
            environmental: 500,
            profile: 100,
        }
    }
}

impl Capacity {
    /// # Errors
    /// [Error::Config] if any capacity is 0.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("wave", self.wave),
            ("environmental", self.environmental),
            ("profile", self.profile),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} capacity must be positive")));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Wave,
    Environmental,
    Profile,
    InstrumentConfig,
}

/// A record to be stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Record {
    Wave(WaveData),
    Environmental(EnvironmentalData),
    Profile(CurrentProfile),
    InstrumentConfig(InstrumentConfig),
}

impl Record {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Wave(_) => RecordKind::Wave,
            Record::Environmental(_) => RecordKind::Environmental,
            Record::Profile(_) => RecordKind::Profile,
            Record::InstrumentConfig(_) => RecordKind::InstrumentConfig,
        }
    }
}

/// Borrowed latest record of one kind.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub enum Latest<'a> {
    Wave(&'a WaveData),
    Environmental(&'a EnvironmentalData),
    Profile(&'a CurrentProfile),
    InstrumentConfig(&'a InstrumentConfig),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    /// Measurement time reported by the instrument.
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One cell of a time/depth grid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// Profile sampling instant.
    pub timestamp: DateTime<Utc>,
    /// Distance from the transducer in meters.
    pub depth: f64,
    pub value: f64,
}

/// Histories and latest records for one instrument session.
///
/// Queries take `&self` and never modify the dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    waves: History<WaveData>,
    environmental: History<EnvironmentalData>,
    profiles: History<CurrentProfile>,
    instrument_config: Option<Stamped<InstrumentConfig>>,
    last_update: Option<DateTime<Utc>>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(&Capacity::default())
    }
}

impl Dataset {
    /// # Panics
    /// If any capacity is 0, see [Capacity::validate].
    #[must_use]
    pub fn new(capacity: &Capacity) -> Self {
        Dataset {
            waves: History::new(capacity.wave),
            environmental: History::new(capacity.environmental),
            profiles: History::new(capacity.profile),
            instrument_config: None,
            last_update: None,
        }
    }

    /// Store `record`, evicting the oldest of its kind when at capacity, and make it the
    /// latest of its kind.
    pub fn record(&mut self, record: Record, received: DateTime<Utc>) {
        match record {
            Record::Wave(record) => {
                self.waves.push(Stamped { received, record });
            }
            Record::Environmental(record) => {
                self.environmental.push(Stamped { received, record });
            }
            Record::Profile(record) => {
                self.profiles.push(Stamped { received, record });
            }
            Record::InstrumentConfig(record) => {
                self.instrument_config = Some(Stamped { received, record });
            }
        }
        self.last_update = Some(received);
    }

    #[must_use]
    pub fn waves(&self) -> &History<WaveData> {
        &self.waves
    }

    #[must_use]
    pub fn environmental(&self) -> &History<EnvironmentalData> {
        &self.environmental
    }

    #[must_use]
    pub fn profiles(&self) -> &History<CurrentProfile> {
        &self.profiles
    }

    #[must_use]
    pub fn latest_wave(&self) -> Option<&WaveData> {
        self.waves.latest().map(|s| &s.record)
    }

    #[must_use]
    pub fn latest_environmental(&self) -> Option<&EnvironmentalData> {
        self.environmental.latest().map(|s| &s.record)
    }

    #[must_use]
    pub fn latest_profile(&self) -> Option<&CurrentProfile> {
        self.profiles.latest().map(|s| &s.record)
    }

    #[must_use]
    pub fn instrument_config(&self) -> Option<&InstrumentConfig> {
        self.instrument_config.as_ref().map(|s| &s.record)
    }

    /// Arrival time of the most recently stored record.
    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    #[must_use]
    pub fn latest(&self, kind: RecordKind) -> Option<Latest<'_>> {
        match kind {
            RecordKind::Wave => self.latest_wave().map(Latest::Wave),
            RecordKind::Environmental => self.latest_environmental().map(Latest::Environmental),
            RecordKind::Profile => self.latest_profile().map(Latest::Profile),
            RecordKind::InstrumentConfig => {
                self.instrument_config().map(Latest::InstrumentConfig)
            }
        }
    }

    /// Values of `parameter` for records received within `since` of `now`, in arrival
    /// order.
    #[must_use]
    pub fn time_series(
        &self,
        parameter: SeriesParameter,
        since: Duration,
        now: DateTime<Utc>,
    ) -> Vec<SeriesPoint> {
        let cutoff = cutoff(now, since);
        match parameter {
            SeriesParameter::Wave(p) => self
                .waves
                .since(cutoff)
                .map(|s| SeriesPoint {
                    timestamp: s.record.date,
                    value: p.value(&s.record),
                })
                .collect(),
            SeriesParameter::Environmental(p) => self
                .environmental
                .since(cutoff)
                .map(|s| SeriesPoint {
                    timestamp: s.record.date,
                    value: p.value(&s.record),
                })
                .collect(),
            SeriesParameter::Profile(p) => self
                .profiles
                .since(cutoff)
                .map(|s| SeriesPoint {
                    timestamp: s.record.timestamp,
                    value: p.value(&s.record),
                })
                .collect(),
        }
    }

    /// Valid cells of profiles received within `since` of `now` flattened into
    /// `(time, depth, value)` points, profiles in arrival order and cells by depth.
    /// Cells that do not report `parameter` are skipped.
    #[must_use]
    pub fn hovmoller_grid(
        &self,
        parameter: CellParameter,
        since: Duration,
        now: DateTime<Utc>,
    ) -> Vec<GridPoint> {
        self.profiles
            .since(cutoff(now, since))
            .flat_map(|s| {
                let timestamp = s.record.timestamp;
                s.record
                    .cells
                    .iter()
                    .filter(|c| c.is_valid)
                    .filter_map(move |c| {
                        parameter.value(c).map(|value| GridPoint {
                            timestamp,
                            depth: c.depth,
                            value,
                        })
                    })
            })
            .collect()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.waves.clear();
        self.environmental.clear();
        self.profiles.clear();
        self.instrument_config = None;
        self.last_update = None;
    }
}

fn cutoff(now: DateTime<Utc>, since: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(since)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
