//! Assembly of per-cell current readings into depth profiles.
//!
//! Cells sharing a sampling instant are buffered in an open slot. A slot is closed either
//! when it holds the configured number of cells, or by the caller-driven staleness tick
//! ([ProfileBuilder::stale_keys]) when newer instants have been seen for long enough.
use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decode::{CurrentCellData, EnvironmentalData, InstrumentConfig};
use crate::derived::{circular_mean, mean};
use crate::{Error, Result};

/// Identifies a profile: the sampling instant of its cells.
pub type ProfileKey = DateTime<Utc>;

/// When an open profile is considered finished without receiving all of its cells.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CompletionPolicy {
    /// A slot is stale once a cell this many seconds newer than its key has arrived.
    pub stale_after_secs: i64,
    /// Maximum number of open slots; the oldest is flushed when exceeded.
    pub max_open: usize,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            stale_after_secs: 300,
            max_open: 8,
        }
    }
}

impl CompletionPolicy {
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        Duration::try_seconds(self.stale_after_secs).unwrap_or(Duration::MAX)
    }
}

/// A completed depth profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CurrentProfile {
    pub timestamp: ProfileKey,
    /// Arrival order of the profile's first cell within the session.
    pub sequence: u64,
    /// Configuration in effect when the profile was built, if any.
    pub instrument_config: Option<InstrumentConfig>,
    /// Most recent environmental record when the profile was built, if any.
    pub environmental: Option<EnvironmentalData>,
    /// Cells ordered by cell number.
    pub cells: Vec<CurrentCellData>,
    /// Mean speed of valid cells, 0 when there are none.
    pub mean_speed: f64,
    /// Vector mean direction of valid cells in `[0, 360)`, 0 when there are none.
    pub mean_direction: f64,
    pub valid_cell_count: usize,
    /// True when the aggregates could not be computed and were set to 0.
    pub aggregates_defaulted: bool,
    /// False for profiles flushed before all configured cells arrived.
    pub complete: bool,
    /// Number of cells that replaced an earlier cell with the same number.
    pub duplicate_cells: usize,
}

impl CurrentProfile {
    /// Build a profile from the cells of one sampling instant. Cells are sorted by cell
    /// number; aggregates use valid cells only.
    #[must_use]
    pub fn from_cells(
        timestamp: ProfileKey,
        sequence: u64,
        mut cells: Vec<CurrentCellData>,
        instrument_config: Option<InstrumentConfig>,
        environmental: Option<EnvironmentalData>,
    ) -> Self {
        cells.sort_by_key(|c| c.cell_number);

        let valid: Vec<&CurrentCellData> = cells.iter().filter(|c| c.is_valid).collect();
        let speeds: Vec<f64> = valid.iter().map(|c| c.speed).collect();
        let east: Vec<f64> = valid.iter().map(|c| c.east_velocity).collect();
        let north: Vec<f64> = valid.iter().map(|c| c.north_velocity).collect();

        let mean_speed = mean(&speeds);
        let mean_direction = circular_mean(&east, &north);
        let valid_cell_count = valid.len();

        let complete = instrument_config.as_ref().is_some_and(|c| {
            let count = usize::from(c.cell_count);
            count > 0 && in_range(&cells, count) >= count
        });

        CurrentProfile {
            timestamp,
            sequence,
            instrument_config,
            environmental,
            mean_speed: mean_speed.unwrap_or(0.0),
            mean_direction: mean_direction.unwrap_or(0.0),
            aggregates_defaulted: mean_speed.is_none() || mean_direction.is_none(),
            valid_cell_count,
            complete,
            duplicate_cells: 0,
            cells,
        }
    }
}

/// Cells numbered `1..=count`; cells outside the configured range never complete a
/// profile.
fn in_range(cells: &[CurrentCellData], count: usize) -> usize {
    cells
        .iter()
        .filter(|c| (1..=count).contains(&usize::from(c.cell_number)))
        .count()
}

#[derive(Debug, Clone)]
struct OpenProfile {
    sequence: u64,
    key: ProfileKey,
    cells: Vec<CurrentCellData>,
    duplicates: usize,
}

/// Result of buffering a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffered {
    pub key: ProfileKey,
    pub sequence: u64,
    /// Distinct cells now held for `key`.
    pub cells: usize,
    /// True when every cell numbered `1..=expected` is held.
    pub ready: bool,
    /// True when this cell opened a new slot.
    pub created: bool,
}

/// Buffers current cells by sampling instant and builds [CurrentProfile]s from them.
#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    policy: CompletionPolicy,
    slots: VecDeque<OpenProfile>,
    next_sequence: u64,
    /// Recently closed keys, used to detect rebuilds.
    closed: VecDeque<ProfileKey>,
    /// Newest key seen so far; drives the staleness tick.
    newest: Option<ProfileKey>,
}

impl ProfileBuilder {
    /// Number of closed keys remembered for [Error::ProfileAlreadyBuilt].
    pub const CLOSED_HISTORY: usize = 256;

    #[must_use]
    pub fn new(policy: CompletionPolicy) -> Self {
        ProfileBuilder {
            policy,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CompletionPolicy {
        &self.policy
    }

    /// Number of open slots.
    #[must_use]
    pub fn open(&self) -> usize {
        self.slots.len()
    }

    /// Keys of open slots, oldest slot first.
    pub fn open_keys(&self) -> impl Iterator<Item = ProfileKey> + '_ {
        self.slots.iter().map(|s| s.key)
    }

    /// Newest sampling instant seen by [ProfileBuilder::buffer].
    #[must_use]
    pub fn newest(&self) -> Option<ProfileKey> {
        self.newest
    }

    /// Add `cell` to the slot for its sampling instant, opening one if needed.
    ///
    /// A cell whose number is already present replaces the earlier one. `expected` is the
    /// configured cell count, if known.
    ///
    /// # Errors
    /// [Error::ProfileAlreadyBuilt] for a late cell whose profile was already built; the
    /// cell is dropped.
    pub fn buffer(
        &mut self,
        cell: CurrentCellData,
        expected: Option<usize>,
    ) -> Result<Buffered> {
        let key = cell.date;
        if self.closed.contains(&key) {
            warn!(key = %key, cell = cell.cell_number, "late cell for built profile, dropping");
            return Err(Error::ProfileAlreadyBuilt { key });
        }
        self.newest = Some(self.newest.map_or(key, |n| n.max(key)));

        let (idx, created) = match self.slots.iter().position(|s| s.key == key) {
            Some(idx) => (idx, false),
            None => {
                self.slots.push_back(OpenProfile {
                    sequence: self.next_sequence,
                    key,
                    cells: Vec::new(),
                    duplicates: 0,
                });
                self.next_sequence += 1;
                (self.slots.len() - 1, true)
            }
        };
        let slot = &mut self.slots[idx];

        match slot
            .cells
            .iter_mut()
            .find(|c| c.cell_number == cell.cell_number)
        {
            Some(existing) => {
                warn!(key = %key, cell = cell.cell_number, "duplicate cell, keeping the latest");
                *existing = cell;
                slot.duplicates += 1;
            }
            None => slot.cells.push(cell),
        }

        let cells = slot.cells.len();
        Ok(Buffered {
            key,
            sequence: slot.sequence,
            cells,
            ready: expected.is_some_and(|n| n > 0 && in_range(&slot.cells, n) >= n),
            created,
        })
    }

    /// Close the slot for `key` and build its profile.
    ///
    /// # Errors
    /// [Error::ProfileAlreadyBuilt] if `key` was recently built, otherwise
    /// [Error::ProfileNotBuffered] if no cells are buffered for `key`. Neither changes any
    /// state.
    pub fn build(
        &mut self,
        key: ProfileKey,
        instrument_config: Option<&InstrumentConfig>,
        environmental: Option<&EnvironmentalData>,
    ) -> Result<CurrentProfile> {
        let Some(idx) = self.slots.iter().position(|s| s.key == key) else {
            if self.closed.contains(&key) {
                return Err(Error::ProfileAlreadyBuilt { key });
            }
            return Err(Error::ProfileNotBuffered { key });
        };
        let slot = self
            .slots
            .remove(idx)
            .ok_or(Error::ProfileNotBuffered { key })?;

        self.closed.push_back(key);
        while self.closed.len() > Self::CLOSED_HISTORY {
            self.closed.pop_front();
        }

        let mut profile = CurrentProfile::from_cells(
            slot.key,
            slot.sequence,
            slot.cells,
            instrument_config.cloned(),
            environmental.cloned(),
        );
        profile.duplicate_cells = slot.duplicates;

        debug!(
            key = %profile.timestamp,
            cells = profile.cells.len(),
            valid = profile.valid_cell_count,
            complete = profile.complete,
            "built profile"
        );
        Ok(profile)
    }

    /// Keys of open slots that should be flushed as of `now`, the newest sampling instant
    /// seen by the caller: slots older than the staleness window, and the oldest slots in
    /// excess of `max_open`. Oldest first.
    #[must_use]
    pub fn stale_keys(&self, now: ProfileKey) -> Vec<ProfileKey> {
        let cutoff = now
            .checked_sub_signed(self.policy.stale_after())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut stale: Vec<ProfileKey> = self
            .slots
            .iter()
            .filter(|s| s.key < cutoff)
            .map(|s| s.key)
            .collect();

        let remaining = self.slots.len() - stale.len();
        if remaining > self.policy.max_open {
            let excess = remaining - self.policy.max_open;
            stale.extend(
                self.slots
                    .iter()
                    .filter(|s| s.key >= cutoff)
                    .take(excess)
                    .map(|s| s.key),
            );
        }
        stale
    }

    /// Discard all open slots and history.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.closed.clear();
        self.newest = None;
        self.next_sequence = 0;
    }
}
