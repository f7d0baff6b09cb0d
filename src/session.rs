//! One instrument's decode, assemble and store pipeline.
//!
//! A [Session] is single threaded; wrap it in a [SharedSession] to feed lines from one
//! task while querying from others.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::alerts::WaveAlert;
use crate::config::Config;
use crate::dataset::{Dataset, GridPoint, Latest, Record, RecordKind, SeriesPoint};
use crate::decode::{DecodedMessage, Decoder};
use crate::parameter::{CellParameter, SeriesParameter};
use crate::profile::{ProfileBuilder, ProfileKey};
use crate::sentence::MessageTag;
use crate::summary::Summary;
use crate::{Error, Result};

/// Outcome of ingesting one message.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Ingested {
    pub tag: MessageTag,
    /// Profiles built and stored as a consequence of this message, oldest first.
    pub profiles: Vec<ProfileKey>,
    /// Limits exceeded by an ingested wave record.
    pub alerts: Vec<WaveAlert>,
}

impl Ingested {
    fn new(tag: MessageTag) -> Self {
        Ingested {
            tag,
            profiles: Vec::new(),
            alerts: Vec::new(),
        }
    }
}

/// Decodes lines and keeps the resulting records for one instrument.
#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    decoder: Decoder,
    builder: ProfileBuilder,
    dataset: Dataset,
    summary: Summary,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Session {
    /// # Errors
    /// [Error::Config] if `config` does not validate.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: Config) -> Self {
        Session {
            decoder: Decoder::new(config.quality.clone())
                .with_strict_config(config.require_instrument_config),
            builder: ProfileBuilder::new(config.completion.clone()),
            dataset: Dataset::new(&config.capacity),
            summary: Summary::default(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Number of profiles still waiting for cells.
    #[must_use]
    pub fn open_profiles(&self) -> usize {
        self.builder.open()
    }

    /// Decode `line` using the current instrument configuration without ingesting it.
    ///
    /// # Errors
    /// Any per-line [Error].
    pub fn decode_line(&self, line: &str) -> Result<DecodedMessage> {
        self.decoder
            .decode_line(line, self.dataset.instrument_config())
    }

    /// Decode and ingest `line`, stamped with the current time.
    ///
    /// # Errors
    /// See [Session::push_line_at].
    pub fn push_line(&mut self, line: &str) -> Result<Ingested> {
        self.push_line_at(line, Utc::now())
    }

    /// Decode and ingest `line` received at `received`.
    ///
    /// # Errors
    /// Any per-line [Error] if the line is dropped, or [Error::ProfileAlreadyBuilt] for a
    /// late current cell. The session stays usable after any error.
    pub fn push_line_at(&mut self, line: &str, received: DateTime<Utc>) -> Result<Ingested> {
        match self.decode_line(line) {
            Ok(msg) => {
                self.summary.add(&msg);
                self.ingest_at(msg, received)
            }
            Err(err) => {
                trace!(error = %err, "dropping line");
                self.summary.add_error(&err);
                Err(err)
            }
        }
    }

    /// Ingest an already decoded message, stamped with the current time.
    ///
    /// # Errors
    /// See [Session::ingest_at].
    pub fn ingest(&mut self, msg: DecodedMessage) -> Result<Ingested> {
        self.ingest_at(msg, Utc::now())
    }

    /// Store `msg` as received at `received`.
    ///
    /// An instrument configuration replaces the current one. A current cell is buffered;
    /// its profile is built once all configured cells are present, and a cell that opens a
    /// new profile triggers the staleness [tick](Session::tick), whatever order the
    /// sampling instants arrive in.
    ///
    /// # Errors
    /// [Error::ProfileAlreadyBuilt] if `msg` is a cell of a profile that was already
    /// built. The cell is dropped.
    pub fn ingest_at(&mut self, msg: DecodedMessage, received: DateTime<Utc>) -> Result<Ingested> {
        let mut ingested = Ingested::new(msg.tag());
        match msg {
            DecodedMessage::Wave(wave) => {
                ingested.alerts = self.config.alerts.check(&wave);
                for alert in &ingested.alerts {
                    warn!(%alert, "wave limit exceeded");
                }
                self.dataset.record(Record::Wave(wave), received);
            }
            DecodedMessage::Environmental(env) => {
                self.dataset.record(Record::Environmental(env), received);
            }
            DecodedMessage::InstrumentConfig(config) => {
                if self.dataset.instrument_config() != Some(&config) {
                    debug!(
                        beams = config.beam_count,
                        cells = config.cell_count,
                        cell_size = config.cell_size,
                        "instrument configuration changed"
                    );
                }
                self.dataset.record(Record::InstrumentConfig(config), received);
            }
            DecodedMessage::CurrentCell(cell) => {
                let expected = self
                    .dataset
                    .instrument_config()
                    .map(|c| usize::from(c.cell_count));
                let buffered = match self.builder.buffer(cell, expected) {
                    Ok(buffered) => buffered,
                    Err(err) => {
                        if matches!(err, Error::ProfileAlreadyBuilt { .. }) {
                            self.summary.add_late_cell();
                        }
                        return Err(err);
                    }
                };
                if buffered.ready {
                    self.close(buffered.key, received)?;
                    ingested.profiles.push(buffered.key);
                }
                if buffered.created {
                    ingested.profiles.extend(self.tick_at(received)?);
                }
            }
        }
        Ok(ingested)
    }

    /// Flush open profiles that the completion policy considers stale, as partial
    /// profiles. Returns the keys flushed, oldest first.
    ///
    /// # Errors
    /// Only if the profile builder's state is inconsistent.
    pub fn tick(&mut self) -> Result<Vec<ProfileKey>> {
        self.tick_at(Utc::now())
    }

    fn tick_at(&mut self, received: DateTime<Utc>) -> Result<Vec<ProfileKey>> {
        let Some(now) = self.builder.newest() else {
            return Ok(Vec::new());
        };
        let keys = self.builder.stale_keys(now);
        for key in &keys {
            warn!(key = %key, newest = %now, "flushing stale profile");
            self.close(*key, received)?;
        }
        Ok(keys)
    }

    /// Build and store the profile for `key` now, whether or not it is complete.
    ///
    /// # Errors
    /// [Error::ProfileAlreadyBuilt] if it was already built, [Error::ProfileNotBuffered] if
    /// no cells were received for `key`.
    pub fn build_profile(&mut self, key: ProfileKey) -> Result<()> {
        self.close(key, Utc::now())
    }

    /// Build and store every open profile, oldest first.
    ///
    /// # Errors
    /// Only if the profile builder's state is inconsistent.
    pub fn flush(&mut self) -> Result<Vec<ProfileKey>> {
        let received = Utc::now();
        let keys: Vec<ProfileKey> = self.builder.open_keys().collect();
        for key in &keys {
            self.close(*key, received)?;
        }
        Ok(keys)
    }

    fn close(&mut self, key: ProfileKey, received: DateTime<Utc>) -> Result<()> {
        let profile = self.builder.build(
            key,
            self.dataset.instrument_config(),
            self.dataset.latest_environmental(),
        )?;
        if !profile.complete {
            warn!(key = %key, cells = profile.cells.len(), "stored partial profile");
        }
        self.summary.add_profile(&profile);
        self.dataset.record(Record::Profile(profile), received);
        Ok(())
    }

    /// Drop all buffered cells, stored records and statistics. Configuration is kept.
    pub fn reset(&mut self) {
        debug!(open = self.builder.open(), "resetting session");
        self.builder.clear();
        self.dataset.clear();
        self.summary = Summary::default();
    }

    #[must_use]
    pub fn query_series(&self, parameter: SeriesParameter, since: Duration) -> Vec<SeriesPoint> {
        self.dataset.time_series(parameter, since, Utc::now())
    }

    #[must_use]
    pub fn query_grid(&self, parameter: CellParameter, since: Duration) -> Vec<GridPoint> {
        self.dataset.hovmoller_grid(parameter, since, Utc::now())
    }

    #[must_use]
    pub fn query_latest(&self, kind: RecordKind) -> Option<Latest<'_>> {
        self.dataset.latest(kind)
    }
}

/// A [Session] shared between threads.
///
/// A panic while the lock is held does not make the session unusable; the next caller
/// proceeds with the state as it was left.
#[derive(Debug, Clone, Default)]
pub struct SharedSession(Arc<Mutex<Session>>);

impl SharedSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        SharedSession(Arc::new(Mutex::new(session)))
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.lock())
    }

    /// # Errors
    /// See [Session::push_line].
    pub fn push_line(&self, line: &str) -> Result<Ingested> {
        self.lock().push_line(line)
    }

    /// # Errors
    /// See [Session::tick].
    pub fn tick(&self) -> Result<Vec<ProfileKey>> {
        self.lock().tick()
    }

    #[must_use]
    pub fn query_series(&self, parameter: SeriesParameter, since: Duration) -> Vec<SeriesPoint> {
        self.lock().query_series(parameter, since)
    }

    #[must_use]
    pub fn query_grid(&self, parameter: CellParameter, since: Duration) -> Vec<GridPoint> {
        self.lock().query_grid(parameter, since)
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        self.lock().summary().clone()
    }

    pub fn reset(&self) {
        self.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertLimits;
    use crate::parameter::{EnvironmentalParameter, WaveParameter};
    use crate::profile::CompletionPolicy;
    use crate::sentence::frame;
    use chrono::TimeZone;

    const CONFIG: &str = "PNORI,4,Signature1000,3,3,0.50,1.00,0";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn cell_line(time: &str, number: u16) -> String {
        frame(&format!(
            "PNORC,010124,{time},{number},0.1,0.1,0.0,,0.14,45.0,C,110,110,110,85,85,85"
        ))
    }

    /// Cell as sent by a four beam instrument, for sessions without a configuration.
    fn unconfigured_cell_line(time: &str, number: u16) -> String {
        frame(&format!(
            "PNORC,010124,{time},{number},0.1,0.1,0.0,0.0,0.14,45.0,C,110,110,110,110,85,85,85,85"
        ))
    }

    #[test]
    fn descending_keys_stay_within_open_limit() {
        let mut session = Session::default();
        let max_open = session.config().completion.max_open;
        session.push_line_at(&unconfigured_cell_line("130000", 1), at(0)).unwrap();

        let mut flushed = 0;
        for minute in (10..60).rev() {
            let time = format!("12{minute:02}00");
            let ingested = session
                .push_line_at(&unconfigured_cell_line(&time, 1), at(1))
                .unwrap();
            flushed += ingested.profiles.len();
            assert!(
                session.open_profiles() <= max_open,
                "{} open after {time}",
                session.open_profiles()
            );
        }
        assert_eq!(flushed + session.open_profiles(), 51);
        assert_eq!(session.summary().profiles_partial, flushed);
    }

    #[test]
    fn profile_completes_by_count() {
        let mut session = Session::default();
        session.push_line_at(&frame(CONFIG), at(0)).unwrap();

        for n in 1..=2 {
            let ingested = session.push_line_at(&cell_line("120000", n), at(1)).unwrap();
            assert!(ingested.profiles.is_empty());
        }
        let ingested = session.push_line_at(&cell_line("120000", 3), at(2)).unwrap();
        assert_eq!(ingested.profiles, vec![at(0)]);

        let profile = session.dataset().latest_profile().unwrap();
        assert!(profile.complete);
        assert_eq!(profile.cells.len(), 3);
        assert_eq!(profile.valid_cell_count, 3);
        assert_eq!(session.summary().profiles_complete, 1);
        assert_eq!(session.open_profiles(), 0);

        // a late duplicate of a built profile is dropped
        assert!(matches!(
            session.push_line_at(&cell_line("120000", 1), at(3)),
            Err(Error::ProfileAlreadyBuilt { .. })
        ));
        assert_eq!(session.summary().late_cells, 1);
        assert_eq!(session.dataset().profiles().len(), 1);
    }

    #[test]
    fn stale_profile_is_flushed_partial() {
        let config = Config::builder()
            .completion(CompletionPolicy {
                stale_after_secs: 60,
                max_open: 8,
            })
            .build();
        let mut session = Session::new(config).unwrap();
        session.push_line_at(&frame(CONFIG), at(0)).unwrap();

        session.push_line_at(&cell_line("120000", 1), at(0)).unwrap();
        let ingested = session.push_line_at(&cell_line("120030", 1), at(30)).unwrap();
        assert!(ingested.profiles.is_empty());

        let ingested = session.push_line_at(&cell_line("120200", 1), at(120)).unwrap();
        assert_eq!(ingested.profiles, vec![at(0), at(30)]);
        let profiles = session.dataset().profiles();
        assert_eq!(profiles.len(), 2);
        assert!(profiles.iter().all(|p| !p.record.complete));
        assert_eq!(session.summary().profiles_partial, 2);
        assert_eq!(session.open_profiles(), 1);

        assert_eq!(session.flush().unwrap(), vec![at(120)]);
        assert_eq!(session.open_profiles(), 0);
    }

    #[test]
    fn build_profile_errors() {
        let mut session = Session::default();
        assert!(matches!(
            session.build_profile(at(0)),
            Err(Error::ProfileNotBuffered { .. })
        ));

        session.push_line_at(&unconfigured_cell_line("120000", 1), at(0)).unwrap();
        session.build_profile(at(0)).unwrap();
        assert!(matches!(
            session.build_profile(at(0)),
            Err(Error::ProfileAlreadyBuilt { .. })
        ));
        assert_eq!(session.dataset().profiles().len(), 1);
    }

    #[test]
    fn profile_carries_latest_environmental() {
        let mut session = Session::default();
        session
            .push_line_at(
                &frame("PNORS,010124,120000,00000000,2A480000,14.4,1523.0,275.9,3.0,4.0,15.1,20.4"),
                at(0),
            )
            .unwrap();
        session.push_line_at(&unconfigured_cell_line("120000", 1), at(0)).unwrap();
        session.flush().unwrap();

        let profile = session.dataset().latest_profile().unwrap();
        assert_eq!(profile.environmental.as_ref().map(|e| e.tilt), Some(5.0));
        assert!(profile.cells[0].depth_estimated);
    }

    #[test]
    fn errors_are_counted_and_session_continues() {
        let mut session = Session::default();
        assert!(session.push_line("$PNORI,1*00").is_err());
        assert!(session.push_line("not a sentence").is_err());
        session.push_line(&frame(CONFIG)).unwrap();

        let summary = session.summary();
        assert_eq!(summary.lines, 3);
        assert_eq!(summary.errors.total(), 2);
        assert!(session.dataset().instrument_config().is_some());
    }

    #[test]
    fn wave_alerts() {
        let config = Config::builder()
            .alerts(AlertLimits {
                enabled: true,
                ..Default::default()
            })
            .build();
        let mut session = Session::new(config).unwrap();
        let ingested = session
            .push_line(&frame(
                "PNORW,010124,120000,3,4,3.55,0.51,0.63,0.82,2.52,3.80,2.60,302.1,36.2,305.4,0.48,22.37,0,1,0.21,297.3,0000",
            ))
            .unwrap();
        assert_eq!(ingested.tag, MessageTag::Wave);
        assert_eq!(ingested.alerts.len(), 1);
        assert_eq!(ingested.alerts[0].parameter, WaveParameter::Hm0);
    }

    #[test]
    fn reset_clears_state() {
        let mut session = Session::default();
        session.push_line(&frame(CONFIG)).unwrap();
        session.push_line(&cell_line("120000", 1)).unwrap();
        session.reset();

        assert_eq!(session.open_profiles(), 0);
        assert!(session.dataset().instrument_config().is_none());
        assert_eq!(session.summary().lines, 0);
    }

    #[test]
    fn shared_session_across_threads() {
        let shared = SharedSession::default();
        let writer = shared.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..10 {
                let body = format!(
                    "PNORS,010124,1200{i:02},00000000,2A480000,14.4,1523.0,275.9,3.0,4.0,15.1,20.4"
                );
                writer.push_line(&frame(&body)).unwrap();
            }
        });
        handle.join().unwrap();

        let series =
            shared.query_series(EnvironmentalParameter::Tilt.into(), Duration::hours(1));
        assert_eq!(series.len(), 10);
        assert!(series.iter().all(|p| (p.value - 5.0).abs() < 1e-9));
        assert_eq!(shared.summary().count(MessageTag::Environmental), 10);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config::builder()
            .completion(CompletionPolicy {
                stale_after_secs: 300,
                max_open: 0,
            })
            .build();
        assert!(matches!(Session::new(config), Err(Error::Config(_))));
    }
}
