#![doc = include_str!("../README.md")]

mod error;

pub mod alerts;
pub mod config;
pub mod dataset;
pub mod decode;
pub mod derived;
pub mod parameter;
pub mod profile;
pub mod sentence;
pub mod session;
pub mod summary;

pub use alerts::{AlertLimits, WaveAlert};
pub use config::Config;
pub use dataset::Dataset;
pub use decode::{DecodedMessage, Decoder};
pub use error::{Error, Result};
pub use profile::CurrentProfile;
pub use session::{Ingested, Session, SharedSession};
pub use summary::Summary;
