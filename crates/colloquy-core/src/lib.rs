pub mod config;
pub mod error;
pub mod exchange;
pub mod interfaces;
pub mod lifecycle;
pub mod transcript;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{ConfigError, ExchangeError, ExchangeFault, MirrorError, Unavailable};
pub use exchange::{Exchange, ExchangeStatus, FilterVerdict, PolicyRule, PolicySet, Stage};
pub use interfaces::{ContentFilter, GenerationParams, MirrorRecord, MirrorSink, ResponseGenerator};
pub use transcript::TranscriptStore;
