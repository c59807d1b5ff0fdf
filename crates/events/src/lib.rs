//! Event trait and the envelope used for per-aggregate audit streams.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
