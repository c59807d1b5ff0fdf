use chrono::{DateTime, Utc};

use assetbook_core::Actor;

/// A recorded fact about an aggregate. Never mutated once emitted.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. `"assets.depreciation.charge_recorded"`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// Business time of the fact.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Who caused it, when the event carries that.
    fn actor(&self) -> Option<Actor> {
        None
    }
}
