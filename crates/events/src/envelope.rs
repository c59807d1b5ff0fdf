use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use assetbook_core::{Actor, AggregateId, TenantId};

use crate::event::Event;

/// One entry of an aggregate's audit stream.
///
/// Metadata is copied out of the payload when the envelope is built, so a
/// stream stays readable (type, time, actor) without decoding each payload.
/// `sequence_number` starts at 1 and has no gaps within a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    aggregate_type: String,
    sequence_number: u64,
    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor: Option<Actor>,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    pub fn new(
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            event_type: payload.event_type().to_string(),
            event_version: payload.version(),
            occurred_at: payload.occurred_at(),
            actor: payload.actor(),
            payload,
        }
    }

    /// Envelope for the event following `self` in the same stream.
    pub fn next(&self, payload: E) -> Self {
        Self::new(
            self.tenant_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number + 1,
            payload,
        )
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn actor(&self) -> Option<Actor> {
        self.actor
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetbook_core::UserId;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Noted {
        by: Option<UserId>,
        at: DateTime<Utc>,
    }

    impl Event for Noted {
        fn event_type(&self) -> &'static str {
            "test.noted"
        }

        fn version(&self) -> u32 {
            2
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }

        fn actor(&self) -> Option<Actor> {
            self.by.map(Actor::Human)
        }
    }

    #[test]
    fn metadata_is_taken_from_payload() {
        let user = UserId::new();
        let at = Utc::now();
        let envelope = EventEnvelope::new(
            TenantId::new(),
            AggregateId::new(),
            "test.stream",
            1,
            Noted { by: Some(user), at },
        );

        assert_eq!(envelope.event_type(), "test.noted");
        assert_eq!(envelope.event_version(), 2);
        assert_eq!(envelope.occurred_at(), at);
        assert_eq!(envelope.actor(), Some(Actor::Human(user)));
    }

    #[test]
    fn next_continues_the_stream() {
        let first = EventEnvelope::new(
            TenantId::new(),
            AggregateId::new(),
            "test.stream",
            1,
            Noted { by: None, at: Utc::now() },
        );
        let second = first.next(Noted { by: None, at: Utc::now() });

        assert_eq!(second.sequence_number(), 2);
        assert_eq!(second.aggregate_id(), first.aggregate_id());
        assert_eq!(second.tenant_id(), first.tenant_id());
        assert_ne!(second.event_id(), first.event_id());
        assert_eq!(second.actor(), None);
    }
}
