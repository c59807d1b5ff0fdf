//! Domain primitives shared by the asset book crates.
//!
//! Identifiers, money, actors and the aggregate traits. No IO.

pub mod actor;
pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use actor::Actor;
pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, BranchId, TenantId, UserId};
pub use money::{MINOR_UNIT_SCALE, Money};
pub use value_object::ValueObject;
