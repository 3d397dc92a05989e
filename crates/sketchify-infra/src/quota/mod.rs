//! Quota enforcement with reserve/confirm/release semantics.
//!
//! A reservation holds one quota slot while a job runs. Confirming converts
//! the hold into a permanent charge; releasing returns the slot. Both are
//! idempotent. Reservations neither confirmed nor released within the TTL
//! are returned by a background expiry sweep so crashed jobs cannot pin
//! quota forever.

mod gate;

pub use gate::{QuotaGate, QuotaGateConfig, QuotaUsage, Reservation};
