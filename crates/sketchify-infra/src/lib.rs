//! Infrastructure components: quota enforcement and telemetry.

pub mod quota;
pub mod telemetry;

pub use quota::{QuotaGate, QuotaGateConfig, QuotaUsage, Reservation};
