//! Subscription plans and quota periods.
//!
//! The pipeline consumes only the daily sketch limit for an account's plan;
//! pricing, billing state, and renewal live with the external
//! account/subscription collaborator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Available subscription plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Premium,
    Enterprise,
}

impl SubscriptionPlan {
    /// Daily sketch generation limit for the plan.
    pub fn daily_sketch_limit(&self) -> u32 {
        match self {
            SubscriptionPlan::Free => 5,
            SubscriptionPlan::Premium => 100,
            SubscriptionPlan::Enterprise => 10_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Premium => "premium",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota period key for a point in time. Quotas reset daily at UTC midnight.
pub fn period_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Start of the next quota period after `at` (next UTC midnight).
pub fn period_resets_at(at: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = (at + Duration::days(1)).date_naive();
    next_day.and_time(chrono::NaiveTime::MIN).and_utc()
}
