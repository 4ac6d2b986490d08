//! Subscription period arithmetic.
//!
//! A new paid period stacks on top of a still-active subscription: if the
//! user's current subscription ends in the future, the new window starts at
//! that end date; otherwise it starts now. The end date is calendar-aware:
//! one month or twelve months ahead, with chrono clamping the day-of-month
//! on rollover (Jan 31 + 1 month = Feb 28, or Feb 29 in a leap year).

use chrono::{DateTime, Months, Utc};

use crate::models::SubscriptionPeriod;

/// Start/end of a purchased subscription period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Compute the window a new `period` purchase buys, given the user's
/// current subscription end date (if any).
pub fn subscription_window(
    now: DateTime<Utc>,
    current_end: Option<DateTime<Utc>>,
    period: SubscriptionPeriod,
) -> SubscriptionWindow {
    let starts_at = match current_end {
        Some(end) if end > now => end,
        _ => now,
    };

    let months = match period {
        SubscriptionPeriod::Monthly => Months::new(1),
        SubscriptionPeriod::Yearly => Months::new(12),
    };

    SubscriptionWindow {
        starts_at,
        ends_at: starts_at + months,
    }
}
