//! Temporal predicates evaluated against an injected reference instant.
//!
//! Nothing in this module reads the system clock; `now` is always a
//! parameter so results are reproducible.

use chrono::{DateTime, Duration, Months, Utc};
use event_store::Event;

use crate::Result;
use crate::expiry::ExpiryDescriptor;

/// A relative span of time measured from a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Calendar months, clamped to the end of shorter months
    /// (one month before 2024-03-31 is 2024-02-29).
    Months(u32),
    /// Whole days of 24 hours.
    Days(u32),
    /// An exact duration.
    Exact(Duration),
}

impl TimeWindow {
    /// The instant `self` before `now`, or `None` if out of range.
    pub fn before(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            TimeWindow::Months(n) => now.checked_sub_months(Months::new(n)),
            TimeWindow::Days(n) => now.checked_sub_signed(Duration::days(i64::from(n))),
            TimeWindow::Exact(d) => now.checked_sub_signed(d),
        }
    }

    /// The instant `self` after `now`, or `None` if out of range.
    pub fn after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            TimeWindow::Months(n) => now.checked_add_months(Months::new(n)),
            TimeWindow::Days(n) => now.checked_add_signed(Duration::days(i64::from(n))),
            TimeWindow::Exact(d) => now.checked_add_signed(d),
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeWindow::Months(1) => write!(f, "1 month"),
            TimeWindow::Months(n) => write!(f, "{n} months"),
            TimeWindow::Days(1) => write!(f, "1 day"),
            TimeWindow::Days(n) => write!(f, "{n} days"),
            TimeWindow::Exact(d) => write!(f, "{}s", d.num_seconds()),
        }
    }
}

/// A condition over a single event relative to `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalPredicate {
    /// `occurred_at < now - window`: the state has been unchanged for
    /// longer than the window.
    OlderThan(TimeWindow),

    /// `occurred_at >= now - window`.
    WithinLast(TimeWindow),

    /// The `MM/YY` descriptor under `field` expires on or before
    /// `now + lead_time` (compared as calendar dates).
    ExpiresWithin { field: String, lead_time: TimeWindow },
}

impl TemporalPredicate {
    /// Shorthand for an expiry predicate.
    pub fn expires_within(field: impl Into<String>, lead_time: TimeWindow) -> Self {
        TemporalPredicate::ExpiresWithin {
            field: field.into(),
            lead_time,
        }
    }
}

/// Evaluates `predicate` against `event` at the instant `now`.
///
/// Only expiry predicates can fail, with
/// [`ProjectionError::InvalidExpiryFormat`](crate::ProjectionError::InvalidExpiryFormat)
/// when the metadata field is absent or unparsable.
pub fn evaluate(event: &Event, predicate: &TemporalPredicate, now: DateTime<Utc>) -> Result<bool> {
    match predicate {
        TemporalPredicate::OlderThan(window) => Ok(is_stale(event, now, *window)),
        TemporalPredicate::WithinLast(window) => Ok(!is_stale(event, now, *window)),
        TemporalPredicate::ExpiresWithin { field, lead_time } => {
            let descriptor = ExpiryDescriptor::from_metadata(event, field)?;
            Ok(expires_within(&descriptor, now, *lead_time))
        }
    }
}

/// Returns true if `event` occurred strictly before `now - window`.
pub fn is_stale(event: &Event, now: DateTime<Utc>, window: TimeWindow) -> bool {
    match window.before(now) {
        Some(cutoff) => event.occurred_at < cutoff,
        None => false,
    }
}

/// Returns true if the descriptor's last valid day is on or before the date
/// of `now + lead_time`.
pub fn expires_within(descriptor: &ExpiryDescriptor, now: DateTime<Utc>, lead_time: TimeWindow) -> bool {
    match lead_time.after(now) {
        Some(horizon) => descriptor.end_of_month() <= horizon.date_naive(),
        None => true,
    }
}
