//! Fixed-interval time grid
//!
//! Bucket starts are generated with an explicit loop and kept in a
//! `BTreeMap`, so iteration is always strictly increasing and gap-free.
//!
//! Buckets are aligned to the Unix epoch, the same way Kraken stamps its
//! candles. Intervals that divide a day start at midnight; weekly buckets
//! start on Thursday 00:00 UTC because 1970-01-01 was a Thursday.

use crate::error::DataError;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Largest grid a single normalization may allocate
pub const MAX_GRID_BUCKETS: i64 = 10_000_000;

/// Width of one bucket
pub fn bucket_width(interval_min: u32) -> Duration {
    Duration::minutes(i64::from(interval_min))
}

/// Start of the epoch-aligned bucket containing `ts`.
///
/// `None` when that start lies before the earliest representable instant.
pub fn floor_to_interval(ts: DateTime<Utc>, interval_min: u32) -> Option<DateTime<Utc>> {
    let step_ms = i64::from(interval_min) * 60_000;
    let offset = ts.timestamp_millis().rem_euclid(step_ms);
    let sub_ms = i64::from(ts.timestamp_subsec_nanos() % 1_000_000);
    ts.checked_sub_signed(Duration::milliseconds(offset))?
        .checked_sub_signed(Duration::nanoseconds(sub_ms))
}

/// Bucket starts `start, start + interval, ...` up to and including `end`.
///
/// Stops early at the last representable instant instead of overflowing.
pub fn bucket_starts(start: DateTime<Utc>, end: DateTime<Utc>, interval_min: u32) -> Vec<DateTime<Utc>> {
    let mut starts = Vec::new();
    if start > end {
        return starts;
    }
    let step = bucket_width(interval_min);
    let mut ts = start;
    loop {
        starts.push(ts);
        match ts.checked_add_signed(step) {
            Some(next) if next <= end => ts = next,
            _ => break,
        }
    }
    starts
}

/// Number of buckets in `[start, end]`, zero when `end < start`
pub fn bucket_count(start: DateTime<Utc>, end: DateTime<Utc>, interval_min: u32) -> i64 {
    let span = end.signed_duration_since(start).num_minutes();
    if span < 0 {
        0
    } else {
        span / i64::from(interval_min) + 1
    }
}

/// Ordered map from bucket start to the bucket's contents, one slot per bucket
#[derive(Debug, Clone)]
pub struct Grid<T> {
    slots: BTreeMap<DateTime<Utc>, Option<T>>,
}

impl<T> Grid<T> {
    /// Empty slots for every bucket in `[start, end]`.
    ///
    /// Spans wider than [`MAX_GRID_BUCKETS`] are rejected before anything is
    /// allocated.
    pub fn spanning(start: DateTime<Utc>, end: DateTime<Utc>, interval_min: u32) -> Result<Self, DataError> {
        let buckets = bucket_count(start, end, interval_min);
        if buckets > MAX_GRID_BUCKETS {
            return Err(DataError::SpanTooLarge {
                buckets,
                limit: MAX_GRID_BUCKETS,
            });
        }
        let slots = bucket_starts(start, end, interval_min)
            .into_iter()
            .map(|ts| (ts, None))
            .collect();
        Ok(Self { slots })
    }

    /// Place `value` at exactly `ts`. Returns false when `ts` is not a bucket
    /// start of this grid or the slot is already taken.
    pub fn place(&mut self, ts: DateTime<Utc>, value: T) -> bool {
        match self.slots.get_mut(&ts) {
            Some(slot) if slot.is_none() => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Mutable access to the slot at `ts`, if `ts` is a bucket start
    pub fn slot_mut(&mut self, ts: &DateTime<Utc>) -> Option<&mut Option<T>> {
        self.slots.get_mut(ts)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of buckets that received a value
    pub fn filled(&self) -> usize {
        self.slots.values().filter(|v| v.is_some()).count()
    }
}

impl<T> IntoIterator for Grid<T> {
    type Item = (DateTime<Utc>, Option<T>);
    type IntoIter = std::collections::btree_map::IntoIter<DateTime<Utc>, Option<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}
