use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;

use serde::Serialize;

use crate::parse::Sample;

/// Counters reported by uperf for one transaction at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Measurement {
    /// Cumulative bytes moved by the transaction.
    pub bytes: u64,
    /// Cumulative operations completed by the transaction.
    pub ops: u64,
    /// Nanoseconds per operation since the previous sample of the same transaction.
    ///
    /// Zero when `ops` is zero or when there is no previous sample to measure from.
    pub ns_per_op: i64,
}

/// Measurements keyed by transaction index, then by timestamp.
///
/// Transaction indices are the 1-based `TxnN` numbers printed by uperf. Timestamps are the
/// reported milliseconds multiplied by 1000 and truncated, which keeps sub-millisecond samples
/// on distinct integer keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries(BTreeMap<u32, BTreeMap<u64, Measurement>>);

impl TimeSeries {
    /// Build a series from samples in the order uperf printed them.
    ///
    /// The first sample of a transaction is dropped if it reports no operations, uperf prints
    /// one of those before any traffic flows. Its timestamp still becomes the baseline for the
    /// next sample's latency.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut series = BTreeMap::<u32, BTreeMap<u64, Measurement>>::new();
        let mut last_timestamp = HashMap::<u32, u64>::new();

        for sample in samples {
            let previous = last_timestamp.insert(sample.transaction, sample.timestamp);
            if previous.is_none() && sample.ops == 0 {
                log::trace!(
                    "Dropping initial empty sample for Txn{} at {}",
                    sample.transaction,
                    sample.timestamp
                );
                continue;
            }

            let ns_per_op = match previous {
                Some(previous) if sample.ops != 0 => {
                    latency_ns(previous, sample.timestamp, sample.ops)
                }
                _ => 0,
            };

            series.entry(sample.transaction).or_default().insert(
                sample.timestamp,
                Measurement {
                    bytes: sample.bytes,
                    ops: sample.ops,
                    ns_per_op,
                },
            );
        }

        Self(series)
    }

    pub fn transaction(&self, index: u32) -> Option<&BTreeMap<u64, Measurement>> {
        self.0.get(&index)
    }

    pub fn get(&self, index: u32, timestamp: u64) -> Option<&Measurement> {
        self.0.get(&index).and_then(|samples| samples.get(&timestamp))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, BTreeMap<u64, Measurement>> {
        self.0.iter()
    }

    /// Number of transactions with at least one measurement.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = (&'a u32, &'a BTreeMap<u64, Measurement>);
    type IntoIter = btree_map::Iter<'a, u32, BTreeMap<u64, Measurement>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// `1000 * elapsed / ops` with truncating integer division.
fn latency_ns(previous: u64, current: u64, ops: u64) -> i64 {
    let elapsed = i128::from(current) - i128::from(previous);
    let ns = 1000 * elapsed / i128::from(ops);
    ns.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
