//! Sorted sample sets with incremental insertion and interpolated percentiles.

use crate::domain::Decimal;

/// Percentile of an ascending slice.
///
/// Linear interpolation at rank `q * (n - 1)` for two or more samples. One
/// sample yields that sample and an empty slice yields zero.
pub fn percentile(sorted: &[Decimal], q: Decimal) -> Decimal {
    match sorted {
        [] => Decimal::zero(),
        [only] => *only,
        _ => {
            let rank = q * Decimal::from_count(sorted.len() - 1);
            let lo = rank.floor().to_usize().unwrap_or(0).min(sorted.len() - 1);
            let hi = (lo + 1).min(sorted.len() - 1);
            let frac = rank - Decimal::from_count(lo);
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Arithmetic mean, zero when empty.
pub fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::zero();
    }
    let total: Decimal = values.iter().copied().sum();
    total / Decimal::from_count(values.len())
}

pub fn q25() -> Decimal {
    Decimal::from_parts(25, 2)
}

pub fn q75() -> Decimal {
    Decimal::from_parts(75, 2)
}

/// Aggregates over a sample set as of the last insertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleSnapshot {
    pub count: usize,
    pub mean: Decimal,
    pub p25: Decimal,
    pub p75: Decimal,
}

/// Closed-cycle values kept in ascending order.
///
/// Insertion is a binary search plus shift and only happens at close events;
/// reads between insertions come from the cached snapshot.
#[derive(Debug, Clone, Default)]
pub struct SortedSamples {
    values: Vec<Decimal>,
    sum: Decimal,
    snapshot: SampleSnapshot,
}

impl SortedSamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: Decimal) {
        let at = self.values.partition_point(|v| *v <= value);
        self.values.insert(at, value);
        self.sum += value;
        self.snapshot = SampleSnapshot {
            count: self.values.len(),
            mean: self.sum / Decimal::from_count(self.values.len()),
            p25: percentile(&self.values, q25()),
            p75: percentile(&self.values, q75()),
        };
    }

    pub fn snapshot(&self) -> SampleSnapshot {
        self.snapshot
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Decimal] {
        &self.values
    }

    pub fn min(&self) -> Option<Decimal> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<Decimal> {
        self.values.last().copied()
    }
}
