use std::collections::BTreeMap;

use crate::planner::grid::INTERVAL;

/// A daily time series keyed by grid-aligned unix-second day boundaries,
/// mirroring the pandas `Series` indexed by day that the original
/// implementation builds out of grouped transfer/price data (spec
/// §4.7.1–§4.7.5).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries(pub BTreeMap<i64, f64>);

pub fn day_bucket(timestamp: i64) -> i64 {
    timestamp.div_euclid(INTERVAL) * INTERVAL
}

impl DailySeries {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_map(map: BTreeMap<i64, f64>) -> Self {
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, day: i64) -> Option<f64> {
        self.0.get(&day).copied()
    }

    pub fn first_day(&self) -> Option<i64> {
        self.0.keys().next().copied()
    }

    pub fn last_day(&self) -> Option<i64> {
        self.0.keys().next_back().copied()
    }

    /// Daily net-flow deltas accumulated into a running balance (§4.7.1's
    /// "group by day -> net flow -> cumulative sum").
    pub fn cumsum(&self) -> Self {
        let mut running = 0.0;
        let mut out = BTreeMap::new();
        for (&day, &value) in &self.0 {
            running += value;
            out.insert(day, running);
        }
        Self(out)
    }

    /// Forward-fills this series across every day in `days`, carrying the
    /// last known value forward and leaving days before the first
    /// observation absent.
    pub fn reindex_forward_fill(&self, days: &[i64]) -> Self {
        let mut out = BTreeMap::new();
        let mut last: Option<f64> = None;
        for &day in days {
            if let Some(&v) = self.0.get(&day) {
                last = Some(v);
            }
            if let Some(v) = last {
                out.insert(day, v);
            }
        }
        Self(out)
    }

    /// As `reindex_forward_fill`, but days with no value yet (before the
    /// first observation, or still missing after forward-fill) are zero.
    pub fn reindex_fill_zero(&self, days: &[i64]) -> Self {
        let mut out = BTreeMap::new();
        let mut last: Option<f64> = None;
        for &day in days {
            if let Some(&v) = self.0.get(&day) {
                last = Some(v);
            }
            out.insert(day, last.unwrap_or(0.0));
        }
        Self(out)
    }

    /// While any day is negative, push the deficit forward from the first
    /// negative day onward (§4.7.1's clamp-forward correction for
    /// temporarily-negative balances caused by missing history).
    pub fn clamp_forward(&self) -> Self {
        let mut values: Vec<(i64, f64)> = self.0.iter().map(|(&d, &v)| (d, v)).collect();
        loop {
            let Some(i) = values.iter().position(|&(_, v)| v < 0.0) else {
                break;
            };
            let deficit = values[i].1;
            for entry in values.iter_mut().skip(i) {
                entry.1 -= deficit;
            }
        }
        Self(values.into_iter().collect())
    }

    pub fn diff(&self) -> Self {
        let mut out = BTreeMap::new();
        let mut prev: Option<(i64, f64)> = None;
        for (&day, &value) in &self.0 {
            if let Some((_, prev_value)) = prev {
                out.insert(day, value - prev_value);
            }
            prev = Some((day, value));
        }
        Self(out)
    }

    pub fn shift(&self, periods: i64) -> Self {
        let days: Vec<i64> = self.0.keys().copied().collect();
        let mut out = BTreeMap::new();
        for (idx, &day) in days.iter().enumerate() {
            let src_idx = idx as i64 - periods;
            if src_idx >= 0 && (src_idx as usize) < days.len() {
                let src_day = days[src_idx as usize];
                if let Some(&v) = self.0.get(&src_day) {
                    out.insert(day, v);
                }
            }
        }
        Self(out)
    }

    /// Trailing rolling median over `window` observations (by position,
    /// not wall-clock days), requiring at least `min_periods` samples.
    pub fn rolling_median(&self, window: usize, min_periods: usize) -> Self {
        self.rolling(window, min_periods, false, median)
    }

    /// Rolling sum, optionally centred (§4.7.4's `sigma_u`, §4.7.5's
    /// `sc_fee`/`sc_operating`/`FC`).
    pub fn rolling_sum(&self, window: usize, min_periods: usize, centered: bool) -> Self {
        self.rolling(window, min_periods, centered, |vals| vals.iter().sum())
    }

    fn rolling(
        &self,
        window: usize,
        min_periods: usize,
        centered: bool,
        agg: impl Fn(&[f64]) -> f64,
    ) -> Self {
        let days: Vec<i64> = self.0.keys().copied().collect();
        let values: Vec<f64> = self.0.values().copied().collect();
        let n = values.len();
        let mut out = BTreeMap::new();

        for i in 0..n {
            let (lo, hi) = if centered {
                let half = window / 2;
                let lo = i.saturating_sub(half);
                let hi = (i + window - half).min(n);
                (lo, hi)
            } else {
                let lo = (i + 1).saturating_sub(window);
                (lo, i + 1)
            };

            let slice = &values[lo..hi];
            if slice.len() >= min_periods {
                out.insert(days[i], agg(slice));
            }
        }

        Self(out)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self(self.0.iter().map(|(&d, &v)| (d, f(v))).collect())
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    pub fn scale(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    pub fn add(&self, other: &Self) -> Self {
        zip_with(self, other, 0.0, |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Self {
        zip_with(self, other, 0.0, |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Self {
        zip_with(self, other, 1.0, |a, b| a * b)
    }

    pub fn div(&self, other: &Self) -> Self {
        let mut out = BTreeMap::new();
        for (&day, &a) in &self.0 {
            if let Some(&b) = other.0.get(&day) {
                if b != 0.0 {
                    out.insert(day, a / b);
                }
            }
        }
        Self(out)
    }

    pub fn sum_all(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn into_map(self) -> BTreeMap<i64, f64> {
        self.0
    }
}

/// Union of both series' days; missing values default to `default` (used
/// for sum/difference where an absent day means "no contribution").
fn zip_with(a: &DailySeries, b: &DailySeries, default: f64, f: impl Fn(f64, f64) -> f64) -> DailySeries {
    let mut days: Vec<i64> = a.0.keys().chain(b.0.keys()).copied().collect();
    days.sort_unstable();
    days.dedup();

    let mut out = BTreeMap::new();
    for day in days {
        let av = a.0.get(&day).copied().unwrap_or(default);
        let bv = b.0.get(&day).copied().unwrap_or(default);
        out.insert(day, f(av, bv));
    }
    DailySeries(out)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sum of several series over their union of days (missing = 0), used
/// throughout the risk engine to aggregate per-token series into
/// per-bucket/per-protocol totals.
pub fn sum_series<'a>(series: impl IntoIterator<Item = &'a DailySeries>) -> DailySeries {
    series
        .into_iter()
        .fold(DailySeries::new(), |acc, s| acc.add(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(pairs: &[(i64, f64)]) -> DailySeries {
        DailySeries(pairs.iter().copied().collect())
    }

    #[test]
    fn cumsum_accumulates_in_day_order() {
        let s = series(&[(1, 1.0), (2, -2.0), (3, 5.0)]);
        let c = s.cumsum();
        assert_eq!(c.get(1), Some(1.0));
        assert_eq!(c.get(2), Some(-1.0));
        assert_eq!(c.get(3), Some(4.0));
    }

    #[test]
    fn clamp_forward_pushes_deficit_onward() {
        let s = series(&[(1, 2.0), (2, -5.0), (3, 1.0)]);
        let c = s.clamp_forward();
        assert_eq!(c.get(1), Some(2.0));
        assert_eq!(c.get(2), Some(0.0));
        assert_eq!(c.get(3), Some(6.0));
    }

    #[test]
    fn reindex_forward_fill_carries_last_value() {
        let s = series(&[(1, 10.0), (3, 30.0)]);
        let filled = s.reindex_forward_fill(&[1, 2, 3, 4]);
        assert_eq!(filled.get(2), Some(10.0));
        assert_eq!(filled.get(4), Some(30.0));
    }

    #[test]
    fn rolling_median_uses_trailing_window() {
        let s = series(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
        let r = s.rolling_median(2, 1);
        assert_eq!(r.get(1), Some(1.0));
        assert_eq!(r.get(2), Some(1.5));
        assert_eq!(r.get(4), Some(3.5));
    }

    #[test]
    fn rolling_sum_respects_min_periods() {
        let s = series(&[(1, 1.0), (2, 1.0)]);
        let r = s.rolling_sum(5, 3, false);
        assert!(r.get(1).is_none());
        assert!(r.get(2).is_none());
    }

    #[test]
    fn add_unions_days_with_zero_default() {
        let a = series(&[(1, 1.0)]);
        let b = series(&[(2, 2.0)]);
        let s = a.add(&b);
        assert_eq!(s.get(1), Some(1.0));
        assert_eq!(s.get(2), Some(2.0));
    }
}
