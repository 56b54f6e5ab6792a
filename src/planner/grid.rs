use chrono::Utc;

/// First daily bucket boundary, 2018-08-16T00:00:00Z (spec §4.4).
pub const MIN_TIMESTAMP: i64 = 1_534_377_600;
pub const INTERVAL: i64 = 86_400;

/// The daily grid from `MIN_TIMESTAMP` (floored to the interval) up to
/// `now` (floored, exclusive), matching the original's `create_timestamps`.
pub fn grid(now: i64) -> Vec<i64> {
    let min_ts = MIN_TIMESTAMP / INTERVAL * INTERVAL;
    let now_floored = now / INTERVAL * INTERVAL;

    let mut timestamps = Vec::new();
    let mut t = min_ts;
    while t < now_floored {
        timestamps.push(t);
        t += INTERVAL;
    }
    timestamps
}

pub fn grid_now() -> Vec<i64> {
    grid(Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_starts_at_floored_min_timestamp() {
        let g = grid(MIN_TIMESTAMP + INTERVAL * 3 + 1);
        assert_eq!(g[0], MIN_TIMESTAMP);
        assert_eq!(g.len(), 4);
        assert_eq!(g[1] - g[0], INTERVAL);
    }

    #[test]
    fn grid_excludes_now_itself() {
        let g = grid(MIN_TIMESTAMP + INTERVAL);
        assert_eq!(g, vec![MIN_TIMESTAMP]);
    }

    #[test]
    fn grid_before_min_timestamp_is_empty() {
        assert!(grid(MIN_TIMESTAMP - 1).is_empty());
    }
}
