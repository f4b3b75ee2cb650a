use crate::errors::{EngineError, EngineResult};

/// Day-offset checkpoints from today to expiry, chosen by horizon.
///
/// | days to expiry | checkpoints              |
/// |----------------|--------------------------|
/// | <= 30          | 0, 7, 14, days           |
/// | 31..=90        | 0, 14, 30, days          |
/// | 91..=365       | 0, 30, 90, days          |
/// | > 365          | 0, 90, 365, +365 steps.. |
///
/// The last entry is always `days_to_expiry`, even when it is not larger
/// than the entry before it (a 10-day option yields [0, 7, 14, 10]).
/// Offsets past expiry are filtered by the evaluator, not here.
pub fn time_checkpoints(days_to_expiry: i64) -> EngineResult<Vec<i64>> {
    if days_to_expiry < 0 {
        return Err(EngineError::InvalidRange(format!(
            "days to expiry must be >= 0, got {days_to_expiry} (option already expired)"
        )));
    }

    let days = days_to_expiry;
    let checkpoints = match days {
        0..=30 => vec![0, 7, 14, days],
        31..=90 => vec![0, 14, 30, days],
        91..=365 => vec![0, 30, 90, days],
        _ => {
            let mut out = vec![0, 90, 365];
            let mut last = 365;
            while last < days - 365 {
                last += 365;
                out.push(last);
            }
            out.push(days);
            out.truncate(4);
            // Truncation can cut the expiry itself; re-pin the final slot.
            if let Some(tail) = out.last_mut() {
                *tail = days;
            }
            out
        }
    };

    Ok(checkpoints)
}

/// `count` evenly spaced prices over [low, high], both endpoints included.
pub fn price_samples(low: f64, high: f64, count: usize) -> EngineResult<Vec<f64>> {
    if count < 2 {
        return Err(EngineError::InvalidRange(format!("sample count must be >= 2, got {count}")));
    }
    if !(low.is_finite() && high.is_finite() && low < high) {
        return Err(EngineError::InvalidRange(format!(
            "price range must satisfy low < high, got [{low}, {high}]"
        )));
    }
    if low <= 0.0 {
        return Err(EngineError::InvalidRange(format!(
            "price range must be strictly positive, got [{low}, {high}]"
        )));
    }

    let step = (high - low) / (count - 1) as f64;
    let mut samples: Vec<f64> = (0..count).map(|i| low + i as f64 * step).collect();
    // Pin the endpoint against accumulated rounding.
    samples[count - 1] = high;
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_horizon_keeps_late_checkpoint() {
        assert_eq!(time_checkpoints(10).unwrap(), vec![0, 7, 14, 10]);
        assert_eq!(time_checkpoints(30).unwrap(), vec![0, 7, 14, 30]);
        assert_eq!(time_checkpoints(0).unwrap(), vec![0, 7, 14, 0]);
    }

    #[test]
    fn test_medium_horizons() {
        assert_eq!(time_checkpoints(31).unwrap(), vec![0, 14, 30, 31]);
        assert_eq!(time_checkpoints(90).unwrap(), vec![0, 14, 30, 90]);
        assert_eq!(time_checkpoints(91).unwrap(), vec![0, 30, 90, 91]);
        assert_eq!(time_checkpoints(365).unwrap(), vec![0, 30, 90, 365]);
    }

    #[test]
    fn test_long_horizon_truncates_to_four() {
        assert_eq!(time_checkpoints(400).unwrap(), vec![0, 90, 365, 400]);
        assert_eq!(time_checkpoints(1_000).unwrap(), vec![0, 90, 365, 1_000]);
        assert_eq!(time_checkpoints(2_000).unwrap(), vec![0, 90, 365, 2_000]);
    }

    #[test]
    fn test_expired_option_rejected() {
        assert!(matches!(time_checkpoints(-1), Err(EngineError::InvalidRange(_))));
    }

    #[test]
    fn test_three_samples() {
        assert_eq!(price_samples(90.0, 110.0, 3).unwrap(), vec![90.0, 100.0, 110.0]);
    }

    #[test]
    fn test_bad_ranges() {
        assert!(matches!(price_samples(90.0, 110.0, 1), Err(EngineError::InvalidRange(_))));
        assert!(matches!(price_samples(110.0, 110.0, 5), Err(EngineError::InvalidRange(_))));
        assert!(matches!(price_samples(120.0, 110.0, 5), Err(EngineError::InvalidRange(_))));
        assert!(matches!(price_samples(f64::NAN, 110.0, 5), Err(EngineError::InvalidRange(_))));
    }

    #[test]
    fn test_non_positive_low_rejected() {
        for low in [0.0, -10.0] {
            match price_samples(low, 200.0, 5) {
                Err(EngineError::InvalidRange(msg)) => assert!(msg.contains("200"), "{msg}"),
                other => panic!("expected InvalidRange, got {other:?}"),
            }
        }
    }

    proptest! {
        #[test]
        fn prop_last_checkpoint_is_expiry(days in 0_i64..5_000) {
            let grid = time_checkpoints(days).unwrap();
            prop_assert_eq!(grid.len(), 4);
            prop_assert_eq!(grid[0], 0);
            prop_assert_eq!(*grid.last().unwrap(), days);
        }

        #[test]
        fn prop_samples_span_range(low in 1.0_f64..500.0, width in 0.5_f64..500.0, n in 2_usize..200) {
            let high = low + width;
            let s = price_samples(low, high, n).unwrap();
            prop_assert_eq!(s.len(), n);
            prop_assert_eq!(s[0], low);
            prop_assert_eq!(s[n - 1], high);
            prop_assert!(s.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
