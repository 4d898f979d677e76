//! Pure backtest routines over a series of daily closes.
//!
//! Every function here is stateless and side-effect free. Callers are
//! expected to pass positive prices and non-negative percentages; these
//! preconditions are not checked.

use serde::Serialize;

/// Number of trading observations treated as one month.
///
/// A fixed approximation rather than calendar math, so historical
/// probabilities stay comparable between runs.
pub const OBSERVATIONS_PER_MONTH: usize = 30;

/// Absolute price levels derived from a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdSet {
    pub ko_price: f64,
    pub strike_price: f64,
    /// Zero when the structure has no knock-in barrier.
    pub ki_price: f64,
    pub ki_enabled: bool,
}

impl ThresholdSet {
    /// Knock-in price, if the barrier is enabled.
    pub fn knock_in(&self) -> Option<f64> {
        self.ki_enabled.then_some(self.ki_price)
    }
}

/// Breach and recovery of a single threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThresholdBreach {
    pub breached: bool,
    /// Observations between the first close below the threshold and the
    /// first later close at or above it.
    pub recovery_days: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BreachResult {
    pub strike: ThresholdBreach,
    pub knock_in: ThresholdBreach,
}

/// Derives KO, strike and KI prices as `reference_price * pct / 100`.
///
/// A `ki_pct` of zero disables the knock-in barrier.
pub fn derive_thresholds(
    reference_price: f64,
    ko_pct: f64,
    strike_pct: f64,
    ki_pct: f64,
) -> ThresholdSet {
    ThresholdSet {
        ko_price: reference_price * (ko_pct / 100.0),
        strike_price: reference_price * (strike_pct / 100.0),
        ki_price: reference_price * (ki_pct / 100.0),
        ki_enabled: ki_pct > 0.0,
    }
}

/// Percentage of rolling windows of `period_months * 30` observations whose
/// closing price at the end of the window is at or above `strike_price`.
///
/// The strike is an absolute level; the price at the start of each window
/// plays no part. Series not longer than the window yield `0.0`.
pub fn estimate_profit_probability(closes: &[f64], strike_price: f64, period_months: u32) -> f64 {
    let window = period_months as usize * OBSERVATIONS_PER_MONTH;
    if closes.len() <= window {
        return 0.0;
    }

    let total_windows = closes.len() - window;
    let profitable = closes[window..]
        .iter()
        .filter(|end_price| **end_price >= strike_price)
        .count();

    (profitable as f64 / total_windows as f64) * 100.0
}

/// Scans `closes` for the first close below `threshold` and the number of
/// observations until the price is back at or above it.
pub fn scan_threshold(closes: &[f64], threshold: f64) -> ThresholdBreach {
    let Some(breach_idx) = closes.iter().position(|close| *close < threshold) else {
        return ThresholdBreach::default();
    };

    let recovery_days = closes[breach_idx + 1..]
        .iter()
        .position(|close| *close >= threshold)
        .map(|offset| offset + 1);

    ThresholdBreach {
        breached: true,
        recovery_days,
    }
}

/// Breach analysis for the strike and, when `ki_price > 0`, the knock-in
/// barrier. The knock-out level is an upside barrier and is never scanned.
pub fn analyze_breach(closes: &[f64], strike_price: f64, ki_price: f64) -> BreachResult {
    let knock_in = if ki_price > 0.0 {
        scan_threshold(closes, ki_price)
    } else {
        ThresholdBreach::default()
    };

    BreachResult {
        strike: scan_threshold(closes, strike_price),
        knock_in,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn increasing(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + i as f64).collect()
    }

    fn decreasing(len: usize) -> Vec<f64> {
        (0..len).map(|i| 1000.0 - i as f64).collect()
    }

    #[test]
    fn test_probability_short_series_is_zero() {
        let closes = increasing(30);
        assert_eq!(estimate_profit_probability(&closes, 1.0, 1), 0.0);
        assert_eq!(estimate_profit_probability(&closes[..10], 1.0, 1), 0.0);
        assert_eq!(estimate_profit_probability(&[], 1.0, 1), 0.0);
        assert_eq!(estimate_profit_probability(&increasing(179), 1.0, 6), 0.0);
    }

    #[test]
    fn test_probability_increasing_series_above_strike() {
        let closes = increasing(400);
        for months in [1, 3, 6, 12] {
            assert_eq!(estimate_profit_probability(&closes, 100.0, months), 100.0);
        }
    }

    #[test]
    fn test_probability_decreasing_series_below_strike() {
        let closes = decreasing(400);
        for months in [1, 3, 6, 12] {
            assert_eq!(estimate_profit_probability(&closes, 1000.0, months), 0.0);
        }
    }

    #[test]
    fn test_probability_uses_window_end_against_absolute_strike() {
        // 31 observations, window of 30: a single window ending at index 30.
        let mut closes = vec![1.0; 31];
        closes[30] = 50.0;
        assert_eq!(estimate_profit_probability(&closes, 50.0, 1), 100.0);
        assert_eq!(estimate_profit_probability(&closes, 50.01, 1), 0.0);

        // 34 observations, 4 windows ending at indices 30..=33, two above.
        let mut closes = vec![10.0; 34];
        closes[31] = 20.0;
        closes[33] = 20.0;
        assert_eq!(estimate_profit_probability(&closes, 15.0, 1), 50.0);
    }

    #[test]
    fn test_breach_with_recovery() {
        let result = analyze_breach(&[10.0, 9.0, 8.0, 11.0, 12.0], 10.0, 0.0);
        assert!(result.strike.breached);
        assert_eq!(result.strike.recovery_days, Some(2));
    }

    #[test]
    fn test_breach_without_recovery() {
        let result = analyze_breach(&[10.0, 9.0, 8.0, 7.0], 10.0, 0.0);
        assert!(result.strike.breached);
        assert_eq!(result.strike.recovery_days, None);
    }

    #[test]
    fn test_no_breach() {
        let result = analyze_breach(&[10.0, 11.0, 12.0], 10.0, 0.0);
        assert_eq!(result.strike, ThresholdBreach::default());
    }

    #[test]
    fn test_disabled_knock_in_is_never_breached() {
        let result = analyze_breach(&[10.0, 1.0, 0.5, 0.1], 10.0, 0.0);
        assert!(result.strike.breached);
        assert!(!result.knock_in.breached);
        assert_eq!(result.knock_in.recovery_days, None);
    }

    #[test]
    fn test_knock_in_scanned_independently() {
        let closes = [10.0, 7.9, 6.0, 7.0, 8.5, 6.4, 6.6];
        let result = analyze_breach(&closes, 8.0, 6.5);
        assert_eq!(
            result.strike,
            ThresholdBreach {
                breached: true,
                recovery_days: Some(3),
            }
        );
        assert_eq!(
            result.knock_in,
            ThresholdBreach {
                breached: true,
                recovery_days: Some(1),
            }
        );
    }

    #[test]
    fn test_empty_series_breach() {
        assert_eq!(analyze_breach(&[], 10.0, 5.0), BreachResult::default());
    }

    #[test]
    fn test_derive_thresholds() {
        let thresholds = derive_thresholds(100.0, 100.0, 80.0, 65.0);
        assert_eq!(thresholds.ko_price, 100.0);
        assert_eq!(thresholds.strike_price, 80.0);
        assert_eq!(thresholds.ki_price, 65.0);
        assert_eq!(thresholds.knock_in(), Some(65.0));

        let no_ki = derive_thresholds(250.0, 100.0, 80.0, 0.0);
        assert_eq!(no_ki.ki_price, 0.0);
        assert!(!no_ki.ki_enabled);
        assert_eq!(no_ki.knock_in(), None);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let closes: Vec<f64> = (0..500).map(|i| 50.0 + ((i * 7) % 40) as f64).collect();
        let first = (
            estimate_profit_probability(&closes, 70.0, 3),
            analyze_breach(&closes, 70.0, 55.0),
            derive_thresholds(closes[499], 105.0, 85.0, 60.0),
        );
        for _ in 0..3 {
            assert_eq!(estimate_profit_probability(&closes, 70.0, 3), first.0);
            assert_eq!(analyze_breach(&closes, 70.0, 55.0), first.1);
            assert_eq!(derive_thresholds(closes[499], 105.0, 85.0, 60.0), first.2);
        }
    }
}
