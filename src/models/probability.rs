use crate::errors::{EngineError, EngineResult};
use crate::models::{standard_normal, ModelParams};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Terminal-price probability model under the same lognormal process used
/// for valuation.
///
/// P(S_tau >= K') = Phi(d1), with d1 built from (S, K', tau, r, sigma)
/// exactly as in the valuation. tau is the time elapsed from today to the
/// scenario date, not the option's remaining life at that date.
pub struct LognormalProbability {
    normal: Normal,
}

impl LognormalProbability {
    pub fn new() -> Self {
        Self {
            normal: standard_normal(),
        }
    }

    /// Probability that a price starting at `spot` is at or above `level`
    /// after `elapsed_years`.
    pub fn prob_above(&self, spot: f64, level: f64, elapsed_years: f64, rate: f64, sigma: f64) -> EngineResult<f64> {
        validate_levels(spot, level)?;
        if !(elapsed_years.is_finite() && elapsed_years >= 0.0) {
            return Err(EngineError::InvalidParameter(format!(
                "elapsed time must be >= 0, got {elapsed_years}"
            )));
        }
        if elapsed_years > 0.0 && !(sigma.is_finite() && sigma > 0.0) {
            return Err(EngineError::InvalidParameter(format!(
                "volatility must be > 0 when elapsed time > 0, got {sigma}"
            )));
        }

        let params = ModelParams::new(spot, level, elapsed_years, rate, sigma);
        if params.is_degenerate() {
            return Ok(if spot >= level { 1.0 } else { 0.0 });
        }
        Ok(self.normal.cdf(params.d1()))
    }

    /// Lognormal transform of the standard normal density:
    ///
    /// f(S') = phi(ln(S'/S) / (sigma * sqrt(t))) / (S' * sigma * sqrt(t))
    ///
    /// No drift shift is applied to the log-return, so this is not the
    /// risk-neutral terminal density. Values must stay reproducible against
    /// the historical output, so leave it uncorrected.
    pub fn terminal_density(&self, spot: f64, level: f64, ttl_years: f64, sigma: f64) -> EngineResult<f64> {
        validate_levels(spot, level)?;
        let sigma_sqrt_t = sigma * ttl_years.max(0.0).sqrt();
        if !(sigma_sqrt_t.is_finite() && sigma_sqrt_t > 0.0) {
            return Err(EngineError::InvalidParameter(format!(
                "density needs sigma*sqrt(t) > 0, got sigma={sigma} t={ttl_years}"
            )));
        }
        let z = (level / spot).ln() / sigma_sqrt_t;
        Ok(self.normal.pdf(z) / (level * sigma_sqrt_t))
    }
}

impl Default for LognormalProbability {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_levels(spot: f64, level: f64) -> EngineResult<()> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(EngineError::InvalidParameter(format!("reference spot must be > 0, got {spot}")));
    }
    if !(level.is_finite() && level > 0.0) {
        return Err(EngineError::InvalidParameter(format!("price level must be > 0, got {level}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_elapsed_is_indicator() {
        let m = LognormalProbability::new();
        assert_eq!(m.prob_above(100.0, 100.0, 0.0, 0.05, 0.3).unwrap(), 1.0);
        assert_eq!(m.prob_above(100.0, 90.0, 0.0, 0.05, 0.3).unwrap(), 1.0);
        assert_eq!(m.prob_above(100.0, 110.0, 0.0, 0.05, 0.3).unwrap(), 0.0);
    }

    #[test]
    fn test_matches_phi_d1() {
        // S=K=100, tau=1, r=5%, sigma=20%: d1 = 0.35, Phi(0.35) ~= 0.636831
        let p = LognormalProbability::new().prob_above(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
        assert!((p - 0.636831).abs() < 1e-5, "p={p}");
    }

    #[test]
    fn test_decreasing_in_level() {
        let m = LognormalProbability::new();
        let low = m.prob_above(100.0, 80.0, 0.5, 0.05, 0.3).unwrap();
        let high = m.prob_above(100.0, 120.0, 0.5, 0.05, 0.3).unwrap();
        assert!(low > high, "P(>=80)={low} should exceed P(>=120)={high}");
    }

    #[test]
    fn test_density_peak_and_mass() {
        let m = LognormalProbability::new();
        // At S' = S the density is phi(0) / (S * sigma * sqrt(t)).
        let at_spot = m.terminal_density(100.0, 100.0, 1.0, 0.2).unwrap();
        let expected = 0.398_942_280_4 / 20.0;
        assert!((at_spot - expected).abs() < 1e-9, "density={at_spot}");

        // Lognormal density integrates to ~1 over a wide range.
        let n = 20_000;
        let (a, b) = (1.0, 1_000.0);
        let h = (b - a) / n as f64;
        let mass: f64 = (0..n)
            .map(|i| m.terminal_density(100.0, a + (i as f64 + 0.5) * h, 1.0, 0.2).unwrap() * h)
            .sum();
        assert!((mass - 1.0).abs() < 1e-3, "mass={mass}");
    }

    #[test]
    fn test_rejects_non_positive_level() {
        let m = LognormalProbability::new();
        assert!(matches!(m.prob_above(100.0, 0.0, 1.0, 0.05, 0.2), Err(EngineError::InvalidParameter(_))));
        assert!(matches!(m.terminal_density(100.0, 100.0, 0.0, 0.2), Err(EngineError::InvalidParameter(_))));
    }

    proptest! {
        #[test]
        fn prop_strictly_inside_unit_interval(
            s in 80.0_f64..120.0,
            k in 80.0_f64..120.0,
            tau in 0.25_f64..2.0,
            r in 0.0_f64..0.08,
            sigma in 0.2_f64..1.0,
        ) {
            let p = LognormalProbability::new().prob_above(s, k, tau, r, sigma).unwrap();
            prop_assert!(p > 0.0 && p < 1.0, "p={}", p);
        }
    }
}
