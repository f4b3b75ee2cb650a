use crate::errors::{EngineError, EngineResult};
use crate::models::black_scholes::BlackScholesCall;
use crate::models::ModelParams;
use roots::{find_root_brent, SearchError, SimpleConvergency};

/// Volatility bracket searched by the solver.
pub const VOL_LOWER: f64 = 1e-6;
pub const VOL_UPPER: f64 = 5.0;

/// Maximum pricing residual (price units) accepted for a solved volatility.
pub const PRICE_TOLERANCE: f64 = 1e-6;

/// Hard cap on Brent iterations.
pub const MAX_ITERATIONS: usize = 100;

/// Brent stops when |residual| or the bracket width falls below this.
/// Kept well under PRICE_TOLERANCE so the residual check below passes
/// whenever the bracket collapses.
const SEARCH_EPS: f64 = 1e-10;

/// Result of a successful implied volatility solve.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SolvedVolatility {
    pub sigma: f64,
    /// |Valuation(sigma) - observed price|
    pub residual: f64,
    pub ttl_years: f64,
}

/// Invert the call valuation against an observed price.
///
/// Brent root-finding on sigma -> C(sigma) - P over [VOL_LOWER, VOL_UPPER].
/// Fails when the observed price has no sign change in the bracket (outside
/// the no-arbitrage band) or when the iteration cap is hit.
pub fn solve_call_vol(
    model: &BlackScholesCall,
    spot: f64,
    strike: f64,
    ttl_years: f64,
    rate: f64,
    observed_price: f64,
) -> EngineResult<SolvedVolatility> {
    if !(observed_price.is_finite() && observed_price > 0.0) {
        return Err(EngineError::ImpliedVolatility(format!(
            "observed price must be > 0, got {observed_price}"
        )));
    }
    if !(ttl_years.is_finite() && ttl_years > 0.0) {
        return Err(EngineError::ImpliedVolatility(format!(
            "no time value to invert at t={ttl_years}"
        )));
    }
    // Surface malformed spot/strike/rate as parameter errors before searching.
    model.value(spot, strike, ttl_years, rate, VOL_UPPER)?;

    let residual = |sigma: f64| model.price(&ModelParams::new(spot, strike, ttl_years, rate, sigma)) - observed_price;

    let lo = residual(VOL_LOWER);
    let hi = residual(VOL_UPPER);
    if lo * hi > 0.0 {
        let lower_bound = observed_price - lo;
        let upper_bound = observed_price - hi;
        return Err(EngineError::ImpliedVolatility(format!(
            "observed price {observed_price} outside [{lower_bound:.6}, {upper_bound:.6}] \
             for S={spot} K={strike} t={ttl_years:.6} r={rate}"
        )));
    }

    let mut convergency = SimpleConvergency {
        eps: SEARCH_EPS,
        max_iter: MAX_ITERATIONS,
    };
    let sigma = find_root_brent(VOL_LOWER, VOL_UPPER, &residual, &mut convergency).map_err(|e| match e {
        SearchError::NoConvergency => EngineError::ImpliedVolatility(format!(
            "no convergence within {MAX_ITERATIONS} iterations for price {observed_price}"
        )),
        other => EngineError::ImpliedVolatility(format!("root search failed: {other}")),
    })?;

    let fit = residual(sigma).abs();
    if !(sigma > 0.0 && fit < PRICE_TOLERANCE) {
        return Err(EngineError::ImpliedVolatility(format!(
            "solved sigma={sigma} leaves residual {fit:e} above {PRICE_TOLERANCE:e}"
        )));
    }

    Ok(SolvedVolatility {
        sigma,
        residual: fit,
        ttl_years,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_recovers_reference_vol() {
        let bs = BlackScholesCall::new();
        let price = bs.value(100.0, 100.0, 1.0, 0.05, 0.2).unwrap();
        let solved = solve_call_vol(&bs, 100.0, 100.0, 1.0, 0.05, price).unwrap();
        assert!((solved.sigma - 0.2).abs() < 1e-6, "sigma={}", solved.sigma);
        assert!(solved.residual < PRICE_TOLERANCE);
    }

    #[test]
    fn test_price_above_spot_fails() {
        let bs = BlackScholesCall::new();
        let err = solve_call_vol(&bs, 100.0, 100.0, 1.0, 0.05, 150.0).unwrap_err();
        assert!(matches!(err, EngineError::ImpliedVolatility(_)), "{err}");
    }

    #[test]
    fn test_price_below_intrinsic_fails() {
        let bs = BlackScholesCall::new();
        // Deep ITM: lower bound is S - K*e^{-rt} ~= 54.9
        let err = solve_call_vol(&bs, 150.0, 100.0, 1.0, 0.05, 40.0).unwrap_err();
        assert!(matches!(err, EngineError::ImpliedVolatility(_)), "{err}");
    }

    #[test]
    fn test_zero_time_fails() {
        let bs = BlackScholesCall::new();
        assert!(matches!(
            solve_call_vol(&bs, 100.0, 100.0, 0.0, 0.05, 5.0),
            Err(EngineError::ImpliedVolatility(_))
        ));
    }

    #[test]
    fn test_bad_spot_is_parameter_error() {
        let bs = BlackScholesCall::new();
        assert!(matches!(
            solve_call_vol(&bs, -5.0, 100.0, 1.0, 0.05, 5.0),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            s in 50.0_f64..150.0,
            k in 80.0_f64..120.0,
            t in 0.1_f64..2.0,
            r in 0.0_f64..0.08,
            sigma in 0.1_f64..0.8,
        ) {
            let bs = BlackScholesCall::new();
            let price = bs.value(s, k, t, r, sigma).unwrap();
            // Skip prices that are almost all intrinsic; vega is too small to invert.
            let lower_bound = (s - k * (-r * t).exp()).max(0.0);
            prop_assume!(price - lower_bound > 1e-2);
            let solved = solve_call_vol(&bs, s, k, t, r, price).unwrap();
            prop_assert!((solved.sigma - sigma).abs() < 1e-4, "{} vs {}", solved.sigma, sigma);
        }
    }
}
