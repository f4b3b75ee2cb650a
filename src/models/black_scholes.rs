use crate::errors::{EngineError, EngineResult};
use crate::models::{standard_normal, ModelParams};
use statrs::distribution::{ContinuousCDF, Normal};

/// European call valuation.
///
/// C = S * Phi(d1) - K * e^{-r*t} * Phi(d2)
///
/// with t = 0 collapsing to intrinsic value max(S - K, 0).
pub struct BlackScholesCall {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholesCall {
    pub fn new() -> Self {
        Self {
            normal: standard_normal(),
        }
    }

    /// Validated valuation entry point.
    pub fn value(&self, spot: f64, strike: f64, ttl_years: f64, rate: f64, sigma: f64) -> EngineResult<f64> {
        validate(spot, strike, ttl_years, rate, sigma)?;
        Ok(self.price(&ModelParams::new(spot, strike, ttl_years, rate, sigma)))
    }

    /// Pure pricing on already-validated params. Never panics.
    #[inline]
    pub fn price(&self, params: &ModelParams) -> f64 {
        if params.ttl_years <= 0.0 {
            return (params.spot - params.strike).max(0.0);
        }

        let d1 = params.d1();
        let d2 = params.d2();
        let discount = (-params.rate * params.ttl_years).exp();

        params.spot * self.normal.cdf(d1) - params.strike * discount * self.normal.cdf(d2)
    }
}

impl Default for BlackScholesCall {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(spot: f64, strike: f64, ttl_years: f64, rate: f64, sigma: f64) -> EngineResult<()> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(EngineError::InvalidParameter(format!("spot must be > 0, got {spot}")));
    }
    if !(strike.is_finite() && strike > 0.0) {
        return Err(EngineError::InvalidParameter(format!("strike must be > 0, got {strike}")));
    }
    if !(ttl_years.is_finite() && ttl_years >= 0.0) {
        return Err(EngineError::InvalidParameter(format!(
            "time to expiry must be >= 0, got {ttl_years}"
        )));
    }
    if !rate.is_finite() {
        return Err(EngineError::InvalidParameter(format!("rate must be finite, got {rate}")));
    }
    if ttl_years > 0.0 && !(sigma.is_finite() && sigma > 0.0) {
        return Err(EngineError::InvalidParameter(format!(
            "volatility must be > 0 when t > 0, got {sigma}"
        )));
    }
    Ok(())
}
