//! Aggregate expected value over a run.
//!
//! Discrete:   EV = mean(EV%_i) over every emitted scenario
//! Continuous: EV = integral over [low, high] of EV%(S') * f(S') dS'
//!
//! where EV%(S') is the scenario EV% at expiry for terminal price S', and
//! f is the lognormal-transformed standard normal density around the
//! reference spot with the full time to expiry.

use crate::errors::{EngineError, EngineResult};
use crate::execution::quadrature::{integrate, Quadrature, QuadratureConfig};
use crate::models::probability::LognormalProbability;
use crate::scenario::evaluator::{ScenarioEvaluator, ScenarioResult};

/// Arithmetic mean of EV% across all scenarios.
pub fn discrete_ev(results: &[ScenarioResult]) -> EngineResult<f64> {
    if results.is_empty() {
        return Err(EngineError::Aggregation("no scenarios to average".into()));
    }
    let sum: f64 = results.iter().map(|r| r.ev_pct).sum();
    Ok(sum / results.len() as f64)
}

/// Inputs to the continuous EV integral.
#[derive(Debug, Clone, Copy)]
pub struct ContinuousEvParams {
    pub price_low: f64,
    pub price_high: f64,
    /// Full time to expiry in years (density horizon).
    pub ttl_years: f64,
    pub days_to_expiry: i64,
}

/// Probability-weighted EV% integrated over the price range.
pub fn continuous_ev(
    evaluator: &ScenarioEvaluator<'_>,
    density: &LognormalProbability,
    params: &ContinuousEvParams,
    config: &QuadratureConfig,
) -> EngineResult<Quadrature> {
    let inputs = evaluator.inputs();
    let integrand = |price: f64| -> EngineResult<f64> {
        let cell = evaluator.evaluate_cell(price, params.days_to_expiry)?.ok_or_else(|| {
            EngineError::Aggregation(format!("expiry checkpoint {} unexpectedly skipped", params.days_to_expiry))
        })?;
        let weight = density.terminal_density(inputs.reference_spot, price, params.ttl_years, inputs.sigma)?;
        Ok(cell.ev_pct * weight)
    };

    // The density peaks at the reference spot and the payoff kinks at the strike.
    let breakpoints = [inputs.reference_spot, inputs.strike];
    integrate(integrand, params.price_low, params.price_high, &breakpoints, config)
}

/// Two-outcome investment EV in percent.
///
/// EV% = (max_gain% / 100 * P(max) - P(zero)) * 100
///
/// Pure function. Scenario EV% is the special case where P(max) is the
/// probability of finishing at or above the scenario price and P(zero)
/// its complement.
#[inline]
pub fn investment_ev(max_gain_percent: f64, chance_of_max: f64, chance_of_zero: f64) -> f64 {
    let max_gain = max_gain_percent / 100.0;
    (max_gain * chance_of_max - chance_of_zero) * 100.0
}
