use crate::errors::{EngineError, EngineResult};
use crate::models::black_scholes::BlackScholesCall;
use crate::models::probability::LognormalProbability;
use crate::models::DAYS_PER_YEAR;
use chrono::{Days, NaiveDate};

/// Percentage scored for the "price stays below this level" branch.
/// Deliberately a total loss regardless of the real downside.
pub const TOTAL_LOSS_PCT: f64 = -100.0;

/// One revalued (price, date) cell. Read-only once emitted.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ScenarioResult {
    pub date: NaiveDate,
    pub days_to_expiry: i64,
    pub stock_price: f64,
    pub option_value: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub prob_above: f64,
    pub prob_below: f64,
    pub ev_pct: f64,
}

/// Inputs fixed for a whole run. The solved volatility is flat across
/// every cell.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioInputs {
    pub today: NaiveDate,
    pub expiry: NaiveDate,
    pub reference_spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub sigma: f64,
    pub observed_price: f64,
}

/// Revalues the option over the price x time grid.
pub struct ScenarioEvaluator<'a> {
    valuation: &'a BlackScholesCall,
    probability: &'a LognormalProbability,
    inputs: ScenarioInputs,
}

impl<'a> ScenarioEvaluator<'a> {
    pub fn new(
        valuation: &'a BlackScholesCall,
        probability: &'a LognormalProbability,
        inputs: ScenarioInputs,
    ) -> EngineResult<Self> {
        if !(inputs.observed_price.is_finite() && inputs.observed_price > 0.0) {
            return Err(EngineError::InvalidParameter(format!(
                "observed price must be > 0, got {}",
                inputs.observed_price
            )));
        }
        Ok(Self {
            valuation,
            probability,
            inputs,
        })
    }

    pub fn inputs(&self) -> &ScenarioInputs {
        &self.inputs
    }

    /// Evaluate every surviving (price, checkpoint) pair, price-major then
    /// checkpoint-minor.
    pub fn evaluate(&self, prices: &[f64], checkpoints: &[i64]) -> EngineResult<Vec<ScenarioResult>> {
        let mut results = Vec::with_capacity(prices.len() * checkpoints.len());
        for &price in prices {
            for &offset in checkpoints {
                match self.evaluate_cell(price, offset)? {
                    Some(result) => results.push(result),
                    None => tracing::debug!(price, offset, "scenario date past expiry, skipped"),
                }
            }
        }
        Ok(results)
    }

    /// Evaluate one cell. `None` when today + `offset_days` falls after expiry.
    pub fn evaluate_cell(&self, price: f64, offset_days: i64) -> EngineResult<Option<ScenarioResult>> {
        let inputs = &self.inputs;
        let Some(date) = offset_date(inputs.today, offset_days) else {
            return Err(EngineError::InvalidRange(format!(
                "checkpoint offset {offset_days} days is not representable from {}",
                inputs.today
            )));
        };
        if date > inputs.expiry {
            return Ok(None);
        }

        let days_remaining = (inputs.expiry - date).num_days();
        let remaining_years = (days_remaining as f64 / DAYS_PER_YEAR).max(0.0);

        let option_value = self
            .valuation
            .value(price, inputs.strike, remaining_years, inputs.rate, inputs.sigma)?;
        let pnl = option_value - inputs.observed_price;
        let pnl_pct = pnl / inputs.observed_price * 100.0;

        let elapsed_years = offset_days as f64 / DAYS_PER_YEAR;
        let prob_above = self
            .probability
            .prob_above(inputs.reference_spot, price, elapsed_years, inputs.rate, inputs.sigma)?;
        let prob_below = 1.0 - prob_above;

        Ok(Some(ScenarioResult {
            date,
            days_to_expiry: days_remaining,
            stock_price: price,
            option_value,
            pnl,
            pnl_pct,
            prob_above,
            prob_below,
            ev_pct: pnl_pct * prob_above + TOTAL_LOSS_PCT * prob_below,
        }))
    }
}

fn offset_date(today: NaiveDate, offset_days: i64) -> Option<NaiveDate> {
    let days = Days::new(offset_days.unsigned_abs());
    if offset_days >= 0 {
        today.checked_add_days(days)
    } else {
        today.checked_sub_days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::grid::{price_samples, time_checkpoints};

    fn inputs(days: u64) -> ScenarioInputs {
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        ScenarioInputs {
            today,
            expiry: today.checked_add_days(Days::new(days)).unwrap(),
            reference_spot: 100.0,
            strike: 100.0,
            rate: 0.05,
            sigma: 0.3,
            observed_price: 4.0,
        }
    }

    #[test]
    fn test_past_expiry_checkpoint_dropped() {
        let bs = BlackScholesCall::new();
        let prob = LognormalProbability::new();
        let eval = ScenarioEvaluator::new(&bs, &prob, inputs(10)).unwrap();

        let prices = price_samples(90.0, 110.0, 3).unwrap();
        let days = time_checkpoints(10).unwrap();
        let results = eval.evaluate(&prices, &days).unwrap();

        // 3 prices x {0, 7, 10}; the 14-day checkpoint is past expiry.
        assert_eq!(results.len(), 9);
        assert!(results.iter().all(|r| r.days_to_expiry >= 0));
        assert!(results.iter().all(|r| r.date <= eval.inputs().expiry));

        let order: Vec<(f64, i64)> = results.iter().map(|r| (r.stock_price, r.days_to_expiry)).collect();
        assert_eq!(
            order,
            vec![
                (90.0, 10), (90.0, 3), (90.0, 0),
                (100.0, 10), (100.0, 3), (100.0, 0),
                (110.0, 10), (110.0, 3), (110.0, 0),
            ]
        );
    }

    #[test]
    fn test_today_cell_uses_indicator_probability() {
        let bs = BlackScholesCall::new();
        let prob = LognormalProbability::new();
        let eval = ScenarioEvaluator::new(&bs, &prob, inputs(60)).unwrap();

        let above = eval.evaluate_cell(110.0, 0).unwrap().unwrap();
        assert_eq!(above.prob_above, 0.0);
        assert_eq!(above.ev_pct, TOTAL_LOSS_PCT);

        let at = eval.evaluate_cell(100.0, 0).unwrap().unwrap();
        assert_eq!(at.prob_above, 1.0);
        assert_eq!(at.prob_below, 0.0);
        assert!((at.ev_pct - at.pnl_pct).abs() < 1e-12);
    }

    #[test]
    fn test_expiry_cell_is_intrinsic() {
        let bs = BlackScholesCall::new();
        let prob = LognormalProbability::new();
        let eval = ScenarioEvaluator::new(&bs, &prob, inputs(30)).unwrap();

        let r = eval.evaluate_cell(120.0, 30).unwrap().unwrap();
        assert_eq!(r.days_to_expiry, 0);
        assert!((r.option_value - 20.0).abs() < 1e-12);
        assert!((r.pnl - 16.0).abs() < 1e-12);
        assert!((r.pnl_pct - 400.0).abs() < 1e-9);
        assert!((r.prob_above + r.prob_below - 1.0).abs() < 1e-12);
        let expected = r.pnl_pct * r.prob_above - 100.0 * r.prob_below;
        assert!((r.ev_pct - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_positive_observed_price() {
        let bs = BlackScholesCall::new();
        let prob = LognormalProbability::new();
        let mut bad = inputs(30);
        bad.observed_price = 0.0;
        assert!(ScenarioEvaluator::new(&bs, &prob, bad).is_err());
    }
}
