use crate::errors::{EngineError, EngineResult};
use crate::execution::ev::{continuous_ev, discrete_ev, investment_ev, ContinuousEvParams};
use crate::execution::quadrature::QuadratureConfig;
use crate::models::black_scholes::BlackScholesCall;
use crate::models::implied_vol::{solve_call_vol, SolvedVolatility};
use crate::models::probability::LognormalProbability;
use crate::models::DAYS_PER_YEAR;
use crate::scenario::evaluator::{ScenarioEvaluator, ScenarioInputs, ScenarioResult};
use crate::scenario::grid::{price_samples, time_checkpoints};
use chrono::NaiveDate;

// ── Inputs ──

/// Caller-supplied market snapshot. Never mutated by the engine.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MarketObservation {
    pub spot: f64,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub rate: f64,
    pub market_price: f64,
}

/// Hypothetical price range sampled by the scenario grid.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct GridConfig {
    pub price_low: f64,
    pub price_high: f64,
    pub num_samples: usize,
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub observation: MarketObservation,
    pub grid: GridConfig,
    pub quadrature: QuadratureConfig,
}

// ── Outputs ──

/// Per-run summary handed to observers once the run finishes.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RunSummary {
    pub sigma: f64,
    pub days_to_expiry: i64,
    pub scenario_count: usize,
    pub discrete_ev: Option<f64>,
    pub continuous_ev: Option<f64>,
    pub quadrature_evaluations: Option<usize>,
    pub quadrature_error: Option<f64>,
    /// investment_ev() of the scenario with the highest P&L%.
    pub best_case_ev: Option<f64>,
}

#[derive(Debug)]
pub struct RunOutput {
    pub observation: MarketObservation,
    pub implied_vol: SolvedVolatility,
    pub days_to_expiry: i64,
    pub time_grid: Vec<i64>,
    pub price_grid: Vec<f64>,
    pub scenarios: Vec<ScenarioResult>,
    /// Aggregation failures do not discard the completed scenario pass.
    pub discrete_ev: EngineResult<f64>,
    pub continuous_ev: EngineResult<f64>,
    pub summary: RunSummary,
}

// ── Observability hook ──

/// Observation points of a run. Implementations must not influence
/// results; the engine produces identical output with any observer.
pub trait RunObserver: Send + Sync {
    fn on_volatility_solved(&self, observation: &MarketObservation, solved: &SolvedVolatility);

    fn on_run_complete(&self, summary: &RunSummary);
}

/// Emits structured tracing events.
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_volatility_solved(&self, observation: &MarketObservation, solved: &SolvedVolatility) {
        tracing::info!(
            spot = observation.spot,
            strike = observation.strike,
            market_price = observation.market_price,
            sigma = solved.sigma,
            residual = solved.residual,
            ttl_years = solved.ttl_years,
            "implied volatility solved"
        );
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        tracing::info!(
            sigma = summary.sigma,
            days_to_expiry = summary.days_to_expiry,
            scenarios = summary.scenario_count,
            discrete_ev = ?summary.discrete_ev,
            continuous_ev = ?summary.continuous_ev,
            quadrature_evaluations = ?summary.quadrature_evaluations,
            quadrature_error = ?summary.quadrature_error,
            best_case_ev = ?summary.best_case_ev,
            "run complete"
        );
    }
}

/// Discards every event.
#[allow(dead_code)]
pub struct SilentObserver;

impl RunObserver for SilentObserver {
    fn on_volatility_solved(&self, _observation: &MarketObservation, _solved: &SolvedVolatility) {}

    fn on_run_complete(&self, _summary: &RunSummary) {}
}

// ── Entry operation ──

/// Run the full pipeline for one observation:
/// solve IV once, build both grids, evaluate every cell, aggregate.
///
/// Setup failures (IV, grids) abort with `Err`. Aggregation failures are
/// reported inside the returned `RunOutput`.
pub fn run(config: &RunConfig, today: NaiveDate, observer: &dyn RunObserver) -> EngineResult<RunOutput> {
    let obs = config.observation;
    let days_to_expiry = (obs.expiry - today).num_days();
    if days_to_expiry < 0 {
        return Err(EngineError::InvalidRange(format!(
            "expiry {} is before today {today}",
            obs.expiry
        )));
    }
    let ttl_years = days_to_expiry as f64 / DAYS_PER_YEAR;

    let valuation = BlackScholesCall::new();
    let probability = LognormalProbability::new();

    let implied_vol = solve_call_vol(&valuation, obs.spot, obs.strike, ttl_years, obs.rate, obs.market_price)?;
    observer.on_volatility_solved(&obs, &implied_vol);

    let time_grid = time_checkpoints(days_to_expiry)?;
    let price_grid = price_samples(config.grid.price_low, config.grid.price_high, config.grid.num_samples)?;

    let evaluator = ScenarioEvaluator::new(
        &valuation,
        &probability,
        ScenarioInputs {
            today,
            expiry: obs.expiry,
            reference_spot: obs.spot,
            strike: obs.strike,
            rate: obs.rate,
            sigma: implied_vol.sigma,
            observed_price: obs.market_price,
        },
    )?;
    let scenarios = evaluator.evaluate(&price_grid, &time_grid)?;

    let discrete = discrete_ev(&scenarios);
    let continuous = continuous_ev(
        &evaluator,
        &probability,
        &ContinuousEvParams {
            price_low: config.grid.price_low,
            price_high: config.grid.price_high,
            ttl_years,
            days_to_expiry,
        },
        &config.quadrature,
    );

    if let Err(e) = &discrete {
        tracing::warn!(error = %e, "discrete EV unavailable");
    }
    if let Err(e) = &continuous {
        tracing::warn!(error = %e, "continuous EV unavailable");
    }

    let summary = RunSummary {
        sigma: implied_vol.sigma,
        days_to_expiry,
        scenario_count: scenarios.len(),
        discrete_ev: discrete.as_ref().ok().copied(),
        continuous_ev: continuous.as_ref().ok().map(|q| q.value),
        quadrature_evaluations: continuous.as_ref().ok().map(|q| q.evaluations),
        quadrature_error: continuous.as_ref().ok().map(|q| q.error_estimate),
        best_case_ev: best_case_ev(&scenarios),
    };
    observer.on_run_complete(&summary);

    Ok(RunOutput {
        observation: obs,
        implied_vol,
        days_to_expiry,
        time_grid,
        price_grid,
        scenarios,
        discrete_ev: discrete,
        continuous_ev: continuous.map(|q| q.value),
        summary,
    })
}

fn best_case_ev(scenarios: &[ScenarioResult]) -> Option<f64> {
    scenarios
        .iter()
        .max_by(|a, b| a.pnl_pct.total_cmp(&b.pnl_pct))
        .map(|r| investment_ev(r.pnl_pct, r.prob_above, r.prob_below))
}
