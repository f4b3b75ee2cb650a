use crate::engine::{MarketObservation, RunOutput, RunSummary};
use crate::errors::EngineResult;
use crate::models::implied_vol::SolvedVolatility;
use crate::scenario::evaluator::ScenarioResult;
use std::fmt::Write as _;
use std::path::Path;

const COLUMNS: [&str; 9] = [
    "Date",
    "Days_To_Expiry",
    "Stock_Price",
    "Option_Value",
    "PnL_$",
    "PnL_%",
    "Prob_Above",
    "Prob_Below",
    "EV_%",
];

/// Fixed-width console table, two decimals.
pub fn render_table(results: &[ScenarioResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", COLUMNS.map(|c| format!("{c:>14}")).join(""));
    for r in results {
        let _ = writeln!(
            out,
            "{:>14}{:>14}{:>14.2}{:>14.2}{:>14.2}{:>14.2}{:>14.2}{:>14.2}{:>14.2}",
            r.date.to_string(),
            r.days_to_expiry,
            r.stock_price,
            r.option_value,
            r.pnl,
            r.pnl_pct,
            r.prob_above,
            r.prob_below,
            r.ev_pct,
        );
    }
    out
}

/// Comma-delimited table with a header row.
pub fn to_csv(results: &[ScenarioResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", COLUMNS.join(","));
    for r in results {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            r.date, r.days_to_expiry, r.stock_price, r.option_value, r.pnl, r.pnl_pct, r.prob_above, r.prob_below, r.ev_pct,
        );
    }
    out
}

pub fn write_csv(path: &Path, results: &[ScenarioResult]) -> EngineResult<()> {
    std::fs::write(path, to_csv(results))?;
    tracing::info!(path = %path.display(), rows = results.len(), "scenarios written");
    Ok(())
}

/// Serializable view of a run. Aggregation errors become their message.
#[derive(Debug, serde::Serialize)]
pub struct RunReport<'a> {
    pub observation: &'a MarketObservation,
    pub implied_vol: &'a SolvedVolatility,
    pub time_grid: &'a [i64],
    pub price_grid: &'a [f64],
    pub scenarios: &'a [ScenarioResult],
    pub discrete_ev: Result<f64, String>,
    pub continuous_ev: Result<f64, String>,
    pub summary: &'a RunSummary,
}

impl<'a> RunReport<'a> {
    pub fn new(output: &'a RunOutput) -> Self {
        Self {
            observation: &output.observation,
            implied_vol: &output.implied_vol,
            time_grid: &output.time_grid,
            price_grid: &output.price_grid,
            scenarios: &output.scenarios,
            discrete_ev: output.discrete_ev.as_ref().copied().map_err(|e| e.to_string()),
            continuous_ev: output.continuous_ev.as_ref().copied().map_err(|e| e.to_string()),
            summary: &output.summary,
        }
    }
}

pub fn write_json(path: &Path, output: &RunOutput) -> EngineResult<()> {
    let body = serde_json::to_string_pretty(&RunReport::new(output))?;
    std::fs::write(path, body)?;
    tracing::info!(path = %path.display(), "run report written");
    Ok(())
}
