mod config;
mod engine;
mod errors;
mod execution;
mod feeds;
mod models;
mod report;
mod scenario;

use crate::config::{AppConfig, OutputFormat};
use crate::engine::TracingObserver;
use crate::errors::{EngineError, EngineResult};
use crate::feeds::options_chain::ChainClient;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("call_ev starting");

    // Load config
    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cfg).await {
        tracing::error!(
            spot = ?cfg.spot_price,
            strike = cfg.strike,
            expiry = %cfg.expiry,
            rate = cfg.risk_free_rate,
            market_price = ?cfg.market_price,
            price_low = cfg.price_low,
            price_high = cfg.price_high,
            num_samples = cfg.num_samples,
            "run failed: {e}"
        );
        std::process::exit(1);
    }
}

async fn run(cfg: &AppConfig) -> EngineResult<()> {
    let (spot, market_price) = resolve_prices(cfg).await?;
    let run_config = cfg.run_config(spot, market_price);
    let today = chrono::Local::now().date_naive();

    let output = engine::run(&run_config, today, &TracingObserver)?;

    println!("{}", report::render_table(&output.scenarios));
    match &output.discrete_ev {
        Ok(ev) => println!("Discrete EV:   {ev:.2}%"),
        Err(e) => println!("Discrete EV:   unavailable ({e})"),
    }
    match &output.continuous_ev {
        Ok(ev) => println!("Continuous EV: {ev:.4}%"),
        Err(e) => println!("Continuous EV: unavailable ({e})"),
    }

    if let Some(path) = &cfg.output_path {
        match cfg.output_format {
            OutputFormat::Csv => report::write_csv(path, &output.scenarios)?,
            OutputFormat::Json => report::write_json(path, &output)?,
        }
    }

    Ok(())
}

/// Spot and option price, from the environment or the options chain.
async fn resolve_prices(cfg: &AppConfig) -> EngineResult<(f64, f64)> {
    let (Some(source), true) = (&cfg.chain, cfg.spot_price.is_none() || cfg.market_price.is_none()) else {
        return Ok((cfg.spot_price.unwrap_or_default(), cfg.market_price.unwrap_or_default()));
    };

    let chain = ChainClient::new(&source.base_url).fetch(&source.ticker).await?;
    let spot = match cfg.spot_price.or(chain.underlying_price) {
        Some(s) => s,
        None => return Err(EngineError::Parse(format!("{}: no underlying price in chain", source.ticker))),
    };
    let market_price = match cfg.market_price {
        Some(p) => p,
        None => {
            let quote = chain.find_call(cfg.strike, cfg.expiry).ok_or_else(|| {
                EngineError::Parse(format!(
                    "{}: no call at strike {} expiring {} (listed: {:?})",
                    source.ticker,
                    cfg.strike,
                    cfg.expiry,
                    chain.expirations()
                ))
            })?;
            quote
                .ask
                .ok_or_else(|| EngineError::Parse(format!("{}: no ask quoted", quote.symbol)))?
        }
    };

    tracing::info!(ticker = %source.ticker, spot, market_price, "prices taken from options chain");
    Ok((spot, market_price))
}
