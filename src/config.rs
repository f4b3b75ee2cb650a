use crate::engine::{GridConfig, MarketObservation, RunConfig};
use crate::errors::{EngineError, EngineResult};
use crate::execution::quadrature::QuadratureConfig;
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Where spot and market price come from when they are not set directly.
#[derive(Debug, Clone)]
pub struct ChainSource {
    pub ticker: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spot_price: Option<f64>,
    pub strike: f64,
    pub expiry: NaiveDate,
    pub risk_free_rate: f64,
    pub market_price: Option<f64>,
    pub price_low: f64,
    pub price_high: f64,
    pub num_samples: usize,
    pub quad_tolerance: f64,
    pub quad_max_evaluations: usize,
    pub chain: Option<ChainSource>,
    pub output_path: Option<PathBuf>,
    pub output_format: OutputFormat,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` wires this to the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| EngineError::Config(format!("missing env var: {key}")));

        let chain = get("OPTION_TICKER").map(|ticker| ChainSource {
            ticker,
            base_url: get("CHAIN_BASE_URL")
                .unwrap_or_else(|| "https://query2.finance.yahoo.com/v7/finance/options".to_string()),
        });

        // Spot and market price may come from the chain instead.
        let spot_price = get("SPOT_PRICE").map(|v| parse_f64("SPOT_PRICE", &v)).transpose()?;
        let market_price = get("MARKET_PRICE").map(|v| parse_f64("MARKET_PRICE", &v)).transpose()?;
        if chain.is_none() {
            if spot_price.is_none() {
                return Err(EngineError::Config("missing env var: SPOT_PRICE (or set OPTION_TICKER)".into()));
            }
            if market_price.is_none() {
                return Err(EngineError::Config("missing env var: MARKET_PRICE (or set OPTION_TICKER)".into()));
            }
        }

        let output_format = match get("OUTPUT_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("csv") => OutputFormat::Csv,
            Some("json") => OutputFormat::Json,
            Some(other) => return Err(EngineError::Config(format!("OUTPUT_FORMAT: unknown format {other}"))),
        };

        let defaults = QuadratureConfig::default();

        Ok(Self {
            spot_price,
            strike: parse_f64("STRIKE", &required("STRIKE")?)?,
            expiry: parse_expiry(&required("EXPIRY")?)?,
            risk_free_rate: parse_f64("RISK_FREE_RATE", &get("RISK_FREE_RATE").unwrap_or_else(|| "0.05".into()))?,
            market_price,
            price_low: parse_f64("PRICE_LOW", &required("PRICE_LOW")?)?,
            price_high: parse_f64("PRICE_HIGH", &required("PRICE_HIGH")?)?,
            num_samples: get("NUM_SAMPLES")
                .unwrap_or_else(|| "5".into())
                .parse::<usize>()
                .map_err(|e| EngineError::Config(format!("NUM_SAMPLES: {e}")))?,
            quad_tolerance: get("QUAD_TOLERANCE")
                .map(|v| parse_f64("QUAD_TOLERANCE", &v))
                .transpose()?
                .unwrap_or(defaults.tolerance),
            quad_max_evaluations: get("QUAD_MAX_EVALUATIONS")
                .map(|v| v.parse::<usize>().map_err(|e| EngineError::Config(format!("QUAD_MAX_EVALUATIONS: {e}"))))
                .transpose()?
                .unwrap_or(defaults.max_evaluations),
            chain,
            output_path: get("OUTPUT_PATH").map(PathBuf::from),
            output_format,
        })
    }

    /// Freeze the run inputs. `spot` and `market_price` fill in whatever the
    /// environment did not set.
    pub fn run_config(&self, spot: f64, market_price: f64) -> RunConfig {
        RunConfig {
            observation: MarketObservation {
                spot: self.spot_price.unwrap_or(spot),
                strike: self.strike,
                expiry: self.expiry,
                rate: self.risk_free_rate,
                market_price: self.market_price.unwrap_or(market_price),
            },
            grid: GridConfig {
                price_low: self.price_low,
                price_high: self.price_high,
                num_samples: self.num_samples,
            },
            quadrature: QuadratureConfig {
                tolerance: self.quad_tolerance,
                max_evaluations: self.quad_max_evaluations,
                ..QuadratureConfig::default()
            },
        }
    }
}

fn parse_f64(key: &str, value: &str) -> EngineResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| EngineError::Config(format!("{key}: {e}")))
}

/// Accepts ISO `YYYY-MM-DD` or `DD/MM/YY`.
pub fn parse_expiry(value: &str) -> EngineResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%y"))
        .map_err(|e| EngineError::Config(format!("EXPIRY: {value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 5] = [
        ("STRIKE", "520"),
        ("EXPIRY", "16/01/26"),
        ("PRICE_LOW", "200"),
        ("PRICE_HIGH", "800"),
        ("SPOT_PRICE", "231.06"),
    ];

    #[test]
    fn test_defaults_applied() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MARKET_PRICE", "31.85"));
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(cfg.expiry, NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
        assert_eq!(cfg.risk_free_rate, 0.05);
        assert_eq!(cfg.num_samples, 5);
        assert_eq!(cfg.output_format, OutputFormat::Csv);
        assert!(cfg.chain.is_none());

        let run = cfg.run_config(0.0, 0.0);
        assert_eq!(run.observation.spot, 231.06);
        assert_eq!(run.observation.market_price, 31.85);
        assert_eq!(run.grid.num_samples, 5);
    }

    #[test]
    fn test_market_price_required_without_chain() {
        let err = AppConfig::from_lookup(lookup(&BASE)).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)), "{err}");
    }

    #[test]
    fn test_chain_fills_missing_prices() {
        let pairs = [
            ("STRIKE", "520"),
            ("EXPIRY", "2026-01-16"),
            ("PRICE_LOW", "200"),
            ("PRICE_HIGH", "800"),
            ("OPTION_TICKER", "COIN"),
            ("OUTPUT_FORMAT", "JSON"),
        ];
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.chain.as_ref().unwrap().ticker, "COIN");
        assert_eq!(cfg.output_format, OutputFormat::Json);

        let run = cfg.run_config(231.06, 31.85);
        assert_eq!(run.observation.spot, 231.06);
        assert_eq!(run.observation.market_price, 31.85);
    }

    #[test]
    fn test_malformed_values_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MARKET_PRICE", "abc"));
        assert!(matches!(AppConfig::from_lookup(lookup(&pairs)), Err(EngineError::Config(_))));
        assert!(parse_expiry("2026/01/16").is_err());
    }
}
