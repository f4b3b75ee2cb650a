use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

/// Strike match tolerance when selecting a contract.
const STRIKE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Right {
    Call,
    Put,
}

/// One listed contract, calls and puts flattened across expirations.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OptionQuote {
    pub symbol: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub right: Right,
    pub ask: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct OptionChain {
    pub underlying: String,
    pub underlying_price: Option<f64>,
    pub quotes: Vec<OptionQuote>,
}

impl OptionChain {
    /// Call contract at `strike` expiring on `expiry`, if listed.
    pub fn find_call(&self, strike: f64, expiry: NaiveDate) -> Option<&OptionQuote> {
        self.quotes
            .iter()
            .find(|q| q.right == Right::Call && q.expiry == expiry && (q.strike - strike).abs() < STRIKE_EPS)
    }

    /// Distinct expirations present in the chain, ascending.
    pub fn expirations(&self) -> Vec<NaiveDate> {
        let mut out: Vec<NaiveDate> = self.quotes.iter().map(|q| q.expiry).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Options-chain REST client. All methods return Result, never panic.
#[derive(Clone)]
pub struct ChainClient {
    client: Client,
    base_url: String,
}

impl ChainClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent("call_ev/0.1")
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the chain for `ticker`, then each listed expiration in turn.
    pub async fn fetch(&self, ticker: &str) -> EngineResult<OptionChain> {
        let first = self.get_page(ticker, None).await?;
        let mut chain = parse_page(&first)?;

        let listed = first
            .option_chain
            .result
            .first()
            .map(|r| r.expiration_dates.clone())
            .unwrap_or_default();
        let fetched: Vec<NaiveDate> = chain.expirations();

        for ts in listed {
            let Some(date) = timestamp_date(ts) else { continue };
            if fetched.contains(&date) {
                continue;
            }
            let page = self.get_page(ticker, Some(ts)).await?;
            chain.quotes.extend(parse_page(&page)?.quotes);
        }

        tracing::info!(ticker, quotes = chain.quotes.len(), "options chain fetched");
        Ok(chain)
    }

    async fn get_page(&self, ticker: &str, date: Option<i64>) -> EngineResult<ChainResponse> {
        let query = date.map(|d| format!("?date={d}")).unwrap_or_default();
        let url = format!("{}/{ticker}{query}", self.base_url);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::ChainApi {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str::<ChainResponse>(&body).map_err(|e| EngineError::Parse(format!("GET {url}: {e}")))
    }
}

// Response envelope (Yahoo v7 options):
// {
//   "optionChain": {
//     "result": [{
//       "underlyingSymbol": "COIN",
//       "expirationDates": [1768521600, ...],
//       "quote": { "regularMarketPrice": 231.06 },
//       "options": [{ "expirationDate": 1768521600, "calls": [...], "puts": [...] }]
//     }],
//     "error": null
//   }
// }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainResponse {
    option_chain: ChainEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChainEnvelope {
    #[serde(default)]
    result: Vec<ChainResult>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainResult {
    underlying_symbol: Option<String>,
    #[serde(default)]
    expiration_dates: Vec<i64>,
    quote: Option<UnderlyingQuote>,
    #[serde(default)]
    options: Vec<ExpirySlice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnderlyingQuote {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpirySlice {
    expiration_date: i64,
    #[serde(default)]
    calls: Vec<ContractData>,
    #[serde(default)]
    puts: Vec<ContractData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractData {
    contract_symbol: String,
    strike: f64,
    ask: Option<f64>,
    expiration: Option<i64>,
}

fn parse_page(resp: &ChainResponse) -> EngineResult<OptionChain> {
    if let Some(err) = resp.option_chain.error.as_ref().filter(|e| !e.is_null()) {
        return Err(EngineError::Parse(format!("options chain error: {err}")));
    }
    let result = resp
        .option_chain
        .result
        .first()
        .ok_or_else(|| EngineError::Parse("options chain has no result".into()))?;

    let mut quotes = Vec::new();
    for slice in &result.options {
        let contracts = slice
            .calls
            .iter()
            .map(|c| (c, Right::Call))
            .chain(slice.puts.iter().map(|p| (p, Right::Put)));
        for (contract, right) in contracts {
            let ts = contract.expiration.unwrap_or(slice.expiration_date);
            let expiry = timestamp_date(ts)
                .ok_or_else(|| EngineError::Parse(format!("{}: bad expiration {ts}", contract.contract_symbol)))?;
            quotes.push(OptionQuote {
                symbol: contract.contract_symbol.clone(),
                expiry,
                strike: contract.strike,
                right,
                ask: contract.ask.filter(|a| a.is_finite() && *a > 0.0),
            });
        }
    }

    Ok(OptionChain {
        underlying: result.underlying_symbol.clone().unwrap_or_default(),
        underlying_price: result.quote.as_ref().and_then(|q| q.regular_market_price),
        quotes,
    })
}

fn timestamp_date(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}
