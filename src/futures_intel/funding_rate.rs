// =============================================================================
// Funding Rate Monitor — perpetual futures funding as a crowding signal
// =============================================================================
//
// Funding rates are periodic payments between longs and shorts that anchor the
// perpetual contract price to spot. A strongly positive rate means longs are
// paying (crowded long); strongly negative means shorts are paying.
//
// Bias bands (rate in percent):
//   rate > +0.05%  =>  BEARISH  extreme, overleveraged longs
//   rate > +0.03%  =>  BEARISH  elevated
//   rate < -0.05%  =>  BULLISH  extreme, short squeeze setup
//   rate < -0.03%  =>  BULLISH  elevated
//   otherwise      =>  NEUTRAL

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::binance::client::parse_str_f64;

/// Latest premium-index snapshot for one perpetual symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingSnapshot {
    pub symbol: String,
    pub mark_price: f64,
    /// Raw funding rate as a decimal (e.g. 0.0001 = 0.01%).
    pub last_funding_rate: f64,
    /// Timestamp (ms) of the next funding event.
    pub next_funding_time: i64,
    /// Exchange server time (ms) of the snapshot.
    pub time: i64,
    /// Directional bias label: BULLISH / BEARISH / NEUTRAL.
    pub bias: String,
    pub interpretation: String,
}

impl FundingSnapshot {
    /// Funding rate in percent, the unit the classifier thresholds use.
    pub fn rate_pct(&self) -> f64 {
        self.last_funding_rate * 100.0
    }
}

fn interpret(rate_pct: f64) -> (&'static str, &'static str) {
    if rate_pct > 0.05 {
        ("BEARISH", "Extreme positive funding - overleveraged longs")
    } else if rate_pct > 0.03 {
        ("BEARISH", "Elevated positive funding - moderate long crowding")
    } else if rate_pct < -0.05 {
        ("BULLISH", "Extreme negative funding - short squeeze likely")
    } else if rate_pct < -0.03 {
        ("BULLISH", "Elevated negative funding - shorts paying")
    } else {
        ("NEUTRAL", "Funding within normal range")
    }
}

/// Parse a `GET /fapi/v1/premiumIndex?symbol=..` response body.
pub fn parse_premium_index(body: &serde_json::Value) -> Result<FundingSnapshot> {
    let symbol = body["symbol"]
        .as_str()
        .context("premiumIndex response missing symbol")?
        .to_string();
    let mark_price = parse_str_f64(&body["markPrice"]).context("premiumIndex markPrice")?;
    let last_funding_rate =
        parse_str_f64(&body["lastFundingRate"]).context("premiumIndex lastFundingRate")?;
    let next_funding_time = body["nextFundingTime"].as_i64().unwrap_or(0);
    let time = body["time"].as_i64().unwrap_or(0);

    let (bias, interpretation) = interpret(last_funding_rate * 100.0);

    Ok(FundingSnapshot {
        symbol,
        mark_price,
        last_funding_rate,
        next_funding_time,
        time,
        bias: bias.to_string(),
        interpretation: interpretation.to_string(),
    })
}

/// Fetches funding data from the Binance USDⓈ-M futures API.
#[derive(Debug, Clone)]
pub struct FundingRateMonitor {
    base_url: String,
    client: reqwest::Client,
}

impl FundingRateMonitor {
    /// Create a monitor against `base_url` (e.g. `https://fapi.binance.com`)
    /// that re-uses an existing HTTP client.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Fetch the latest premium index for `symbol` (e.g. `BTCUSDT`).
    #[instrument(skip(self), name = "binance::premium_index")]
    pub async fn fetch(&self, symbol: &str) -> Result<FundingSnapshot> {
        let url = format!("{}/fapi/v1/premiumIndex", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .with_context(|| format!("GET premium index for {symbol}"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse premium index response body")?;

        if !status.is_success() {
            anyhow::bail!("premium index API returned {}: {}", status, body);
        }

        let snapshot = parse_premium_index(&body)?;

        debug!(
            symbol,
            rate_pct = format!("{:.4}", snapshot.rate_pct()),
            bias = %snapshot.bias,
            "funding rate fetched"
        );

        Ok(snapshot)
    }
}
