use crate::models::market::MacroSeries;
use crate::errors::{Result, AlphaMatrixError};
use crate::scrapers::base::MacroScraper;
use crate::util;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance chart API, used for the global indicators (Nasdaq, USD/KRW, SOX)
pub struct YahooScraper {
    client: Client,
    base_url: String,
}

impl YahooScraper {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
            .build()
            .map_err(AlphaMatrixError::RequestError)?;

        Ok(Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

fn encode_symbol(symbol: &str) -> String {
    symbol.replace('^', "%5E").replace('=', "%3D")
}

fn parse_chart(symbol: &str, json: &Value) -> Result<MacroSeries> {
    let result = json.pointer("/chart/result/0").ok_or_else(|| {
        let reason = json.pointer("/chart/error/description")
            .and_then(|d| d.as_str())
            .unwrap_or("empty chart result");
        AlphaMatrixError::DataError(format!("{}: {}", symbol, reason))
    })?;

    let offset = result.pointer("/meta/gmtoffset").and_then(|v| v.as_i64()).unwrap_or_default();
    let timestamps = result.get("timestamp").and_then(|t| t.as_array()).cloned().unwrap_or_default();
    let closes = result.pointer("/indicators/quote/0/close")
        .and_then(|c| c.as_array())
        .cloned()
        .unwrap_or_default();

    let mut series = MacroSeries { symbol: symbol.to_string(), closes: Vec::new() };
    for (ts, close) in timestamps.iter().zip(closes.iter()) {
        // 휴장일 등은 null
        let (Some(ts), Some(close)) = (ts.as_i64(), close.as_f64()) else { continue };
        let Some(local) = DateTime::from_timestamp(ts + offset, 0) else { continue };
        let date = util::naive_date_to_int(&local.date_naive());

        match series.closes.last_mut() {
            Some(last) if last.0 == date => last.1 = close,
            _ => series.closes.push((date, close)),
        }
    }

    Ok(series)
}

#[async_trait]
impl MacroScraper for YahooScraper {
    fn source_name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_closes(&self, symbol: &str, start: &NaiveDate, end: &NaiveDate) -> Result<MacroSeries> {
        let period1 = start.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp()).unwrap_or_default();
        // end 당일 포함
        let period2 = end.succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc().timestamp())
            .unwrap_or_default();

        info!("Fetching {} closes from {}", symbol, start);
        let response = self.client
            .get(format!("{}/v8/finance/chart/{}", self.base_url, encode_symbol(symbol)))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?;

        let json: Value = response.json().await?;
        let series = parse_chart(symbol, &json)?;

        debug!("{}: {} closes", symbol, series.closes.len());
        Ok(series)
    }
}
