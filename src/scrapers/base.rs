use crate::models::market::{BreadthSnapshot, EtfQuote, MacroSeries};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Korean exchange data needed by the collector and the analyzer
#[async_trait]
pub trait MarketScraper {
    /// Sessions in `[start, end]` on which the reference stock traded, ascending
    async fn fetch_trading_days(&self, start: &NaiveDate, end: &NaiveDate) -> Result<Vec<i32>>;

    /// Ticker to short name for every ETF listed on `date`
    async fn fetch_etf_names(&self, date: &NaiveDate) -> Result<HashMap<String, String>>;

    /// Close and volume of every ETF on `date`
    async fn fetch_etf_quotes(&self, date: &NaiveDate) -> Result<Vec<EtfQuote>>;

    /// KOSPI advancers and decliners on `date`
    async fn fetch_market_breadth(&self, date: &NaiveDate) -> Result<BreadthSnapshot>;

    /// Daily closes of an index (e.g. `1028` for KOSPI 200), ascending
    async fn fetch_index_closes(&self, start: &NaiveDate, end: &NaiveDate, code: &str) -> Result<Vec<(i32, f64)>>;
}

/// Global macro indicators (indices, FX)
#[async_trait]
pub trait MacroScraper {
    fn source_name(&self) -> &'static str;

    async fn fetch_closes(&self, symbol: &str, start: &NaiveDate, end: &NaiveDate) -> Result<MacroSeries>;
}
