//! In-memory scrapers for service tests.

use crate::errors::{Result, AlphaMatrixError};
use crate::models::market::{BreadthSnapshot, EtfQuote, MacroSeries};
use crate::scrapers::base::{MacroScraper, MarketScraper};
use crate::util;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub(crate) struct FakeMarket {
    days: Vec<i32>,
    names: HashMap<String, String>,
    quotes: HashMap<i32, Vec<EtfQuote>>,
    failing_quotes: HashSet<i32>,
    breadth: HashMap<i32, BreadthSnapshot>,
    index: Vec<(i32, f64)>,
}

impl FakeMarket {
    pub(crate) fn new(days: Vec<i32>) -> Self {
        Self { days, ..Default::default() }
    }

    pub(crate) fn with_name(mut self, ticker: &str, name: &str) -> Self {
        self.names.insert(ticker.to_string(), name.to_string());
        self
    }

    pub(crate) fn with_quote(mut self, day: i32, ticker: &str, name: &str, close: i64, volume: i64) -> Self {
        self.quotes.entry(day).or_default().push(EtfQuote {
            ticker: ticker.to_string(),
            name: name.to_string(),
            close,
            volume,
        });
        self
    }

    pub(crate) fn with_failing_quotes(mut self, day: i32) -> Self {
        self.failing_quotes.insert(day);
        self
    }

    pub(crate) fn with_breadth(mut self, day: i32, advancers: usize, decliners: usize) -> Self {
        self.breadth.insert(day, BreadthSnapshot { advancers, decliners });
        self
    }

    pub(crate) fn with_index(mut self, closes: Vec<(i32, f64)>) -> Self {
        self.index = closes;
        self
    }
}

#[async_trait]
impl MarketScraper for FakeMarket {
    async fn fetch_trading_days(&self, start: &NaiveDate, end: &NaiveDate) -> Result<Vec<i32>> {
        let (start, end) = (util::naive_date_to_int(start), util::naive_date_to_int(end));
        Ok(self.days.iter().copied().filter(|d| *d >= start && *d <= end).collect())
    }

    async fn fetch_etf_names(&self, _date: &NaiveDate) -> Result<HashMap<String, String>> {
        Ok(self.names.clone())
    }

    async fn fetch_etf_quotes(&self, date: &NaiveDate) -> Result<Vec<EtfQuote>> {
        let day = util::naive_date_to_int(date);
        if self.failing_quotes.contains(&day) {
            return Err(AlphaMatrixError::ExchangeError(format!("quotes down on {}", day)));
        }
        Ok(self.quotes.get(&day).cloned().unwrap_or_default())
    }

    async fn fetch_market_breadth(&self, date: &NaiveDate) -> Result<BreadthSnapshot> {
        let day = util::naive_date_to_int(date);
        self.breadth.get(&day)
            .copied()
            .ok_or_else(|| AlphaMatrixError::ExchangeError(format!("no breadth on {}", day)))
    }

    async fn fetch_index_closes(&self, _start: &NaiveDate, _end: &NaiveDate, _code: &str) -> Result<Vec<(i32, f64)>> {
        Ok(self.index.clone())
    }
}

#[derive(Default)]
pub(crate) struct FakeMacro {
    series: HashMap<String, Vec<(i32, f64)>>,
}

impl FakeMacro {
    pub(crate) fn with_series(mut self, symbol: &str, closes: Vec<(i32, f64)>) -> Self {
        self.series.insert(symbol.to_string(), closes);
        self
    }
}

#[async_trait]
impl MacroScraper for FakeMacro {
    fn source_name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_closes(&self, symbol: &str, _start: &NaiveDate, _end: &NaiveDate) -> Result<MacroSeries> {
        self.series.get(symbol)
            .map(|closes| MacroSeries { symbol: symbol.to_string(), closes: closes.clone() })
            .ok_or_else(|| AlphaMatrixError::DataError(format!("unknown symbol {}", symbol)))
    }
}
