use crate::models::market::{BreadthSnapshot, EtfQuote};
use crate::errors::{Result, AlphaMatrixError};
use crate::scrapers::base::MarketScraper;
use crate::util;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const KRX_BASE_URL: &str = "http://data.krx.co.kr";
const JSON_ENDPOINT: &str = "/comm/bldAttendant/getJsonData.cmd";

const BLD_STOCK_HISTORY: &str = "dbms/MDC/STAT/standard/MDCSTAT01701";
const BLD_ETF_LISTING: &str = "dbms/MDC/STAT/standard/MDCSTAT04601";
const BLD_ETF_PRICES: &str = "dbms/MDC/STAT/standard/MDCSTAT04301";
const BLD_MARKET_PRICES: &str = "dbms/MDC/STAT/standard/MDCSTAT01501";
const BLD_INDEX_HISTORY: &str = "dbms/MDC/STAT/standard/MDCSTAT00301";

/// KRX 정보데이터시스템 스크래퍼
pub struct KrxScraper {
    client: Client,
    base_url: String,
    reference_isin: String,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl KrxScraper {
    pub fn new(reference_isin: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
            .build()
            .map_err(AlphaMatrixError::RequestError)?;

        Ok(Self {
            client,
            base_url: KRX_BASE_URL.to_string(),
            reference_isin: reference_isin.to_string(),
            request_interval: Duration::from_millis(500),
            last_request: Mutex::new(None),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(time) = *last {
            let elapsed = time.elapsed();
            if elapsed < self.request_interval {
                let wait_time = self.request_interval - elapsed;
                debug!("Waiting {:?} to respect the KRX rate limit", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Posts a report request and decodes its row block.
    async fn fetch_report<T: DeserializeOwned>(&self, bld: &str, params: &[(&str, &str)]) -> Result<Vec<T>> {
        self.wait_for_rate_limit().await;

        let mut form: Vec<(&str, &str)> = vec![("bld", bld), ("locale", "ko_KR")];
        form.extend_from_slice(params);

        let response = self.client
            .post(format!("{}{}", self.base_url, JSON_ENDPOINT))
            .header("Referer", format!("{}/contents/MDC/MDI/mdiLoader/index.cmd", self.base_url))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AlphaMatrixError::ExchangeError(format!(
                "KRX report {} failed: HTTP status {}", bld, response.status()
            )));
        }

        let report: ReportResponse<T> = response.json().await?;
        Ok(report.rows)
    }
}

/// Report envelope; KRX puts rows under `output` or `OutBlock_1` depending on the report.
#[derive(Debug, Deserialize)]
struct ReportResponse<T> {
    #[serde(rename = "output", alias = "OutBlock_1", alias = "block1", default = "Vec::new")]
    rows: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SessionRow {
    #[serde(rename = "TRD_DD", default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(rename = "ISU_SRT_CD", default)]
    ticker: Option<String>,
    #[serde(rename = "ISU_ABBRV", default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "ISU_SRT_CD", default)]
    ticker: Option<String>,
    #[serde(rename = "ISU_ABBRV", default)]
    name: Option<String>,
    #[serde(rename = "TDD_OPNPRC", default)]
    open: Option<String>,
    #[serde(rename = "TDD_CLSPRC", default)]
    close: Option<String>,
    #[serde(rename = "ACC_TRDVOL", default)]
    volume: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexRow {
    #[serde(rename = "TRD_DD", default)]
    date: Option<String>,
    #[serde(rename = "CLSPRC_IDX", default)]
    close: Option<String>,
}

fn parse_number(raw: &Option<String>) -> Option<f64> {
    raw.as_deref().and_then(util::parse_krx_number)
}

fn parse_date(raw: &Option<String>) -> Option<i32> {
    raw.as_deref().and_then(|d| util::date_string_to_int(d).ok())
}

fn ymd(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// `1028` -> (`1`, `028`): index group and the index number within it.
fn split_index_code(code: &str) -> Option<(&str, &str)> {
    let first = code.chars().next()?;
    let (group, index) = code.split_at(first.len_utf8());
    if !first.is_ascii_digit() || index.is_empty() {
        return None;
    }
    Some((group, index))
}

#[async_trait]
impl MarketScraper for KrxScraper {
    async fn fetch_trading_days(&self, start: &NaiveDate, end: &NaiveDate) -> Result<Vec<i32>> {
        let (start, end) = (ymd(start), ymd(end));
        info!("Fetching trading calendar {} ~ {} from {}", start, end, self.reference_isin);

        let rows: Vec<SessionRow> = self.fetch_report(BLD_STOCK_HISTORY, &[
            ("isuCd", self.reference_isin.as_str()),
            ("strtDd", start.as_str()),
            ("endDd", end.as_str()),
            ("adjStkPrc", "1"),
        ]).await?;

        let mut days: Vec<i32> = rows.iter().filter_map(|row| parse_date(&row.date)).collect();
        days.sort_unstable();
        days.dedup();

        debug!("Found {} trading days", days.len());
        Ok(days)
    }

    async fn fetch_etf_names(&self, date: &NaiveDate) -> Result<HashMap<String, String>> {
        let trd_dd = ymd(date);
        let rows: Vec<ListingRow> = self.fetch_report(BLD_ETF_LISTING, &[("trdDd", trd_dd.as_str())]).await?;

        let names: HashMap<String, String> = rows.into_iter()
            .filter_map(|row| Some((row.ticker?, row.name?)))
            .collect();

        info!("Loaded {} ETF names", names.len());
        Ok(names)
    }

    async fn fetch_etf_quotes(&self, date: &NaiveDate) -> Result<Vec<EtfQuote>> {
        let trd_dd = ymd(date);
        let rows: Vec<PriceRow> = self.fetch_report(BLD_ETF_PRICES, &[
            ("trdDd", trd_dd.as_str()),
            ("share", "1"),
            ("money", "1"),
        ]).await?;

        let quotes: Vec<EtfQuote> = rows.into_iter()
            .filter_map(|row| {
                let close = parse_number(&row.close)? as i64;
                let volume = parse_number(&row.volume).unwrap_or_default() as i64;
                let ticker = row.ticker?;
                let name = row.name.unwrap_or_else(|| ticker.clone());
                Some(EtfQuote { ticker, name, close, volume })
            })
            .collect();

        debug!("{}: {} ETF quotes", trd_dd, quotes.len());
        Ok(quotes)
    }

    async fn fetch_market_breadth(&self, date: &NaiveDate) -> Result<BreadthSnapshot> {
        let trd_dd = ymd(date);
        let rows: Vec<PriceRow> = self.fetch_report(BLD_MARKET_PRICES, &[
            ("mktId", "STK"),
            ("trdDd", trd_dd.as_str()),
            ("share", "1"),
            ("money", "1"),
        ]).await?;

        if rows.is_empty() {
            return Err(AlphaMatrixError::ExchangeError(format!("No KOSPI prices for {}", trd_dd)));
        }

        let mut snapshot = BreadthSnapshot { advancers: 0, decliners: 0 };
        for row in &rows {
            if let (Some(open), Some(close)) = (parse_number(&row.open), parse_number(&row.close)) {
                if close > open {
                    snapshot.advancers += 1;
                } else if close < open {
                    snapshot.decliners += 1;
                }
            }
        }

        Ok(snapshot)
    }

    async fn fetch_index_closes(&self, start: &NaiveDate, end: &NaiveDate, code: &str) -> Result<Vec<(i32, f64)>> {
        let (group, index) = split_index_code(code)
            .ok_or_else(|| AlphaMatrixError::DataError(format!("Invalid index code: {}", code)))?;
        let (start, end) = (ymd(start), ymd(end));

        let rows: Vec<IndexRow> = self.fetch_report(BLD_INDEX_HISTORY, &[
            ("indIdx", group),
            ("indIdx2", index),
            ("strtDd", start.as_str()),
            ("endDd", end.as_str()),
        ]).await?;

        let mut closes: Vec<(i32, f64)> = rows.iter()
            .filter_map(|row| Some((parse_date(&row.date)?, parse_number(&row.close)?)))
            .collect();
        closes.sort_by_key(|(date, _)| *date);

        info!("Index {}: {} closes", code, closes.len());
        Ok(closes)
    }
}
