use crate::analysis::{self, WindowReturns};
use crate::config::Config;
use crate::errors::{Result, AlphaMatrixError};
use crate::models::analysis::{AnalysisRecord, InsightRecord};
use crate::models::market::MacroSeries;
use crate::scrapers::base::MarketScraper;
use crate::storage::{files, DataStore};
use crate::util;
use chrono::{Duration, NaiveDate};
use log::{info, warn};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Sessions of context kept in `sentiment_json`.
const SENTIMENT_SESSIONS: usize = 5;

/// Scores CSV_A against the benchmark and writes CSV_A_Analysis and Final_Insight.
pub struct AnalyzerService {
    config: Config,
    market: Arc<dyn MarketScraper + Send + Sync>,
    store: DataStore,
}

impl AnalyzerService {
    pub fn new(config: Config, market: Arc<dyn MarketScraper + Send + Sync>) -> Self {
        let store = DataStore::new(&config.data_dir);
        Self { config, market, store }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub async fn benchmark_returns(&self, today: &NaiveDate) -> Result<WindowReturns> {
        let start = *today - Duration::days(self.config.lookback_days);
        let closes = self.market
            .fetch_index_closes(&start, today, &self.config.benchmark_index)
            .await?;

        let values: Vec<f64> = closes.iter().map(|(_, c)| *c).collect();
        let returns = WindowReturns::from_closes(&values).ok_or_else(|| AlphaMatrixError::DataError(format!(
            "Benchmark {} has only {} closes", self.config.benchmark_index, values.len()
        )))?;

        info!("Benchmark {}: 1M {:.2}%, 1W {:.2}%",
              self.config.benchmark_index, returns.one_month, returns.one_week);
        Ok(returns)
    }

    pub async fn run(&self, today: &NaiveDate) -> Result<Vec<AnalysisRecord>> {
        info!("Starting S/A/B/F analysis of {}", files::PRICES);

        if !self.store.exists(files::PRICES) {
            return Err(AlphaMatrixError::DataError(format!(
                "{} not found in {}, run the collector first", files::PRICES, self.store.dir().display()
            )));
        }
        let table = self.store.load_price_table()?;
        let benchmark = self.benchmark_returns(today).await?;

        let records = analysis::analyze_table(&table, &benchmark);
        self.store.save_analysis(&records)?;

        let (macro_json, sentiment_json) = self.market_context();
        let insight: Vec<InsightRecord> = records.iter()
            .map(|r| InsightRecord::from_analysis(r, &macro_json, &sentiment_json))
            .collect();
        self.store.save_insight(&insight)?;

        info!("Analysis complete: {} of {} ETFs graded", records.len(), table.rows.len());
        Ok(records)
    }

    /// Macro and sentiment context serialized for the insight pack.
    pub fn market_context(&self) -> (String, String) {
        let macro_series = if self.store.exists(files::MACRO) {
            self.store.load_macro().unwrap_or_else(|e| {
                warn!("Ignoring unreadable {}: {}", files::MACRO, e);
                Vec::new()
            })
        } else {
            Vec::new()
        };

        let adr = if self.store.exists(files::SENTIMENT) {
            self.store.load_adr().unwrap_or_else(|e| {
                warn!("Ignoring unreadable {}: {}", files::SENTIMENT, e);
                Vec::new()
            })
        } else {
            Vec::new()
        };

        (macro_summary(&macro_series).to_string(), sentiment_summary(&adr).to_string())
    }
}

/// Latest close and change over the last five sessions per symbol.
pub fn macro_summary(series: &[MacroSeries]) -> Value {
    let mut out = Map::new();
    for s in series {
        let Some((date, close)) = s.latest() else { continue };
        let mut closes = s.closes.clone();
        closes.sort_by_key(|(d, _)| *d);

        let change = (closes.len() >= 6)
            .then(|| closes[closes.len() - 6].1)
            .filter(|base| *base > 0.0)
            .map(|base| util::round_to((close / base - 1.0) * 100.0, 2));

        out.insert(s.symbol.clone(), json!({
            "date": util::date_key(date),
            "close": util::round_to(close, 2),
            "change_5d_pct": change,
        }));
    }
    Value::Object(out)
}

/// Recent market ADR values with their average.
pub fn sentiment_summary(adr: &[(i32, f64)]) -> Value {
    let recent = &adr[adr.len().saturating_sub(SENTIMENT_SESSIONS)..];
    if recent.is_empty() {
        return json!({});
    }

    let mut points = Map::new();
    for (date, value) in recent {
        points.insert(util::date_key(*date), json!(value));
    }
    let average = recent.iter().map(|(_, v)| v).sum::<f64>() / recent.len() as f64;

    json!({
        "Market_ADR": {
            "latest": recent[recent.len() - 1].1,
            "average": util::round_to(average, 2),
            "recent": points,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::Grade;
    use crate::models::market::{DailyBar, PriceTable};
    use crate::services::testing::FakeMarket;
    use crate::storage::csv_store::tests::scratch_dir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn flat_index() -> Vec<(i32, f64)> {
        (0..7).map(|i| (20240102 + i, 350.0)).collect()
    }

    fn seeded_service(name: &str, index: Vec<(i32, f64)>) -> AnalyzerService {
        let dir = scratch_dir(name);
        let config = Config::new().with_data_dir(dir.to_str().unwrap());
        let service = AnalyzerService::new(config, Arc::new(FakeMarket::new(vec![]).with_index(index)));

        let dates: Vec<i32> = (0..7).map(|i| 20240102 + i).collect();
        let mut table = PriceTable::new(dates.clone());
        let rising = [100, 101, 102, 103, 104, 105, 110];
        for (i, date) in dates.iter().enumerate() {
            table.record("069500", "KODEX 200", DailyBar { date: *date, close: rising[i], volume: 100 });
        }
        service.store().save_price_table(&table).unwrap();
        service
    }

    #[tokio::test]
    async fn writes_analysis_and_insight() {
        let service = seeded_service("analyze", flat_index());
        service.store().save_adr(&[(20240105, 80.0), (20240108, 120.0)]).unwrap();

        let records = service.run(&today()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].grade(), Some(Grade::S));
        assert_eq!(records[0].alpha_1m, 10.0);

        assert_eq!(service.store().load_analysis().unwrap(), records);

        let insight = service.store().load_insight().unwrap();
        let sentiment: Value = serde_json::from_str(&insight[0].sentiment_json).unwrap();
        assert_eq!(sentiment["Market_ADR"]["average"], json!(100.0));
        assert_eq!(insight[0].macro_json, "{}");
    }

    #[tokio::test]
    async fn short_benchmark_is_an_error() {
        let service = seeded_service("analyze_short", vec![(20240102, 350.0)]);
        assert!(service.run(&today()).await.is_err());
    }

    #[tokio::test]
    async fn missing_prices_is_an_error() {
        let config = Config::new().with_data_dir(scratch_dir("analyze_missing").to_str().unwrap());
        let service = AnalyzerService::new(config, Arc::new(FakeMarket::new(vec![]).with_index(flat_index())));
        let err = service.run(&today()).await.unwrap_err();
        assert!(err.to_string().contains("CSV_A.csv"));
    }

    #[test]
    fn macro_summary_reports_latest_and_change() {
        let series = vec![MacroSeries {
            symbol: "KRW=X".to_string(),
            closes: (0..6).map(|i| (20240102 + i, 1300.0 + i as f64 * 2.6)).collect(),
        }];
        let summary = macro_summary(&series);
        assert_eq!(summary["KRW=X"]["date"], json!("2024-01-07"));
        assert_eq!(summary["KRW=X"]["close"], json!(1313.0));
        assert_eq!(summary["KRW=X"]["change_5d_pct"], json!(1.0));
    }

    #[test]
    fn sentiment_summary_keeps_last_five() {
        let adr: Vec<(i32, f64)> = (0..8).map(|i| (20240102 + i, 100.0 + i as f64)).collect();
        let summary = sentiment_summary(&adr);
        assert_eq!(summary["Market_ADR"]["recent"].as_object().unwrap().len(), 5);
        assert_eq!(summary["Market_ADR"]["latest"], json!(107.0));
        assert_eq!(summary["Market_ADR"]["average"], json!(105.0));
        assert_eq!(sentiment_summary(&[]), json!({}));
    }
}
