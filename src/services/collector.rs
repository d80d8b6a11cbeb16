use crate::config::Config;
use crate::errors::{Result, AlphaMatrixError};
use crate::models::market::{BreadthSnapshot, DailyBar, MacroSeries, MarketDataset, PriceTable};
use crate::scrapers::base::{MacroScraper, MarketScraper};
use crate::storage::DataStore;
use crate::util;
use chrono::{Duration, NaiveDate};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Collects the ETF price table, market breadth and macro closes for the
/// recent trading window and persists them as CSV_A / CSV_E / CSV_C.
pub struct CollectorService {
    config: Config,
    market: Arc<dyn MarketScraper + Send + Sync>,
    macro_source: Arc<dyn MacroScraper + Send + Sync>,
    store: DataStore,
}

impl CollectorService {
    pub fn new(
        config: Config,
        market: Arc<dyn MarketScraper + Send + Sync>,
        macro_source: Arc<dyn MacroScraper + Send + Sync>,
    ) -> Self {
        let store = DataStore::new(&config.data_dir);
        Self {
            config,
            market,
            macro_source,
            store,
        }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// The last `trading_days` sessions within the lookback window ending `today`.
    pub async fn trading_calendar(&self, today: &NaiveDate) -> Result<Vec<i32>> {
        let start = *today - Duration::days(self.config.lookback_days);
        let mut days = self.market.fetch_trading_days(&start, today).await?;

        if days.is_empty() {
            return Err(AlphaMatrixError::DataError(format!(
                "No trading days between {} and {}", start, today
            )));
        }

        if days.len() > self.config.trading_days {
            days.drain(..days.len() - self.config.trading_days);
        }
        Ok(days)
    }

    pub async fn collect(&self, today: &NaiveDate) -> Result<MarketDataset> {
        let days = self.trading_calendar(today).await?;
        let first_day = util::int_to_naive_date(days[0])?;
        let last_day = util::int_to_naive_date(days[days.len() - 1])?;
        info!("Collection window: {} ~ {} ({} sessions)", first_day, last_day, days.len());

        // 이름표는 마지막 거래일 기준으로 한 번만
        let names = match self.market.fetch_etf_names(&last_day).await {
            Ok(names) => names,
            Err(e) => {
                warn!("ETF names unavailable, falling back to quote names: {}", e);
                HashMap::new()
            }
        };

        let mut prices = PriceTable::new(days.clone());
        let mut adr = Vec::with_capacity(days.len());

        for day in &days {
            let date = util::int_to_naive_date(*day)?;

            match self.market.fetch_etf_quotes(&date).await {
                Ok(quotes) => {
                    for quote in quotes {
                        let name = names.get(&quote.ticker).unwrap_or(&quote.name).clone();
                        prices.record(&quote.ticker, &name, DailyBar {
                            date: *day,
                            close: quote.close,
                            volume: quote.volume,
                        });
                    }
                }
                Err(e) => {
                    // 시세 없는 날은 달력에서 제외
                    warn!("Skipping ETF prices for {}: {}", date, e);
                    prices.dates.retain(|d| d != day);
                }
            }

            let ratio = match self.market.fetch_market_breadth(&date).await {
                Ok(breadth) => breadth.adr(),
                Err(e) => {
                    warn!("Breadth unavailable for {}, using neutral ADR: {}", date, e);
                    BreadthSnapshot::NEUTRAL_ADR
                }
            };
            adr.push((*day, ratio));

            tokio::time::sleep(self.config.request_interval).await;
        }

        if self.config.debug_mode {
            let original_count = prices.rows.len();
            prices.rows.truncate(self.config.debug_etf_limit);
            info!("DEBUG MODE: keeping {} out of {} ETFs", prices.rows.len(), original_count);
        }

        let macro_series = self.collect_macro(&first_day, today).await;

        info!("Collected {} ETFs, {} ADR points, {} macro series",
              prices.rows.len(), adr.len(), macro_series.len());

        Ok(MarketDataset { prices, adr, macro_series })
    }

    async fn collect_macro(&self, start: &NaiveDate, end: &NaiveDate) -> Vec<MacroSeries> {
        let mut result = Vec::new();
        for symbol in &self.config.macro_symbols {
            match self.macro_source.fetch_closes(symbol, start, end).await {
                Ok(series) if !series.closes.is_empty() => result.push(series),
                Ok(_) => warn!("{} returned no closes for {}", self.macro_source.source_name(), symbol),
                Err(e) => warn!("Macro series {} failed: {}", symbol, e),
            }
        }
        result
    }

    /// Writes the dataset to the local data pack.
    pub fn save(&self, dataset: &MarketDataset) -> Result<()> {
        self.store.save_price_table(&dataset.prices)?;
        self.store.save_adr(&dataset.adr)?;

        if dataset.macro_series.is_empty() {
            warn!("No macro data collected, CSV_C left untouched");
        } else {
            self.store.save_macro(&dataset.macro_series)?;
        }
        Ok(())
    }

    pub async fn run(&self, today: &NaiveDate) -> Result<MarketDataset> {
        let dataset = self.collect(today).await?;
        self.save(&dataset)?;
        info!("Data pack written to {}", self.store.dir().display());
        Ok(dataset)
    }
}
