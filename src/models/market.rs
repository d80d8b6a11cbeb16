use serde::Serialize;

/// One session of an ETF: close price and traded volume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBar {
    pub date: i32,
    pub close: i64,
    pub volume: i64,
}

/// ETF with its daily bars in ascending date order
#[derive(Debug, Clone, Serialize)]
pub struct EtfSeries {
    pub ticker: String,
    pub name: String,
    pub daily: Vec<DailyBar>,
}

impl EtfSeries {
    pub fn new(ticker: &str, name: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
            daily: Vec::new(),
        }
    }

    pub fn bar_on(&self, date: i32) -> Option<&DailyBar> {
        self.daily.iter().find(|b| b.date == date)
    }
}

/// The wide price/volume table persisted as CSV_A.
///
/// `dates` is the full trading calendar; a row may lack bars for sessions
/// before it was listed.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    pub dates: Vec<i32>,
    pub rows: Vec<EtfSeries>,
}

impl PriceTable {
    pub fn new(dates: Vec<i32>) -> Self {
        Self { dates, rows: Vec::new() }
    }

    /// Inserts a bar, creating the row on first sight of the ticker.
    pub fn record(&mut self, ticker: &str, name: &str, bar: DailyBar) {
        let idx = match self.rows.iter().position(|r| r.ticker == ticker) {
            Some(idx) => idx,
            None => {
                self.rows.push(EtfSeries::new(ticker, name));
                self.rows.len() - 1
            }
        };

        let row = &mut self.rows[idx];
        match row.daily.iter_mut().find(|b| b.date == bar.date) {
            Some(existing) => *existing = bar,
            None => {
                row.daily.push(bar);
                row.daily.sort_by_key(|b| b.date);
            }
        }
    }

    /// Closes and volumes over the whole calendar, or `None` when a session is missing.
    pub fn complete_window(&self, row: &EtfSeries) -> Option<(Vec<f64>, Vec<f64>)> {
        let mut closes = Vec::with_capacity(self.dates.len());
        let mut volumes = Vec::with_capacity(self.dates.len());
        for date in &self.dates {
            let bar = row.bar_on(*date)?;
            closes.push(bar.close as f64);
            volumes.push(bar.volume as f64);
        }
        Some((closes, volumes))
    }
}

/// Single-day snapshot of an ETF from the exchange listing
#[derive(Debug, Clone)]
pub struct EtfQuote {
    pub ticker: String,
    pub name: String,
    pub close: i64,
    pub volume: i64,
}

/// Count of KOSPI issues that closed above and below their open
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreadthSnapshot {
    pub advancers: usize,
    pub decliners: usize,
}

impl BreadthSnapshot {
    pub const NEUTRAL_ADR: f64 = 100.0;

    /// Advance/decline ratio in percent, rounded to 2 decimals.
    pub fn adr(&self) -> f64 {
        if self.decliners == 0 {
            return Self::NEUTRAL_ADR;
        }
        let ratio = self.advancers as f64 / self.decliners as f64 * 100.0;
        (ratio * 100.0).round() / 100.0
    }
}

/// Daily closes of a global macro indicator
#[derive(Debug, Clone, Serialize)]
pub struct MacroSeries {
    pub symbol: String,
    pub closes: Vec<(i32, f64)>,
}

impl MacroSeries {
    pub fn latest(&self) -> Option<(i32, f64)> {
        self.closes.iter().copied().max_by_key(|(date, _)| *date)
    }
}

/// Everything one collector run produces
#[derive(Debug, Clone, Default)]
pub struct MarketDataset {
    pub prices: PriceTable,
    pub adr: Vec<(i32, f64)>,
    pub macro_series: Vec<MacroSeries>,
}
