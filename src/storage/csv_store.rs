use crate::errors::{Result, AlphaMatrixError};
use crate::models::analysis::{AnalysisRecord, InsightRecord};
use crate::models::market::{DailyBar, EtfSeries, MacroSeries, PriceTable};
use crate::models::portfolio::Portfolio;
use crate::storage::files;
use crate::util;
use log::info;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const PRICE_SUFFIX: &str = "_P";
const VOLUME_SUFFIX: &str = "_V";
const ADR_METRIC: &str = "Market_ADR";

/// Local directory holding the CSV data pack.
///
/// Files are written as UTF-8 with a BOM so spreadsheet tools pick the
/// right encoding for the Korean names.
pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn exists(&self, file: &str) -> bool {
        self.path(file).exists()
    }

    fn writer(&self, file: &str) -> Result<csv::Writer<File>> {
        fs::create_dir_all(&self.dir)?;
        let mut handle = File::create(self.path(file))?;
        handle.write_all(BOM)?;
        Ok(csv::Writer::from_writer(handle))
    }

    fn reader(&self, file: &str) -> Result<csv::Reader<Cursor<Vec<u8>>>> {
        let path = self.path(file);
        if !path.exists() {
            return Err(AlphaMatrixError::DataError(format!("{} not found", path.display())));
        }
        let text = fs::read_to_string(&path)?;
        let body = util::strip_bom(&text).as_bytes().to_vec();
        Ok(csv::ReaderBuilder::new().flexible(true).from_reader(Cursor::new(body)))
    }

    /// Writes CSV_A: `ticker,name` then a price and a volume column per session.
    pub fn save_price_table(&self, table: &PriceTable) -> Result<()> {
        let mut writer = self.writer(files::PRICES)?;

        let mut header = vec!["ticker".to_string(), "name".to_string()];
        for date in &table.dates {
            let key = util::date_key(*date);
            header.push(format!("{}{}", key, PRICE_SUFFIX));
            header.push(format!("{}{}", key, VOLUME_SUFFIX));
        }
        writer.write_record(&header)?;

        for row in &table.rows {
            let mut record = vec![row.ticker.clone(), row.name.clone()];
            for date in &table.dates {
                match row.bar_on(*date) {
                    Some(bar) => {
                        record.push(bar.close.to_string());
                        record.push(bar.volume.to_string());
                    }
                    None => {
                        record.push(String::new());
                        record.push(String::new());
                    }
                }
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!("Saved {} ETFs x {} sessions to {}", table.rows.len(), table.dates.len(), files::PRICES);
        Ok(())
    }

    pub fn load_price_table(&self) -> Result<PriceTable> {
        let mut reader = self.reader(files::PRICES)?;
        let headers = reader.headers()?.clone();

        let ticker_col = column(&headers, "ticker")?;
        let name_col = column(&headers, "name").ok();

        // (date, column index)
        let mut dates = BTreeSet::new();
        let mut price_cols = Vec::new();
        let mut volume_cols = Vec::new();
        for (i, h) in headers.iter().enumerate() {
            if let Some(key) = h.strip_suffix(PRICE_SUFFIX) {
                let date = util::date_string_to_int(key)?;
                dates.insert(date);
                price_cols.push((date, i));
            } else if let Some(key) = h.strip_suffix(VOLUME_SUFFIX) {
                volume_cols.push((util::date_string_to_int(key)?, i));
            }
        }

        let mut table = PriceTable::new(dates.into_iter().collect());
        for row in reader.records() {
            let row = row?;
            let ticker = row.get(ticker_col).unwrap_or_default().trim().to_string();
            if ticker.is_empty() {
                continue;
            }
            let ticker = util::normalize_ticker(&ticker);
            let name = name_col.and_then(|c| row.get(c)).unwrap_or(&ticker).to_string();

            let mut present = false;
            for (date, price_col) in &price_cols {
                let Some(close) = row.get(*price_col).and_then(parse_cell) else { continue };
                let volume = volume_cols.iter()
                    .find(|(d, _)| d == date)
                    .and_then(|(_, c)| row.get(*c))
                    .and_then(parse_cell)
                    .unwrap_or_default();
                table.record(&ticker, &name, DailyBar {
                    date: *date,
                    close: close.round() as i64,
                    volume: volume.round() as i64,
                });
                present = true;
            }

            if !present {
                table.rows.push(EtfSeries::new(&ticker, &name));
            }
        }

        Ok(table)
    }

    /// Writes CSV_E: a single `Market_ADR` row with one column per session.
    pub fn save_adr(&self, adr: &[(i32, f64)]) -> Result<()> {
        let mut writer = self.writer(files::SENTIMENT)?;

        let mut header = vec!["metric".to_string()];
        header.extend(adr.iter().map(|(d, _)| util::date_key(*d)));
        writer.write_record(&header)?;

        let mut record = vec![ADR_METRIC.to_string()];
        record.extend(adr.iter().map(|(_, v)| v.to_string()));
        writer.write_record(&record)?;

        writer.flush()?;
        info!("Saved {} ADR points to {}", adr.len(), files::SENTIMENT);
        Ok(())
    }

    pub fn load_adr(&self) -> Result<Vec<(i32, f64)>> {
        let mut reader = self.reader(files::SENTIMENT)?;
        let headers = reader.headers()?.clone();

        let mut adr = Vec::new();
        for row in reader.records() {
            let row = row?;
            if row.get(0) != Some(ADR_METRIC) {
                continue;
            }
            for (i, h) in headers.iter().enumerate().skip(1) {
                if let (Ok(date), Some(value)) = (util::date_string_to_int(h), row.get(i).and_then(parse_cell)) {
                    adr.push((date, value));
                }
            }
        }

        adr.sort_by_key(|(d, _)| *d);
        Ok(adr)
    }

    /// Writes CSV_C transposed: one row per symbol, one column per date.
    pub fn save_macro(&self, series: &[MacroSeries]) -> Result<()> {
        let dates: BTreeSet<i32> = series.iter()
            .flat_map(|s| s.closes.iter().map(|(d, _)| *d))
            .collect();

        let mut writer = self.writer(files::MACRO)?;
        let mut header = vec!["Ticker".to_string()];
        header.extend(dates.iter().map(|d| util::date_key(*d)));
        writer.write_record(&header)?;

        for s in series {
            let mut record = vec![s.symbol.clone()];
            for date in &dates {
                let cell = s.closes.iter()
                    .find(|(d, _)| d == date)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                record.push(cell);
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!("Saved {} macro series to {}", series.len(), files::MACRO);
        Ok(())
    }

    pub fn load_macro(&self) -> Result<Vec<MacroSeries>> {
        let mut reader = self.reader(files::MACRO)?;
        let headers = reader.headers()?.clone();

        let mut result = Vec::new();
        for row in reader.records() {
            let row = row?;
            let Some(symbol) = row.get(0).filter(|s| !s.is_empty()) else { continue };

            let mut series = MacroSeries { symbol: symbol.to_string(), closes: Vec::new() };
            for (i, h) in headers.iter().enumerate().skip(1) {
                // pandas may write "2024-01-02 00:00:00"
                let key = h.get(..10).unwrap_or(h);
                if let (Ok(date), Some(value)) = (util::date_string_to_int(key), row.get(i).and_then(parse_cell)) {
                    series.closes.push((date, value));
                }
            }
            result.push(series);
        }

        Ok(result)
    }

    pub fn save_analysis(&self, records: &[AnalysisRecord]) -> Result<()> {
        let mut writer = self.writer(files::ANALYSIS)?;
        for record in records {
            writer.serialize(record)?;
        }
        if records.is_empty() {
            writer.write_record(["ticker", "name", "grade_score", "alpha_1m", "rvol", "description"])?;
        }
        writer.flush()?;
        info!("Saved {} analysis records to {}", records.len(), files::ANALYSIS);
        Ok(())
    }

    pub fn load_analysis(&self) -> Result<Vec<AnalysisRecord>> {
        let mut reader = self.reader(files::ANALYSIS)?;
        let mut records = Vec::new();
        for record in reader.deserialize() {
            let mut record: AnalysisRecord = record?;
            record.ticker = util::normalize_ticker(&record.ticker);
            records.push(record);
        }
        Ok(records)
    }

    pub fn save_insight(&self, records: &[InsightRecord]) -> Result<()> {
        let mut writer = self.writer(files::INSIGHT)?;
        for record in records {
            writer.serialize(record)?;
        }
        if records.is_empty() {
            writer.write_record([
                "ticker", "name", "grade_score", "alpha_1m", "rvol", "description", "macro_json", "sentiment_json",
            ])?;
        }
        writer.flush()?;
        info!("Saved {} insight records to {}", records.len(), files::INSIGHT);
        Ok(())
    }

    pub fn load_insight(&self) -> Result<Vec<InsightRecord>> {
        let mut reader = self.reader(files::INSIGHT)?;
        let mut records = Vec::new();
        for record in reader.deserialize() {
            records.push(record?);
        }
        Ok(records)
    }

    pub fn save_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(portfolio)?;
        fs::write(self.path(files::PORTFOLIO), json)?;
        Ok(())
    }

    pub fn load_portfolio(&self) -> Result<Portfolio> {
        let path = self.path(files::PORTFOLIO);
        if !path.exists() {
            return Ok(Portfolio::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(util::strip_bom(&text))?)
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers.iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| AlphaMatrixError::DataError(format!("Missing column: {}", name)))
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fresh scratch directory under the system temp dir.
    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("alpha_matrix_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_table() -> PriceTable {
        let mut table = PriceTable::new(vec![20240102, 20240103]);
        table.record("069500", "KODEX 200", DailyBar { date: 20240102, close: 35000, volume: 1200 });
        table.record("069500", "KODEX 200", DailyBar { date: 20240103, close: 35500, volume: 1500 });
        table.record("0091P0", "신규 ETF", DailyBar { date: 20240103, close: 10000, volume: 30 });
        table
    }

    #[test]
    fn price_table_layout_and_reload() {
        let store = DataStore::new(scratch_dir("prices"));
        store.save_price_table(&sample_table()).unwrap();

        let raw = fs::read(store.path(files::PRICES)).unwrap();
        assert!(raw.starts_with(BOM));
        let text = String::from_utf8(raw[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "ticker,name,2024-01-02_P,2024-01-02_V,2024-01-03_P,2024-01-03_V");
        assert_eq!(lines.next().unwrap(), "069500,KODEX 200,35000,1200,35500,1500");
        assert_eq!(lines.next().unwrap(), "0091P0,신규 ETF,,,10000,30");

        let table = store.load_price_table().unwrap();
        assert_eq!(table.dates, vec![20240102, 20240103]);
        assert_eq!(table.rows.len(), 2);
        assert!(table.complete_window(&table.rows[0]).is_some());
        assert!(table.complete_window(&table.rows[1]).is_none());
    }

    #[test]
    fn price_table_accepts_float_cells_and_stripped_tickers() {
        let store = DataStore::new(scratch_dir("prices_float"));
        fs::write(
            store.path(files::PRICES),
            "ticker,name,2024-01-02_P,2024-01-02_V\n69500,KODEX 200,35000.0,1200.0\n",
        )
        .unwrap();

        let table = store.load_price_table().unwrap();
        let row: &EtfSeries = &table.rows[0];
        assert_eq!(row.ticker, "069500");
        assert_eq!(row.daily[0].close, 35000);
        assert_eq!(row.daily[0].volume, 1200);
    }

    #[test]
    fn missing_price_table_is_an_error() {
        let store = DataStore::new(scratch_dir("prices_missing"));
        assert!(store.load_price_table().is_err());
    }

    #[test]
    fn adr_row_reloads() {
        let store = DataStore::new(scratch_dir("adr"));
        store.save_adr(&[(20240102, 85.5), (20240103, 100.0)]).unwrap();

        let text = fs::read_to_string(store.path(files::SENTIMENT)).unwrap();
        assert!(text.contains("metric,2024-01-02,2024-01-03"));
        assert!(text.contains("Market_ADR,85.5,100"));

        assert_eq!(store.load_adr().unwrap(), vec![(20240102, 85.5), (20240103, 100.0)]);
    }

    #[test]
    fn macro_is_transposed_with_gaps() {
        let store = DataStore::new(scratch_dir("macro"));
        let series = vec![
            MacroSeries { symbol: "^IXIC".to_string(), closes: vec![(20240102, 14765.9), (20240103, 14592.2)] },
            MacroSeries { symbol: "KRW=X".to_string(), closes: vec![(20240103, 1310.5)] },
        ];
        store.save_macro(&series).unwrap();

        let text = fs::read_to_string(store.path(files::MACRO)).unwrap();
        assert!(text.contains("Ticker,2024-01-02,2024-01-03"));
        assert!(text.contains("KRW=X,,1310.5"));

        let loaded = store.load_macro().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].closes, vec![(20240103, 1310.5)]);
    }

    #[test]
    fn analysis_and_insight_reload() {
        let store = DataStore::new(scratch_dir("analysis"));
        let record = AnalysisRecord {
            ticker: "069500".to_string(),
            name: "KODEX 200".to_string(),
            grade_score: "S7".to_string(),
            alpha_1m: 3.21,
            rvol: 140.5,
            description: "추세 유지 중인 대장주".to_string(),
        };
        store.save_analysis(&[record.clone()]).unwrap();
        assert_eq!(store.load_analysis().unwrap(), vec![record.clone()]);

        let insight = InsightRecord::from_analysis(&record, r#"{"^IXIC":14765.9}"#, r#"{"2024-01-02":85.5}"#);
        store.save_insight(&[insight.clone()]).unwrap();
        assert_eq!(store.load_insight().unwrap(), vec![insight]);
    }

    #[test]
    fn empty_analysis_still_has_header() {
        let store = DataStore::new(scratch_dir("analysis_empty"));
        store.save_analysis(&[]).unwrap();
        assert!(store.load_analysis().unwrap().is_empty());
    }

    #[test]
    fn portfolio_defaults_when_absent() {
        let store = DataStore::new(scratch_dir("portfolio"));
        assert_eq!(store.load_portfolio().unwrap(), Portfolio::default());

        let portfolio: Portfolio = serde_json::from_str(r#"{"holdings":[{"code":"069500"}]}"#).unwrap();
        store.save_portfolio(&portfolio).unwrap();
        assert_eq!(store.load_portfolio().unwrap(), portfolio);
    }
}
