//! Dual-window alpha grading of the ETF universe.
//!
//! Each ETF's one-month and one-week returns are compared against the
//! benchmark index; the sign of both alphas picks the grade, and a 0-10
//! score is built from alpha strength, relative volume and trend
//! consistency.

pub mod metrics;
pub mod scoring;

use crate::models::analysis::{AnalysisRecord, Grade};
use crate::models::market::PriceTable;
use crate::util::round_to;
use log::debug;
use std::cmp::Ordering;

pub use metrics::{WindowReturns, relative_volume, trend_days};
pub use scoring::{calculate_score, describe};

/// Scores every ETF with a complete window and drops grade F.
///
/// Output is sorted by one-month alpha, best first.
pub fn analyze_table(table: &PriceTable, benchmark: &WindowReturns) -> Vec<AnalysisRecord> {
    let mut results = Vec::new();

    for row in &table.rows {
        let Some((closes, volumes)) = table.complete_window(row) else {
            debug!("{}: incomplete window, skipped", row.ticker);
            continue;
        };
        let Some(returns) = WindowReturns::from_closes(&closes) else {
            debug!("{}: not enough sessions, skipped", row.ticker);
            continue;
        };

        let alpha_1m = returns.one_month - benchmark.one_month;
        let alpha_1w = returns.one_week - benchmark.one_week;

        let grade = Grade::from_alphas(alpha_1m, alpha_1w);
        if grade == Grade::F {
            continue;
        }

        let rvol = relative_volume(&volumes);
        let up_days = trend_days(&closes);
        let score = calculate_score(alpha_1m, rvol, up_days, grade);

        results.push(AnalysisRecord {
            ticker: row.ticker.clone(),
            name: row.name.clone(),
            grade_score: format!("{}{}", grade, score),
            alpha_1m: round_to(alpha_1m, 2),
            rvol: round_to(rvol, 1),
            description: describe(grade, score).to_string(),
        });
    }

    results.sort_by(|a, b| b.alpha_1m.partial_cmp(&a.alpha_1m).unwrap_or(Ordering::Equal));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::DailyBar;

    fn table_with(rows: Vec<(&str, Vec<i64>, Vec<i64>)>) -> PriceTable {
        let len = rows[0].1.len();
        let dates: Vec<i32> = (0..len as i32).map(|i| 20240101 + i).collect();
        let mut table = PriceTable::new(dates.clone());
        for (ticker, closes, volumes) in &rows {
            for (i, date) in dates.iter().enumerate() {
                table.record(ticker, ticker, DailyBar { date: *date, close: closes[i], volume: volumes[i] });
            }
        }
        table
    }

    fn flat_benchmark() -> WindowReturns {
        WindowReturns { one_month: 0.0, one_week: 0.0 }
    }

    #[test]
    fn grades_and_sorts_by_alpha() {
        let vols = vec![100; 7];
        let table = table_with(vec![
            // +20% month, rising week -> S
            ("AAA", vec![100, 110, 111, 112, 113, 114, 120], vols.clone()),
            // +5% month, falling week -> B
            ("BBB", vec![100, 110, 109, 108, 107, 106, 105], vols.clone()),
            // falling -> F, dropped
            ("FFF", vec![100, 99, 98, 97, 96, 95, 94], vols),
        ]);

        let records = analyze_table(&table, &flat_benchmark());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ticker, "AAA");
        assert_eq!(records[0].alpha_1m, 20.0);
        assert_eq!(records[0].grade(), Some(Grade::S));
        assert_eq!(records[1].ticker, "BBB");
        assert_eq!(records[1].grade(), Some(Grade::B));
    }

    #[test]
    fn score_matches_components() {
        // alpha 20 -> 5, rvol 300 -> 3, five up days -> 2, capped at 10
        let table = table_with(vec![
            ("AAA", vec![100, 110, 111, 112, 113, 114, 120], vec![50, 50, 50, 50, 50, 50, 300]),
        ]);
        let records = analyze_table(&table, &flat_benchmark());
        assert_eq!(records[0].grade_score, "S10");
        assert_eq!(records[0].description, "천하무적: 시장의 왕");
    }

    #[test]
    fn benchmark_shifts_alpha() {
        let table = table_with(vec![("AAA", vec![100, 101, 102, 103, 104, 105, 106], vec![100; 7])]);
        let strong_market = WindowReturns { one_month: 10.0, one_week: 1.0 };

        // +6% month but market +10%: alpha -4, week +4.95% vs +1% -> A
        let records = analyze_table(&table, &strong_market);
        assert_eq!(records[0].grade(), Some(Grade::A));
        assert_eq!(records[0].alpha_1m, -4.0);
    }

    #[test]
    fn incomplete_rows_are_skipped() {
        let mut table = table_with(vec![("AAA", vec![100, 110, 111, 112, 113, 114, 120], vec![1; 7])]);
        table.record("NEW", "NEW", DailyBar { date: 20240107, close: 500, volume: 10 });

        let records = analyze_table(&table, &flat_benchmark());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ticker, "AAA");
    }
}
