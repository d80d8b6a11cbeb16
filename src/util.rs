use chrono::NaiveDate;
use serde_json::{Map, Value};
use crate::errors::{Result, AlphaMatrixError};

// 날짜 도구: 거래일은 YYYYMMDD 정수로 통일
pub fn date_string_to_int(date_str: &str) -> Result<i32> {
    let digits: String = date_str.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return Err(AlphaMatrixError::DataError(format!("Invalid date format: {}", date_str)));
    }
    digits.parse::<i32>().map_err(|e| AlphaMatrixError::DataError(e.to_string()))
}

pub fn int_to_naive_date(date_int: i32) -> Result<NaiveDate> {
    let date_str = date_int.to_string();
    if date_str.len() != 8 {
        return Err(AlphaMatrixError::DataError(format!("Invalid date format: {}", date_str)));
    }

    let year = date_str[0..4].parse::<i32>()?;
    let month = date_str[4..6].parse::<u32>()?;
    let day = date_str[6..8].parse::<u32>()?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AlphaMatrixError::DataError(format!("Invalid date: {}-{}-{}", year, month, day)))
}

pub fn naive_date_to_int(date: &NaiveDate) -> i32 {
    date.format("%Y%m%d").to_string().parse::<i32>().unwrap_or_default()
}

/// `20240102` -> `2024-01-02`, the column key used in the CSV pack
pub fn date_key(date_int: i32) -> String {
    let s = date_int.to_string();
    if s.len() != 8 {
        return s;
    }
    format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8])
}

/// Today's date on the Seoul exchange calendar.
pub fn today_kst() -> NaiveDate {
    chrono::Utc::now().with_timezone(&chrono_tz::Asia::Seoul).date_naive()
}

/// KRX reports numbers as text with thousands separators, `-` for none.
pub fn parse_krx_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Trims a ticker and left-pads it with zeros to six characters.
pub fn normalize_ticker(raw: &str) -> String {
    let trimmed = raw.trim();
    format!("{:0>6}", trimmed)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Converts CSV text to JSON objects, one per row.
///
/// Empty cells become `""`. Numeric cells become numbers unless they carry a
/// leading zero (tickers such as `069500` stay text).
pub fn csv_to_records(text: &str) -> Result<Vec<Map<String, Value>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(strip_bom(text).as_bytes());

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let mut record = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let cell = row.get(i).unwrap_or("");
            record.insert(header.to_string(), infer_value(cell));
        }
        records.push(record);
    }

    Ok(records)
}

fn infer_value(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::String(String::new());
    }

    let unsigned = cell.trim_start_matches('-');
    let zero_padded = unsigned.len() > 1 && unsigned.starts_with('0') && !unsigned.starts_with("0.");
    if zero_padded {
        return Value::String(cell.to_string());
    }

    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_conversions() {
        assert_eq!(date_string_to_int("2024/01/02").unwrap(), 20240102);
        assert_eq!(date_string_to_int("2024-01-02").unwrap(), 20240102);
        assert!(date_string_to_int("2024-1-2").is_err());

        let date = int_to_naive_date(20240229).unwrap();
        assert_eq!(naive_date_to_int(&date), 20240229);
        assert!(int_to_naive_date(20230229).is_err());

        assert_eq!(date_key(20240102), "2024-01-02");
    }

    #[test]
    fn krx_numbers() {
        assert_eq!(parse_krx_number("35,120"), Some(35120.0));
        assert_eq!(parse_krx_number(" 2,512.33 "), Some(2512.33));
        assert_eq!(parse_krx_number("-"), None);
        assert_eq!(parse_krx_number(""), None);
    }

    #[test]
    fn tickers_are_zero_padded() {
        assert_eq!(normalize_ticker(" 69500 "), "069500");
        assert_eq!(normalize_ticker("069500"), "069500");
        assert_eq!(normalize_ticker("0091P0"), "0091P0");
    }

    #[test]
    fn csv_records_infer_numbers_but_keep_codes() {
        let text = "\u{feff}ticker,name,alpha_1m,rvol,note\n069500,KODEX 200,3.25,120,\n";
        let records = csv_to_records(text).unwrap();

        assert_eq!(records.len(), 1);
        let row = &records[0];
        assert_eq!(row["ticker"], Value::String("069500".to_string()));
        assert_eq!(row["alpha_1m"], Value::from(3.25));
        assert_eq!(row["rvol"], Value::from(120));
        assert_eq!(row["note"], Value::String(String::new()));
    }

    #[test]
    fn fractional_values_below_one_are_numbers() {
        let records = csv_to_records("x\n0.5\n0\n").unwrap();
        assert_eq!(records[0]["x"], Value::from(0.5));
        assert_eq!(records[1]["x"], Value::from(0));
    }
}
