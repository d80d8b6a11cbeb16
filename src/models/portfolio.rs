use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::util;

/// The front-end's saved portfolio (`portfolio.json`).
///
/// Holdings are kept as free-form objects; only `code`/`ticker` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    pub holdings: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Portfolio {
    pub fn tickers(&self) -> Vec<String> {
        self.holdings.iter().filter_map(holding_ticker).collect()
    }
}

/// `code` or `ticker` of a holding, normalized to six characters.
///
/// Accepts numbers too, since spreadsheets drop the leading zeros.
pub fn holding_ticker(holding: &Value) -> Option<String> {
    let raw = ["code", "ticker"].iter().find_map(|key| match holding.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })?;
    Some(util::normalize_ticker(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tickers_accept_code_or_ticker() {
        let portfolio: Portfolio = serde_json::from_value(json!({
            "holdings": [
                { "code": "69500", "qty": 10 },
                { "ticker": 229200 },
                { "code": "  ", "ticker": "0091P0" },
                { "name": "no code" }
            ],
            "updated": "2024-01-02"
        }))
        .unwrap();

        assert_eq!(portfolio.tickers(), vec!["069500", "229200", "0091P0"]);
        assert_eq!(portfolio.extra["updated"], json!("2024-01-02"));
    }

    #[test]
    fn missing_holdings_default_to_empty() {
        let portfolio: Portfolio = serde_json::from_value(json!({})).unwrap();
        assert!(portfolio.holdings.is_empty());
    }
}
