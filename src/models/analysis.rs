use serde::{Deserialize, Serialize};
use std::fmt;

/// Dual-window classification against the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    /// Leading on both windows
    S,
    /// Weak month, strong week: emerging
    A,
    /// Strong month, weak week: pullback
    B,
    /// Lagging on both windows
    F,
}

impl Grade {
    pub fn from_alphas(alpha_1m: f64, alpha_1w: f64) -> Self {
        if alpha_1m > 0.0 && alpha_1w > 0.0 {
            Grade::S
        } else if alpha_1m <= 0.0 && alpha_1w > 0.0 {
            Grade::A
        } else if alpha_1m > 0.0 && alpha_1w <= 0.0 {
            Grade::B
        } else {
            Grade::F
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Grade::S => 'S',
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::F => 'F',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'S' => Some(Grade::S),
            'A' => Some(Grade::A),
            'B' => Some(Grade::B),
            'F' => Some(Grade::F),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One row of CSV_A_Analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub ticker: String,
    pub name: String,
    /// Grade letter followed by the 0-10 score, e.g. `S7`
    pub grade_score: String,
    pub alpha_1m: f64,
    pub rvol: f64,
    pub description: String,
}

impl AnalysisRecord {
    pub fn grade(&self) -> Option<Grade> {
        self.grade_score.chars().next().and_then(Grade::from_letter)
    }

    pub fn score(&self) -> Option<u8> {
        self.grade_score.get(1..).and_then(|s| s.parse().ok())
    }
}

/// One row of Final_Insight: an analysis record plus the market context
/// the AI endpoints hand to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub ticker: String,
    pub name: String,
    pub grade_score: String,
    pub alpha_1m: f64,
    pub rvol: f64,
    pub description: String,
    pub macro_json: String,
    pub sentiment_json: String,
}

impl InsightRecord {
    pub fn from_analysis(record: &AnalysisRecord, macro_json: &str, sentiment_json: &str) -> Self {
        Self {
            ticker: record.ticker.clone(),
            name: record.name.clone(),
            grade_score: record.grade_score.clone(),
            alpha_1m: record.alpha_1m,
            rvol: record.rvol,
            description: record.description.clone(),
            macro_json: macro_json.to_string(),
            sentiment_json: sentiment_json.to_string(),
        }
    }
}
