pub mod csv_store;
pub mod github;

pub use csv_store::DataStore;
pub use github::GithubStore;

/// File names of the data pack shared by the collector, the analyzer and the server.
pub mod files {
    pub const PRICES: &str = "CSV_A.csv";
    pub const MACRO: &str = "CSV_C.csv";
    pub const SENTIMENT: &str = "CSV_E.csv";
    pub const ANALYSIS: &str = "CSV_A_Analysis.csv";
    pub const INSIGHT: &str = "Final_Insight.csv";
    pub const PORTFOLIO: &str = "portfolio.json";

    /// Everything the publisher uploads, in upload order.
    pub const PACK: [&str; 5] = [PRICES, SENTIMENT, MACRO, ANALYSIS, INSIGHT];
}
