use std::env;
use std::time::Duration;

/// Pipeline settings shared by the collector and the analyzer.
pub struct Config {
    pub debug_mode: bool,
    pub debug_etf_limit: usize,
    pub data_dir: String,
    pub trading_days: usize,
    pub lookback_days: i64,
    /// ISIN of the stock whose sessions define the trading calendar
    pub reference_isin: String,
    pub benchmark_index: String,
    pub macro_symbols: Vec<String>,
    pub request_interval: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self {
            debug_mode: false,
            debug_etf_limit: 10,
            data_dir: "data".to_string(),
            trading_days: 30,
            lookback_days: 60,
            reference_isin: "KR7005930003".to_string(),
            benchmark_index: "1028".to_string(),
            macro_symbols: vec!["^IXIC".to_string(), "KRW=X".to_string(), "^SOX".to_string()],
            request_interval: Duration::from_millis(50),
        }
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_debug_etf_limit(mut self, limit: usize) -> Self {
        self.debug_etf_limit = limit;
        self
    }

    pub fn with_data_dir(mut self, dir: &str) -> Self {
        self.data_dir = dir.to_string();
        self
    }

    pub fn with_trading_days(mut self, days: usize) -> Self {
        self.trading_days = days;
        self
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_benchmark_index(mut self, code: &str) -> Self {
        self.benchmark_index = code.to_string();
        self
    }

    pub fn with_macro_symbols(mut self, symbols: &[&str]) -> Self {
        self.macro_symbols = symbols.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings of the HTTP service, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub github_user: String,
    pub repo_name: String,
    pub branch: String,
    pub github_token: Option<String>,
    /// Overrides the raw.githubusercontent.com base URL when set
    pub store_base_url: Option<String>,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            github_user: non_empty("GITHUB_USER").unwrap_or_else(|| "your-github-id".to_string()),
            repo_name: non_empty("REPO_NAME").unwrap_or_else(|| "your-repo-name".to_string()),
            branch: non_empty("GITHUB_BRANCH").unwrap_or_else(|| "main".to_string()),
            github_token: non_empty("GITHUB_TOKEN"),
            store_base_url: non_empty("STORE_BASE_URL"),
            gemini_api_key: non_empty("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            cors_origins: non_empty("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Raw file base URLs in the order they should be tried.
    pub fn raw_base_urls(&self) -> Vec<String> {
        if let Some(base) = &self.store_base_url {
            return vec![base.trim_end_matches('/').to_string()];
        }

        ["raw.githubusercontent.com", "raw.bgithub.xyz", "raw.staticdn.net"]
            .iter()
            .map(|mirror| format!("https://{}/{}/{}/{}", mirror, self.github_user, self.repo_name, self.branch))
            .collect()
    }
}
