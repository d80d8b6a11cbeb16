pub mod models;
pub mod analysis;
pub mod errors;
pub mod config;
pub mod util;
pub mod scrapers;
pub mod storage;
pub mod services;
pub mod llm;
pub mod server;

pub use models::analysis::{AnalysisRecord, Grade};
pub use models::market::{DailyBar, EtfSeries, PriceTable};
pub use errors::{Result, AlphaMatrixError};
