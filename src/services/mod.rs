pub mod collector;
pub mod analyzer;
pub mod publisher;

pub use collector::CollectorService;
pub use analyzer::AnalyzerService;
pub use publisher::PublisherService;

#[cfg(test)]
pub(crate) mod testing;
