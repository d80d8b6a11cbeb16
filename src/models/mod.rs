pub mod market;
pub mod analysis;
pub mod portfolio;
