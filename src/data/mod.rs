// file: src/data/mod.rs
// description: sample data generation, loading and document building
// reference: internal module structure

pub mod builder;
pub mod generator;
pub mod loader;

pub use builder::DocumentBuilder;
pub use generator::SampleDataGenerator;
pub use loader::{CLAIMS_FILE, DataLoader, FILINGS_FILE, RATES_FILE};
