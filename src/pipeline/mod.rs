// Data processing pipeline: cleaning, deduplication and award reconciliation

pub mod processing;
