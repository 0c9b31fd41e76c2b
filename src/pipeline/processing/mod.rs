// Pipeline processing: currency conversion, scope gating, normalization and reconciliation

pub mod awards;
pub mod cleaner;
pub mod conflation;
pub mod currency;
pub mod normalize;
pub mod quality_gate;
pub mod unit_prices;
