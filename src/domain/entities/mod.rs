pub mod closed_trade;
pub mod equity;
pub mod feature_sample;
pub mod pending;
pub mod position;
