pub mod forest_predictor;
pub mod random_forest;
