pub mod dataset_repository;
pub mod ledger_repository;
pub mod market_data;
pub mod notifier;
pub mod oracle;
pub mod predictor;
