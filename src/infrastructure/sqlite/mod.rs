pub mod dataset_repo;
pub mod ledger_repo;
pub mod migrations;
