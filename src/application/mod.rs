pub mod indicators;
pub mod ledger;
pub mod orchestrator;
pub mod outcomes;
pub mod runner;
pub mod sentiment;
