pub mod bar;
pub mod close_reason;
pub mod command;
pub mod features;
pub mod judgment;
pub mod mode;
pub mod signal;
