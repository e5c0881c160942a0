pub mod export;
pub mod market;
pub mod ml;
pub mod notify;
pub mod oracle;
pub mod sqlite;
