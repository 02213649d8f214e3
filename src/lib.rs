pub mod app;
pub mod archive;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod normalize;
pub mod output;
pub mod pool;
pub mod progress;
pub mod table;
