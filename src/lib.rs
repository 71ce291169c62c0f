pub mod config;
pub mod events;
pub mod explorer;
pub mod inspect;
pub mod logging;
pub mod logs;
pub mod network;
pub mod progress;
pub mod query;
pub mod resolver;
pub mod scan_id;
pub mod scanner;
pub mod writer;

#[cfg(test)]
mod testing;
