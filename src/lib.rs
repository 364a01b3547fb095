pub mod attachment;
pub mod composer;
pub mod config;
pub mod cursor;
pub mod delivery;
pub mod enrich;
pub mod error;
pub mod http;
pub mod lookup;
pub mod metadata;
pub mod models;
pub mod poller;
pub mod solscan;
pub mod telegram;
pub mod watcher;
