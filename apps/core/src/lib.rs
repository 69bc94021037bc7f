pub mod action_executor;
pub mod action_registry;
pub mod aggregate;
pub mod calculator;
pub mod clipboard_history;
pub mod color;
pub mod config;
pub mod contract;
pub mod core_service;
pub mod currency;
pub mod discovery;
pub mod dispatch;
pub mod fuzzy;
pub mod index_store;
pub mod logging;
pub mod model;
pub mod query_state;
pub mod runtime;
pub mod search_engine;
pub mod settings;
pub mod text_tools;
pub mod transport;
pub mod units;
