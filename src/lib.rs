pub mod config;
pub mod document;
pub mod error;
pub mod fast_track;
pub mod fetcher;
pub mod matcher;
pub mod policy;
pub mod presenter;
pub mod quote;
pub mod resolver;
pub mod service;
pub mod store;
pub mod transition;
pub mod utils;
