pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod viewer;
