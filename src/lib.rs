//! Ledger consistency engine.
//!
//! Accounts, income and expense transactions, monthly budgets and savings
//! goals over a pluggable storage adapter, served as a JSON API.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

pub use app::{AppState, router};
