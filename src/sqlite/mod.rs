// SQLite module - one worker-owned session per connection
//
// - config: pragma defaults/overrides and database existence checks
// - params: conversion from `SqlValue` to bindable `rusqlite` values
// - query: result extraction for a single statement
// - worker: the thread-backed connection handle

pub mod config;
pub mod params;
pub mod query;
pub mod worker;

pub use config::{ConnectionOptions, DEFAULT_PRAGMAS};
pub use params::Params;
pub use query::build_query_result;
pub use worker::SqliteConnection;
