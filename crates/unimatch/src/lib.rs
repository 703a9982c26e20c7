//! Student-to-program matching engine: scoring, caching, and the HTTP surface used by the
//! `unimatch-api` service.

pub mod catalog;
pub mod config;
pub mod error;
pub mod matching;
pub mod telemetry;
