//! HTTP surface for the cost monitor.
//!
//! Thin plumbing around the `costwatch` core: an axum router exposing anomaly
//! detection and cost-report generation, plus the handlebars document
//! rendering the report endpoints hand off to.

pub mod document;
pub mod handlers;
pub mod server;
