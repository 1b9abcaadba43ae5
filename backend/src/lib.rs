//! Soil type analysis backend.
//!
//! Serves soil-photograph classification over HTTP and bundles the offline
//! tooling around it: model training, dataset hygiene, and format
//! conversion. The `soiltool` binary drives the offline jobs; `main.rs`
//! runs the prediction service.

pub mod chart;
pub mod classes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod recommend;
pub mod routes;
pub mod state;
pub mod training;
