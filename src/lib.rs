//! # simdriver
//!
//! Drives a simulated vehicle with a previously trained steering model, and
//! trains that model from recorded driving sessions. Telemetry and camera
//! frames arrive over a TCP channel; the steering network is built with the
//! Burn ML framework on the ndarray backend.
//!
//! ## Modules
//!
//! - [`telemetry`] — Telemetry frames, camera images, game records, TCP channel
//! - [`vision`] — Camera frame crop/resize/normalize into the model input
//! - [`model`] — Steering CNN, backends, inference wrapper
//! - [`data`] — Record files, batched example stream fed by worker threads
//! - [`pilot`] — The live control loop
//! - [`training`] — Training controller, learning-rate schedule, summary sink
//! - [`checkpoint`] — Model persistence and versioning
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — Structured error types

#![recursion_limit = "256"]

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod pilot;
pub mod telemetry;
pub mod training;
pub mod vision;
