//! quizrun-core — Timed assessment engine.
//!
//! This crate defines the quiz data model, the per-question countdown, the
//! question sequencer, scoring and aggregation, and the recorder that turns
//! a finished run into a durable attempt. Storage and content providers
//! plug in through the traits in [`traits`].

pub mod aggregate;
pub mod clock;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod recorder;
pub mod scoring;
pub mod sequencer;
pub mod session;
pub mod statistics;
pub mod traits;
