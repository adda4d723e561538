//! quizrun-store — Attempt stores, quiz content, and configuration.
//!
//! Implements the `AttemptStore` and `QuizSource` traits from
//! `quizrun-core`: an in-memory store with fault injection, a JSON file
//! store, and a catalog of quizzes loaded from TOML files.

pub mod catalog;
pub mod config;
pub mod json_file;
pub mod memory;

pub use catalog::QuizCatalog;
pub use config::{create_store, load_config, load_config_from, QuizrunConfig, StoreConfig};
pub use json_file::JsonFileStore;
pub use memory::{FailPoint, MemoryStore};
