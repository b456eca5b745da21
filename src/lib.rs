#![deny(missing_docs)]

//! Core library for the Rusty Digest PDF summarizer.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text and metadata extraction.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization counters.
pub mod metrics;
/// Document summarization pipeline.
pub mod processing;
/// Text-generation provider clients.
pub mod summarization;
