#![deny(missing_docs)]
//! Cheatsheet core library.
//!
//! Configuration, request template storage and the inference clients used to
//! answer exam questions.

/// Configuration management.
pub mod config;
/// Completion and recognition clients.
pub mod inference;
/// Request template storage (bucket mount or S3).
pub mod storage;
