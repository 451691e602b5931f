//! HTTP request handlers, one module per pipeline stage.

pub mod process;
pub mod progress;
pub mod upload;
