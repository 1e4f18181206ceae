//! Concrete implementations of the domain ports: files, CSV, job stores and the
//! Gemini HTTP API.

pub mod csv_export;
pub mod csv_format;
pub mod gemini;
pub mod storage;
pub mod store;
