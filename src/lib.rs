//! Find files with identical contents under a folder, or among paths piped
//! in on stdin, and list them as CSV or JSON.
//!
//! Files are compared by a 64-bit XXH64 checksum. Equal checksums are taken
//! to mean equal contents, which is very likely but not guaranteed.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ports;
pub mod services;
pub mod signal;
