//! IBM DOORS automation through generated DXL scripts
//!
//! The DOORS desktop client has no API that reports when a script is done.
//! This crate writes a DXL script, launches the client on it, polls the
//! export file for a completion marker, kills the client, and parses the
//! export into [`Testcase`] records.

pub mod bridge;
pub mod client;
pub mod config;
pub mod dxl;
pub mod errors;
pub mod parser;
pub mod testcase;

pub use bridge::{get_testcases, TestcaseExport};
pub use client::{ClientCommand, Completion, DoorsClient};
pub use config::DoorsConfig;
pub use errors::{DoorsError, Result};
pub use testcase::Testcase;
