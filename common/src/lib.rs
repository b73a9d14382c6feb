//! # nscope common
//!
//! Shared vocabulary for the workspace: the scan result model, run
//! configuration, error taxonomy and target handling.
//!
//! Nothing in here performs network or process IO. The only filesystem access
//! is [`network::target::load_from_file`].

pub mod config;
pub mod error;
pub mod network;
pub mod scan;
