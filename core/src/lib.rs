//! # nscope core
//!
//! The scan pipeline:
//!
//! * **[`scanner`]**: runs the external tool for one target and captures its artifact.
//! * **[`parser`]**: turns an artifact into the host/port/service model.
//! * **[`orchestrator`]**: fans targets out to a bounded worker pool and collects results.
//! * **[`report`]**: renders the collected results into JSON, HTML and Markdown.

pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod scanner;
