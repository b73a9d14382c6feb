//! End-to-end tests of the scan pipeline: orchestration, parsing and reports.

#[cfg(test)]
mod pipeline;
