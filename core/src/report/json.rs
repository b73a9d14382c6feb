//! Machine-readable dump of every result.

use nscope_common::scan::ScanResult;

pub fn render(results: &[ScanResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(results)
}

pub fn parse(json: &str) -> Result<Vec<ScanResult>, serde_json::Error> {
    serde_json::from_str(json)
}
