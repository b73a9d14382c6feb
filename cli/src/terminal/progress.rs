use std::sync::Arc;

use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use nscope_core::orchestrator::ProgressFn;

const TEMPLATE: &str = "{spinner:.blue} [{elapsed_precise}] {bar:32.green/bright_black} {pos}/{len} targets {msg}";

/// Span that owns the progress bar for a run of `total` targets.
pub fn scan_span(total: usize) -> Span {
    let span = info_span!("scan", indicatif.pb_show = true);
    span.pb_set_style(&style());
    span.pb_set_length(total as u64);
    span
}

/// Progress callback that advances the bar of `span`.
pub fn tracker(span: &Span) -> ProgressFn {
    let span = span.clone();
    Arc::new(move |completed, _total| {
        span.pb_set_position(completed as u64);
    })
}

fn style() -> ProgressStyle {
    ProgressStyle::with_template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ])
}
