//! Progress reporting for batch ingestion.
//!
//! The server passes [`NoopProgress`]; the CLI uses [`IndicatifProgress`].

use indicatif::{ProgressBar, ProgressStyle};

/// Minimal progress interface used by `IngestPipeline::ingest_dir`.
pub trait Progress: Send + Sync {
    fn set_total(&self, _n: u64) {}
    /// Advance by one step and show a short message.
    fn step(&self, _msg: &str) {}
    fn message(&self, _msg: &str) {}
    fn finish(&self, _msg: &str) {}
}

#[derive(Default, Clone, Copy)]
pub struct NoopProgress;
impl Progress for NoopProgress {}

pub struct IndicatifProgress {
    pb: ProgressBar,
}

impl IndicatifProgress {
    /// Bounded bar, one step per file. `len` may be 0 and set later by
    /// `ingest_dir` once the PDFs are listed.
    pub fn bar(len: u64) -> Self {
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} PDFs  {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Self { pb }
    }
}

impl Progress for IndicatifProgress {
    fn set_total(&self, n: u64) {
        self.pb.set_length(n);
    }
    fn step(&self, msg: &str) {
        self.pb.inc(1);
        self.pb.set_message(msg.to_string());
    }
    fn message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }
    fn finish(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
