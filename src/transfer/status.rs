use indicatif::{MultiProgress, ProgressBar};

/// Where the orchestrator pushes status text and overall percentage.
/// Shared with the transport's progress callback, hence `Send + Sync`.
pub trait StatusReporter: Send + Sync {
    fn status(&self, text: &str);
    fn progress(&self, percent: f64);
}

/// Terminal surface: a header line for status text over a 0..=100 bar.
pub struct ConsoleReporter {
    mp: MultiProgress,
    header: ProgressBar,
    bar: ProgressBar,
}

impl ConsoleReporter {
    pub fn new(mp: MultiProgress, header: ProgressBar, bar: ProgressBar) -> Self {
        Self { mp, header, bar }
    }

    pub fn finish(&self) {
        self.header.finish_and_clear();
        self.bar.finish_and_clear();
        let _ = self.mp.clear();
    }
}

impl StatusReporter for ConsoleReporter {
    fn status(&self, text: &str) {
        self.header.set_message(text.to_string());
    }

    fn progress(&self, percent: f64) {
        let p = percent.clamp(0.0, 100.0).round() as u64;
        // the bar never moves backwards even if a caller reports out of order
        if p > self.bar.position() {
            self.bar.set_position(p);
        }
    }
}

/// Used for `--quiet` and `--json`: status goes to the debug log only.
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn status(&self, text: &str) {
        tracing::debug!("status: {}", text);
    }

    fn progress(&self, _percent: f64) {}
}
