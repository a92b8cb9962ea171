use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Console line showing the time left until the next check.
pub(super) struct Countdown {
    bar: ProgressBar,
}

impl Countdown {
    pub(super) fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{msg}") {
            bar.set_style(style);
        }
        Self { bar }
    }

    pub(super) fn show(&self, remaining: Duration) {
        // Round up so the display never reads 0 while still waiting.
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        self.bar
            .set_message(format!("Time until next check: {secs} seconds"));
    }

    pub(super) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
