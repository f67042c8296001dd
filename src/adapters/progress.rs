use crate::ports::ProgressPort;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}";
const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner} {pos} files {msg}";

/// Draws the running file count on stderr, away from the report.
pub struct ProgressBarAdapter {
    bar: ProgressBar,
    quiet: bool,
}

impl ProgressBarAdapter {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr()),
            quiet: false,
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet: true,
        }
    }

    pub fn with_quiet(self, quiet: bool) -> Self {
        if quiet { Self::new_quiet() } else { self }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

impl Default for ProgressBarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPort for ProgressBarAdapter {
    fn start(&self, total: Option<u64>) {
        if self.quiet {
            return;
        }

        let style = match total {
            Some(total) => {
                self.bar.set_length(total);
                ProgressStyle::with_template(BAR_TEMPLATE)
            }
            None => ProgressStyle::with_template(SPINNER_TEMPLATE),
        };
        if let Ok(style) = style {
            self.bar.set_style(style);
        }
        self.bar.set_message("checked");
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn update(&self, processed: u64) {
        if self.quiet {
            return;
        }

        self.bar.set_position(processed);
    }

    fn finish(&self, processed: u64) {
        if self.quiet {
            return;
        }

        self.bar.set_position(processed);
        self.bar.disable_steady_tick();
        self.bar.finish_with_message("checked");
    }

    fn suspend(&self, f: &mut dyn FnMut()) {
        // The steady tick redraws from another thread; hold it off while
        // anything else writes to stderr.
        self.bar.suspend(f);
    }
}
