//! Loading spinner
//!
//! Thin wrapper over an indicatif spinner that is drawn to stderr, so
//! table and JSON output on stdout stay clean.

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(80);

/// Spinner for a single in-flight operation
pub struct LoadingSpinner {
    bar: ProgressBar,
    enabled: bool,
}

impl LoadingSpinner {
    /// Start a spinner showing `message`
    pub fn new(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar, enabled: true }
    }

    /// Spinner that draws nothing (quiet mode, JSON output)
    pub fn hidden() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
        Self { bar, enabled: false }
    }

    /// Visible spinner unless `quiet`
    pub fn start(message: impl Into<String>, quiet: bool) -> Self {
        if quiet {
            Self::hidden()
        } else {
            Self::new(message)
        }
    }

    /// Whether the spinner is drawn
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the message
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Current message
    pub fn message(&self) -> String {
        self.bar.message()
    }

    /// Stop and leave a success line
    pub fn finish_success(&self, message: &str) {
        self.bar
            .finish_with_message(format!("{} {}", style("✓").green(), message));
    }

    /// Stop and leave a failure line
    pub fn finish_error(&self, message: &str) {
        self.bar
            .abandon_with_message(format!("{} {}", style("✗").red(), message));
    }

    /// Stop and erase the spinner line
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for LoadingSpinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
