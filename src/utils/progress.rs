//! Progress indicators for library loading.
//!
//! Thin wrapper over `indicatif` that draws on stderr and turns into a hidden bar when
//! progress is disabled by `--no-progress` or `BOILERPLATES_NO_PROGRESS`.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::NO_PROGRESS_ENV;

fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A progress bar or spinner that can be silenced.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Bar tracking `len` units.
    pub fn new(len: u64, enabled: bool) -> Self {
        let inner = if enabled && !is_progress_disabled() {
            let bar = IndicatifBar::new(len);
            bar.set_style(bar_style());
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self { inner }
    }

    /// Spinner for work of unknown length.
    pub fn new_spinner(enabled: bool) -> Self {
        let inner = if enabled && !is_progress_disabled() {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self { inner }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn bar_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_bar_is_hidden_but_counts() {
        let bar = ProgressBar::new(3, false);
        assert!(bar.is_hidden());
        bar.inc(2);
        assert_eq!(bar.position(), 2);
        bar.finish_and_clear();

        let spinner = ProgressBar::new_spinner(false);
        spinner.set_message("Loading templates");
        assert!(spinner.is_hidden());
    }
}
