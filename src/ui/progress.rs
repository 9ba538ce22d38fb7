//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A spinner for one pipeline stage
pub struct StageSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl StageSpinner {
    /// Start a spinner with a message (plain line in CI)
    pub fn start(ctx: &UiContext, message: &str) -> Self {
        let interactive = ctx.use_fancy_output();
        let spinner = if interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            Some(spinner)
        } else {
            println!("{} {}", style("=>").dim(), message);
            None
        };
        Self {
            spinner,
            interactive,
        }
    }

    /// Stop with success message and the stage duration
    pub fn stop(mut self, message: &str, elapsed: Duration) {
        let message = format!("{} {}", message, style(format!("(took {:.2?})", elapsed)).dim());
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("  {} {}", style("[DONE]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            println!("  {} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Byte progress bar for the archive download.
///
/// Hidden in non-interactive mode so CI logs stay line-oriented.
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Create a bar; `total` comes from Content-Length when present
    pub fn new(ctx: &UiContext, total: Option<u64>) -> Self {
        if !ctx.use_fancy_output() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                let template = concat!(
                    "  {spinner:.cyan} {bar:30.cyan/dim} {bytes}/{total_bytes} ",
                    "{bytes_per_sec:.dim} {eta:.dim}"
                );
                if let Ok(style) = ProgressStyle::default_bar().template(template) {
                    bar.set_style(style.progress_chars("━╸─"));
                }
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                let template = "  {spinner:.cyan} {bytes} {bytes_per_sec:.dim}";
                if let Ok(style) = ProgressStyle::default_spinner().template(template) {
                    bar.set_style(style);
                }
                bar
            }
        };
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Wrap a reader so bytes read advance the bar
    pub fn wrap_read<R: std::io::Read>(&self, reader: R) -> indicatif::ProgressBarIter<R> {
        self.bar.wrap_read(reader)
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
