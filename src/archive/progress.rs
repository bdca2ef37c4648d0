//! Download progress bars

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One byte-counting bar per concurrent download
#[derive(Clone)]
pub struct TransferProgress {
    multi: MultiProgress,
    quiet: bool,
}

impl TransferProgress {
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self { multi, quiet }
    }

    /// Progress that draws nothing
    pub fn hidden() -> Self {
        Self::new(true)
    }

    /// Add a bar for a transfer of `total` bytes
    pub fn start(&self, name: &str, total: u64) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }

        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg:30} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(short_name(name));
        pb
    }
}

/// Last 30 characters of a file name, for the bar label
fn short_name(name: &str) -> String {
    let count = name.chars().count();
    if count > 30 {
        let tail: String = name.chars().skip(count - 27).collect();
        format!("...{}", tail)
    } else {
        name.to_string()
    }
}
