/// Transfer progress reporting
///
/// The dispatcher asks a `ProgressReporter` for one `TransferProgress` per
/// download and feeds it every chunk written to disk.

use indicatif::{ProgressBar, ProgressStyle};

pub trait ProgressReporter: Send + Sync {
    /// Begin tracking a transfer. `total` is the declared content length,
    /// `None` for chunked responses.
    fn start(&self, label: &str, total: Option<u64>) -> Box<dyn TransferProgress>;
}

pub trait TransferProgress: Send {
    fn advance(&mut self, bytes: u64);

    /// The whole body reached the destination file
    fn finish(&mut self);

    /// The transfer stopped early
    fn abandon(&mut self);
}

/// Byte counter on stderr, drawn with indicatif
pub struct TerminalProgress {
    visible: bool,
}

impl TerminalProgress {
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }
}

impl ProgressReporter for TerminalProgress {
    fn start(&self, label: &str, total: Option<u64>) -> Box<dyn TransferProgress> {
        let bar = if !self.visible {
            ProgressBar::hidden()
        } else {
            match total {
                Some(len) if len > 0 => ProgressBar::new(len),
                _ => ProgressBar::new_spinner(),
            }
        };

        // Bytes only; the length is unknown for chunked bodies so no bar or ETA
        let style = ProgressStyle::with_template("{prefix}{bytes} {binary_bytes_per_sec} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_prefix(label.to_string());

        Box::new(BarTransfer { bar })
    }
}

struct BarTransfer {
    bar: ProgressBar,
}

impl TransferProgress for BarTransfer {
    fn advance(&mut self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&mut self) {
        self.bar.finish_with_message("Done");
    }

    fn abandon(&mut self) {
        self.bar.abandon_with_message("Failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_tracks_bytes_and_finishes() {
        let bar = ProgressBar::hidden();
        bar.set_length(10);
        let mut transfer = BarTransfer { bar: bar.clone() };

        transfer.advance(4);
        transfer.advance(6);
        assert_eq!(bar.position(), 10);
        assert!(!bar.is_finished());

        transfer.finish();
        assert!(bar.is_finished());
    }

    #[test]
    fn test_unknown_length_can_finish() {
        let bar = ProgressBar::hidden();
        let mut transfer = BarTransfer { bar: bar.clone() };

        transfer.advance(1024);
        transfer.finish();
        assert_eq!(bar.position(), 1024);
        assert!(bar.is_finished());
    }

    #[test]
    fn test_hidden_reporter_accepts_transfers() {
        let reporter = TerminalProgress::hidden();
        let mut transfer = reporter.start("Get: http://localhost, database:odoo... ", Some(8));
        transfer.advance(8);
        transfer.abandon();
    }
}
