//! Monotonic progress smoothing
//!
//! Fragmented downloads (HLS playlists, multi-part videos) report per-fragment
//! percentages that sawtooth back toward zero every time a new fragment
//! starts. The reducer here keeps a running maximum so displayed progress
//! never moves backwards while a download is active.

use crate::models::DownloadStatus;

/// Running maximum of observed progress for one download
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonotonicProgress {
    max_observed: f64,
}

impl MonotonicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one progress report into the running maximum.
    ///
    /// A `Queued` report resets the maximum to zero (the download was
    /// re-queued and will start over). Active statuses ratchet the maximum
    /// upward. Terminal and unknown statuses leave it frozen.
    pub fn observe(&mut self, status: DownloadStatus, percentage: Option<f64>) {
        match status {
            DownloadStatus::Queued => self.max_observed = 0.0,
            DownloadStatus::Downloading | DownloadStatus::Processing => {
                if let Some(p) = percentage {
                    if p > self.max_observed {
                        self.max_observed = p;
                    }
                }
            }
            _ => {}
        }
    }

    /// Highest percentage observed since the last reset
    pub fn max_observed(&self) -> f64 {
        self.max_observed
    }

    /// Percentage to display for the given status, or `None` when no bar
    /// should be shown
    pub fn display(&self, status: DownloadStatus) -> Option<f64> {
        display_percentage(status, self.max_observed)
    }
}

/// Map a status and smoothed percentage to a displayable value.
///
/// Completed downloads always show 100 regardless of the last report,
/// failed downloads show no bar, queued downloads show zero, and anything
/// else shows the smoothed value once progress has actually been observed.
pub fn display_percentage(status: DownloadStatus, max_observed: f64) -> Option<f64> {
    match status {
        DownloadStatus::Completed => Some(100.0),
        DownloadStatus::Failed => None,
        DownloadStatus::Queued => Some(0.0),
        _ => {
            if max_observed > 0.0 {
                Some(max_observed)
            } else {
                None
            }
        }
    }
}
