use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::client::PullProgress;
use crate::constants::{DIGEST_LABEL_LEN, DIGEST_LABEL_SKIP, PROGRESS_BAR_TEMPLATE};

/// Receives status lines and per-layer progress during initialization
pub trait ProgressObserver {
    /// A plain status line ("pulling manifest", "Loading model...")
    fn status(&mut self, message: &str);
    /// A new layer bar with `total` bytes
    fn open(&mut self, digest: &str, label: &str, total: u64);
    /// Move the layer bar forward by `delta` bytes
    fn advance(&mut self, digest: &str, delta: u64);
    /// The layer bar will receive no further updates
    fn close(&mut self, digest: &str);
}

/// What a finished pull went through
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullSummary {
    /// Distinct layer bars opened
    pub layers: usize,
    /// Sum of the layer sizes
    pub total_bytes: u64,
    /// Last status line the daemon sent, normally "success"
    pub last_status: Option<String>,
}

/// Digest-keyed progress bar bookkeeping for one pull
///
/// A bar is opened the first time a digest arrives with a total, advanced
/// by the difference between the reported `completed` and its position, and
/// closed as soon as a record with a different digest shows up. A closed
/// layer never gets a second bar, even if its digest comes back later.
pub struct PullTracker<'a> {
    observer: &'a mut dyn ProgressObserver,
    current_digest: Option<String>,
    // digest -> bytes already reported to the observer
    open_bars: BTreeMap<String, u64>,
    // every digest that ever had a bar, open or closed
    seen: BTreeSet<String>,
    summary: PullSummary,
}

impl<'a> PullTracker<'a> {
    pub fn new(observer: &'a mut dyn ProgressObserver) -> Self {
        Self {
            observer,
            current_digest: None,
            open_bars: BTreeMap::new(),
            seen: BTreeSet::new(),
            summary: PullSummary::default(),
        }
    }

    pub fn observe(&mut self, record: &PullProgress) {
        let digest = record.digest();

        let digest_changed = self
            .current_digest
            .as_deref()
            .is_some_and(|previous| digest != Some(previous));
        if digest_changed {
            if let Some(previous) = self.current_digest.take() {
                self.close(&previous);
            }
        }

        let Some(digest) = digest else {
            if let Some(status) = record.status.as_deref() {
                self.observer.status(status);
                self.summary.last_status = Some(status.to_string());
            }
            return;
        };

        if !self.seen.contains(digest) {
            if let Some(total) = record.total.filter(|&t| t > 0) {
                self.observer.open(digest, &digest_label(digest), total);
                self.open_bars.insert(digest.to_string(), 0);
                self.seen.insert(digest.to_string());
                self.summary.layers += 1;
                self.summary.total_bytes += total;
            }
        }

        if let Some(completed) = record.completed.filter(|&c| c > 0) {
            match self.open_bars.get_mut(digest) {
                Some(position) => {
                    let delta = completed.saturating_sub(*position);
                    if delta > 0 {
                        self.observer.advance(digest, delta);
                        *position += delta;
                    }
                }
                None if self.seen.contains(digest) => {
                    debug!("Progress for closed layer {}, skipping", digest)
                }
                None => debug!("Progress for {} arrived before its total, skipping", digest),
            }
        }

        self.current_digest = Some(digest.to_string());
    }

    /// Close every bar still open and return the summary
    pub fn finish(mut self) -> PullSummary {
        let remaining: Vec<String> = self.open_bars.keys().cloned().collect();
        for digest in remaining {
            self.close(&digest);
        }
        self.summary
    }

    /// Number of bars currently open
    pub fn open_bars(&self) -> usize {
        self.open_bars.len()
    }

    fn close(&mut self, digest: &str) {
        if self.open_bars.remove(digest).is_some() {
            self.observer.close(digest);
        }
    }
}

/// Bar label: `Downloading` plus 12 characters of the digest after `sha256:`
pub fn digest_label(digest: &str) -> String {
    let short: String = digest
        .chars()
        .skip(DIGEST_LABEL_SKIP)
        .take(DIGEST_LABEL_LEN)
        .collect();

    if short.is_empty() {
        format!("Downloading {}", digest)
    } else {
        format!("Downloading {}", short)
    }
}

/// Terminal rendering with one `indicatif` bar per layer
pub struct TerminalProgress {
    bars: HashMap<String, ProgressBar>,
    style: ProgressStyle,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(PROGRESS_BAR_TEMPLATE)
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());

        Self {
            bars: HashMap::new(),
            style,
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for TerminalProgress {
    fn status(&mut self, message: &str) {
        println!("{}", message);
    }

    fn open(&mut self, digest: &str, label: &str, total: u64) {
        let bar = ProgressBar::new(total)
            .with_style(self.style.clone())
            .with_message(label.to_string());
        self.bars.insert(digest.to_string(), bar);
    }

    fn advance(&mut self, digest: &str, delta: u64) {
        if let Some(bar) = self.bars.get(digest) {
            bar.inc(delta);
        }
    }

    fn close(&mut self, digest: &str) {
        if let Some(bar) = self.bars.remove(digest) {
            bar.finish();
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.abandon();
        }
    }
}
