//! Directory watching and the scan-and-sort dispatcher.
//!
//! The notification source only says "something changed under the root". The
//! [`Dispatcher`] pulls those tokens from a single-consumer channel and answers
//! each burst with one full re-scan of the watched directory, so it never trusts
//! event payloads and can be driven in tests by pushing tokens by hand.

use std::collections::BTreeMap;
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio_util::sync::CancellationToken;

use crate::config::SortConfig;
use crate::error::WatchError;
use crate::file_category::Category;
use crate::file_organizer::{FileCandidate, FileOrganizer};

/// Capacity of the notification channel. A full channel already holds a
/// pending scan request, so further tokens are dropped.
pub const SIGNAL_CAPACITY: usize = 64;

/// Token delivered by a notification source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// Something under the root was created or modified.
    Changed,
    /// The notification mechanism reported an internal fault.
    Fault(String),
}

/// Outcome of one directory scan.
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    /// Successful moves per category.
    pub moved: BTreeMap<Category, usize>,
    /// Entries that could not be sorted, with the reason.
    pub failed: Vec<(String, String)>,
    /// Entries left alone (directories, reserved and filtered names).
    pub skipped: usize,
}

impl ScanReport {
    pub fn total_moved(&self) -> usize {
        self.moved.values().sum()
    }

    pub fn is_idle(&self) -> bool {
        self.moved.is_empty() && self.failed.is_empty()
    }
}

/// Where a file would go, without moving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub name: String,
    pub category: Category,
    pub destination: PathBuf,
}

/// Totals over the lifetime of [`Dispatcher::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub scans: usize,
    pub moved: usize,
    pub failed: usize,
    pub faults: usize,
}

/// Drives each candidate in the watched root through classify, provision and move.
#[derive(Debug)]
pub struct Dispatcher {
    config: SortConfig,
}

impl Dispatcher {
    pub fn new(config: SortConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Visits every entry of the watched root once, sorting each candidate.
    ///
    /// Entries are handled in enumeration order, one at a time. A failure on one
    /// entry is logged and the scan continues; the file stays put for the next scan.
    pub fn scan(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let root = self.config.root();

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to read watched directory {}: {e}", root.display());
                report
                    .failed
                    .push((root.display().to_string(), e.to_string()));
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {e}", root.display());
                    report.skipped += 1;
                    continue;
                }
            };

            match self.candidate(&entry) {
                Some(candidate) => self.sort(candidate, &mut report),
                None => report.skipped += 1,
            }
        }

        if report.is_idle() {
            tracing::debug!(skipped = report.skipped, "scan complete, nothing to sort");
        } else {
            tracing::debug!(
                moved = report.total_moved(),
                failed = report.failed.len(),
                "scan complete"
            );
        }
        report
    }

    /// Routing decisions for the current contents of the root. Touches nothing.
    pub fn plan(&self) -> Vec<PlannedMove> {
        let entries = match fs::read_dir(self.config.root()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(
                    "Failed to read watched directory {}: {e}",
                    self.config.root().display()
                );
                return Vec::new();
            }
        };

        entries
            .flatten()
            .filter_map(|entry| self.candidate(&entry))
            .map(|candidate| {
                let category = self
                    .config
                    .classifier()
                    .classify(&candidate.name, candidate.size);
                PlannedMove {
                    destination: self.config.destination(category).to_path_buf(),
                    name: candidate.name,
                    category,
                }
            })
            .collect()
    }

    /// Turns a directory entry into a candidate, or `None` if it must be left alone.
    fn candidate(&self, entry: &DirEntry) -> Option<FileCandidate> {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                tracing::warn!("Skipping non UTF-8 file name {}", raw.to_string_lossy());
                return None;
            }
        };

        let skip = self.config.skip_set();
        if skip.should_skip(&name) {
            if skip.is_reserved(&name) {
                tracing::trace!(file = %name, "reserved name");
            } else {
                tracing::trace!(file = %name, "skipped by filter");
            }
            return None;
        }

        let path = entry.path();
        // follows symlinks, like the size used for classification
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!(file = %name, "cannot stat entry: {e}");
                return None;
            }
        };
        if !metadata.is_file() {
            return None;
        }

        Some(FileCandidate {
            path,
            name,
            size: metadata.len(),
        })
    }

    fn sort(&self, candidate: FileCandidate, report: &mut ScanReport) {
        let category = self
            .config
            .classifier()
            .classify(&candidate.name, candidate.size);
        let destination = self.config.destination(category);

        let result = FileOrganizer::ensure_dir(destination)
            .and_then(|()| FileOrganizer::move_into(&candidate, category, destination));

        match result {
            Ok(_) => *report.moved.entry(category).or_insert(0) += 1,
            Err(e) => {
                tracing::error!(
                    file = %candidate.name,
                    category = %category,
                    "Failed to sort {}: {e}",
                    candidate.name
                );
                report.failed.push((candidate.name, e.to_string()));
            }
        }
    }

    /// Serves scan requests until `shutdown` fires or every sender is gone.
    ///
    /// A `Changed` token waits out the debounce window, swallows whatever else is
    /// queued, then runs one scan. Tokens arriving during a scan stay queued and
    /// trigger another one, so the last change of a burst is always observed.
    /// A scan in progress always runs to completion before shutdown is honored.
    pub async fn run(
        &self,
        mut signals: mpsc::Receiver<WatchSignal>,
        shutdown: CancellationToken,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            let signal = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                signal = signals.recv() => signal,
            };

            match signal {
                None => {
                    tracing::debug!("notification channel closed");
                    break;
                }
                Some(WatchSignal::Fault(details)) => {
                    summary.faults += 1;
                    tracing::error!("Watch error: {details}");
                }
                Some(WatchSignal::Changed) => {
                    let debounce = self.config.debounce();
                    if !debounce.is_zero() {
                        tokio::select! {
                            biased;
                            _ = shutdown.cancelled() => break,
                            _ = tokio::time::sleep(debounce) => {}
                        }
                    }
                    summary.faults += drain_pending(&mut signals);

                    let report = self.scan();
                    summary.scans += 1;
                    summary.moved += report.total_moved();
                    summary.failed += report.failed.len();
                }
            }
        }

        summary
    }
}

/// Swallows queued tokens, logging any faults among them. Returns the fault count.
fn drain_pending(signals: &mut mpsc::Receiver<WatchSignal>) -> usize {
    let mut faults = 0;
    loop {
        match signals.try_recv() {
            Ok(WatchSignal::Changed) => {}
            Ok(WatchSignal::Fault(details)) => {
                faults += 1;
                tracing::error!("Watch error: {details}");
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return faults,
        }
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}

/// Recursive `notify` watch on the root, feeding [`WatchSignal`]s into a channel.
///
/// Dropping it releases the watch and closes its end of the channel.
pub struct FsEventSource {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FsEventSource {
    pub fn start(root: &Path, signals: mpsc::Sender<WatchSignal>) -> Result<Self, WatchError> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let signal = match res {
                Ok(event) if is_change(&event.kind) => WatchSignal::Changed,
                Ok(_) => return,
                Err(e) => WatchSignal::Fault(e.to_string()),
            };
            match signals.try_send(signal) {
                Ok(()) | Err(TrySendError::Full(WatchSignal::Changed)) => {}
                Err(TrySendError::Full(WatchSignal::Fault(details))) => {
                    tracing::error!("Watch error (queue full): {details}");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
