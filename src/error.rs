//! Startup and watch errors.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the filesystem notification source.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {}: {reason}", path.display())]
    PathWatchFailed { path: PathBuf, reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Failures that stop the sorter before the watch loop starts.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("No directory to watch: pass one on the command line or set `watch_root`")]
    NoWatchRoot,

    #[error("Watched root {} does not exist", path.display())]
    RootMissing { path: PathBuf },

    #[error("Watched root {} is not a directory", path.display())]
    RootNotDirectory { path: PathBuf },

    #[error("Watched root {} is not accessible: {error}", path.display())]
    RootInaccessible {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}
