//! Command-line interface module for autosort.
//!
//! This module handles:
//! - Argument parsing
//! - Resolving and validating the watched root
//! - One-shot scans and dry runs
//! - The long-running watch with graceful shutdown

use crate::config::{SortConfig, SorterConfig};
use crate::error::StartupError;
use crate::logging;
use crate::output::OutputFormatter;
use crate::watcher::{Dispatcher, FsEventSource, RunSummary, SIGNAL_CAPACITY, WatchSignal};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Watch a directory and sort new files into category folders.
#[derive(Debug, Parser)]
#[command(name = "autosort", version, about)]
pub struct Cli {
    /// Directory to watch (overrides `watch_root` from the config file)
    pub root: Option<PathBuf>,

    /// Configuration file (default: ./.autosortrc.toml, then the user config dir)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sort the current contents once and exit
    #[arg(long)]
    pub once: bool,

    /// Show where files would go without moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runs the command described by `cli`.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let raw = SorterConfig::load(cli.config.as_deref())?;
    let level = if cli.verbose {
        "debug"
    } else {
        raw.logging.level.as_str()
    };
    logging::init(level);

    let config = prepare(raw, cli.root.as_deref())?;
    let dispatcher = Dispatcher::new(config);

    if cli.dry_run {
        OutputFormatter::info(&format!(
            "Analyzing contents of: {}",
            dispatcher.config().root().display()
        ));
        OutputFormatter::plan(&dispatcher.plan());
        return Ok(());
    }

    if cli.once {
        OutputFormatter::info(&format!(
            "Sorting contents of: {}",
            dispatcher.config().root().display()
        ));
        OutputFormatter::scan_summary(&dispatcher.scan());
        return Ok(());
    }

    watch(&dispatcher, shutdown_signal()).await?;
    Ok(())
}

/// Validates the watched root and compiles the configuration.
///
/// `root_override` wins over `watch_root` from the file. A missing, unreadable
/// or non-directory root is fatal.
pub fn prepare(raw: SorterConfig, root_override: Option<&Path>) -> Result<SortConfig, StartupError> {
    let root = root_override
        .map(Path::to_path_buf)
        .or_else(|| raw.watch_root.clone())
        .ok_or(StartupError::NoWatchRoot)?;
    let root = validate_root(&root)?;
    Ok(raw.compile(root)?)
}

fn validate_root(root: &Path) -> Result<PathBuf, StartupError> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StartupError::RootMissing {
                path: root.to_path_buf(),
            });
        }
        Err(error) => {
            return Err(StartupError::RootInaccessible {
                path: root.to_path_buf(),
                error,
            });
        }
    };
    if !metadata.is_dir() {
        return Err(StartupError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }
    fs::read_dir(root).map_err(|error| StartupError::RootInaccessible {
        path: root.to_path_buf(),
        error,
    })?;
    fs::canonicalize(root).map_err(|error| StartupError::RootInaccessible {
        path: root.to_path_buf(),
        error,
    })
}

/// Watches the root until `shutdown` resolves.
///
/// Stops taking notifications once `shutdown` resolves, lets a scan in flight
/// finish, then releases the watch.
pub async fn watch<F>(dispatcher: &Dispatcher, shutdown: F) -> Result<RunSummary, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let root = dispatcher.config().root().to_path_buf();
    let (tx, rx) = mpsc::channel(SIGNAL_CAPACITY);
    if dispatcher.config().scan_on_start() {
        let _ = tx.try_send(WatchSignal::Changed);
    }
    let source = FsEventSource::start(&root, tx)?;

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        shutdown.await;
        cancel.cancel();
    });

    tracing::info!("Watching {} for new files", source.root().display());
    let summary = dispatcher.run(rx, token).await;
    drop(source);
    tracing::info!(
        scans = summary.scans,
        moved = summary.moved,
        failed = summary.failed,
        "Stopped watching {}",
        root.display()
    );
    Ok(summary)
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["autosort", "/tmp/in", "--once", "-c", "cfg.toml"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/in")));
        assert_eq!(cli.config, Some(PathBuf::from("cfg.toml")));
        assert!(cli.once);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_prepare_requires_root() {
        let result = prepare(SorterConfig::default(), None);
        assert!(matches!(result, Err(StartupError::NoWatchRoot)));
    }

    #[test]
    fn test_prepare_rejects_missing_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let missing = temp_dir.path().join("nope");
        let result = prepare(SorterConfig::default(), Some(missing.as_path()));
        assert!(matches!(result, Err(StartupError::RootMissing { .. })));
    }

    #[test]
    fn test_prepare_rejects_file_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let result = prepare(SorterConfig::default(), Some(file.as_path()));
        assert!(matches!(result, Err(StartupError::RootNotDirectory { .. })));
    }

    #[test]
    fn test_prepare_uses_config_root_when_no_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let raw = SorterConfig {
            watch_root: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let config = prepare(raw, None).unwrap();
        assert_eq!(config.root(), fs::canonicalize(temp_dir.path()).unwrap());
    }
}
