//! autosort - keep a directory tidy as files arrive
//!
//! This library watches one directory and moves every file that lands there into a
//! category folder chosen by its extension (and, for audio, its size and name),
//! renaming on collisions and creating destination folders on demand.

pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod watcher;

pub use config::{ConfigError, SortConfig, SorterConfig};
pub use error::{StartupError, WatchError};
pub use file_category::{AudioPolicy, Category, Classifier, ExtensionRules};
pub use file_organizer::{FileCandidate, FileOrganizer, MoveRecord, OrganizeError};
pub use watcher::{Dispatcher, FsEventSource, ScanReport, WatchSignal};
