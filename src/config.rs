//! Configuration loading and the compiled sort configuration.
//!
//! A TOML file is deserialized into [`SorterConfig`], then validated and
//! compiled once into an immutable [`SortConfig`] that every component reads.
//!
//! # Configuration File Format
//!
//! ```toml
//! watch_root = "/home/me/Downloads"
//! scan_on_start = true
//! debounce_ms = 500
//!
//! [destinations]
//! sfx = "Music/Audios"   # relative paths resolve against watch_root
//! music = "Music"
//! general = "/srv/unsorted"
//!
//! [audio]
//! size_threshold = 10000000
//! force_marker = "SFX"
//!
//! # Optional: replaces the built-in table. Array order is priority order.
//! [[rules]]
//! category = "image"
//! extensions = [".jpg", ".png"]
//!
//! [filters]
//! enable_hidden_files = true
//! own_artifacts = ["sort.log"]
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [logging]
//! level = "info"
//! ```

use crate::file_category::{AudioPolicy, Category, Classifier, ExtensionRules};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_NAME: &str = ".autosortrc.toml";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("IO error reading configuration: {0}")]
    IoError(String),

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("No destination configured for category '{0}'")]
    MissingDestination(Category),

    #[error("Empty extension listed for category '{0}'")]
    EmptyExtension(Category),
}

/// Raw configuration as read from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    /// Directory to watch. The CLI argument takes precedence.
    pub watch_root: Option<PathBuf>,

    /// Queue one scan at startup for files already in the root.
    pub scan_on_start: bool,

    /// Settle delay between the first notification of a burst and the scan.
    pub debounce_ms: u64,

    pub destinations: DestinationTable,

    pub audio: AudioPolicy,

    /// Replaces the built-in extension table when present.
    pub rules: Option<Vec<RuleEntry>>,

    pub filters: FilterRules,

    pub logging: LoggingConfig,

    /// File this configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            watch_root: None,
            scan_on_start: true,
            debounce_ms: 500,
            destinations: DestinationTable::default(),
            audio: AudioPolicy::default(),
            rules: None,
            filters: FilterRules::default(),
            logging: LoggingConfig::default(),
            source: None,
        }
    }
}

/// One optional destination per category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationTable {
    pub sfx: Option<PathBuf>,
    pub music: Option<PathBuf>,
    pub video: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub documents: Option<PathBuf>,
    pub programs: Option<PathBuf>,
    pub general: Option<PathBuf>,
    pub compressed: Option<PathBuf>,
    pub adobe: Option<PathBuf>,
}

impl DestinationTable {
    /// A table with no destinations at all.
    pub fn empty() -> Self {
        Self {
            sfx: None,
            music: None,
            video: None,
            image: None,
            documents: None,
            programs: None,
            general: None,
            compressed: None,
            adobe: None,
        }
    }

    fn slot_mut(&mut self, category: Category) -> &mut Option<PathBuf> {
        match category {
            Category::Sfx => &mut self.sfx,
            Category::Music => &mut self.music,
            Category::Video => &mut self.video,
            Category::Image => &mut self.image,
            Category::Documents => &mut self.documents,
            Category::Programs => &mut self.programs,
            Category::General => &mut self.general,
            Category::Compressed => &mut self.compressed,
            Category::Adobe => &mut self.adobe,
        }
    }

    pub fn get(&self, category: Category) -> Option<&Path> {
        let slot = match category {
            Category::Sfx => &self.sfx,
            Category::Music => &self.music,
            Category::Video => &self.video,
            Category::Image => &self.image,
            Category::Documents => &self.documents,
            Category::Programs => &self.programs,
            Category::General => &self.general,
            Category::Compressed => &self.compressed,
            Category::Adobe => &self.adobe,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, category: Category, path: Option<PathBuf>) {
        *self.slot_mut(category) = path;
    }
}

impl Default for DestinationTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for category in Category::ALL {
            table.set(category, Some(PathBuf::from(category.default_dir())));
        }
        table
    }
}

/// A category and its extensions, in a `[[rules]]` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    pub category: Category,
    pub extensions: Vec<String>,
}

/// User filter rules for names the watcher must leave alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Whether to sort hidden files (starting with "."). Defaults to true.
    pub enable_hidden_files: bool,

    /// Extra names owned by the tool (log files, scripts, ...).
    pub own_artifacts: Vec<String>,

    pub exclude: ExcludeRules,

    /// Whitelist overriding `exclude` and the hidden-file rule.
    pub include: IncludeRules,
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Exact filenames to exclude.
    pub filenames: Vec<String>,

    /// Glob patterns matched against the filename.
    pub patterns: Vec<String>,

    /// File extensions to exclude, without the dot.
    pub extensions: Vec<String>,

    /// Regex patterns matched against the filename.
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeRules {
    pub patterns: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: true,
            own_artifacts: Vec::new(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Log verbosity. `RUST_LOG` overrides it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SorterConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.autosortrc.toml` in the current directory
    /// 3. Look for `autosort/config.toml` in the user config directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("autosort").join("config.toml");
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate and compile into the immutable configuration for `root`.
    ///
    /// `root` should already be absolute; relative destinations are joined onto it.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is invalid, an extension is empty, or a
    /// category that has rules (or `general`) has no destination.
    pub fn compile(self, root: PathBuf) -> Result<SortConfig, ConfigError> {
        let rules = match &self.rules {
            Some(entries) => compile_rules(entries)?,
            None => ExtensionRules::builtin(),
        };

        let mut destinations = BTreeMap::new();
        for category in Category::ALL {
            if let Some(path) = self.destinations.get(category) {
                destinations.insert(category, root.join(path));
            }
        }

        let general = destinations
            .get(&Category::General)
            .cloned()
            .ok_or(ConfigError::MissingDestination(Category::General))?;
        if let Some(missing) = rules.categories().find(|c| !destinations.contains_key(c)) {
            return Err(ConfigError::MissingDestination(missing));
        }

        let mut reserved = own_artifact_names(self.source.as_deref());
        reserved.extend(self.filters.own_artifacts.iter().cloned());
        reserved.extend(
            destinations
                .values()
                .filter_map(|path| path.file_name())
                .map(|leaf| leaf.to_string_lossy().into_owned()),
        );
        let skip = SkipSet::new(reserved, &self.filters)?;

        Ok(SortConfig {
            root,
            classifier: Classifier::new(rules, self.audio),
            destinations,
            general,
            skip,
            debounce: Duration::from_millis(self.debounce_ms),
            scan_on_start: self.scan_on_start,
        })
    }
}

fn compile_rules(entries: &[RuleEntry]) -> Result<ExtensionRules, ConfigError> {
    let mut rules = ExtensionRules::empty();
    for entry in entries {
        if entry.extensions.iter().any(|ext| ext.trim().is_empty()) {
            return Err(ConfigError::EmptyExtension(entry.category));
        }
        rules
            .push(entry.category, &entry.extensions)
            .map_err(|e| ConfigError::InvalidGlobPattern(e.msg.to_string()))?;
    }
    Ok(rules)
}

/// Names of files the running tool owns.
fn own_artifact_names(config_source: Option<&Path>) -> HashSet<String> {
    let mut names = HashSet::from([LOCAL_CONFIG_NAME.to_string()]);
    if let Some(exe_name) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
    {
        names.insert(exe_name);
    }
    if let Some(name) = config_source.and_then(Path::file_name) {
        names.insert(name.to_string_lossy().into_owned());
    }
    names
}

/// Immutable configuration shared by every component of a running sorter.
#[derive(Debug, Clone)]
pub struct SortConfig {
    root: PathBuf,
    classifier: Classifier,
    destinations: BTreeMap<Category, PathBuf>,
    general: PathBuf,
    skip: SkipSet,
    debounce: Duration,
    scan_on_start: bool,
}

impl SortConfig {
    /// Defaults for `root`, with no settle delay.
    pub fn with_defaults(root: PathBuf) -> Result<Self, ConfigError> {
        SorterConfig {
            debounce_ms: 0,
            ..SorterConfig::default()
        }
        .compile(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn skip_set(&self) -> &SkipSet {
        &self.skip
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn scan_on_start(&self) -> bool {
        self.scan_on_start
    }

    /// Destination directory for `category`.
    ///
    /// `Music` falls back to the `Sfx` destination when it has none of its own.
    /// Anything else without a destination goes to `General`.
    pub fn destination(&self, category: Category) -> &Path {
        self.destinations
            .get(&category)
            .or_else(|| match category {
                Category::Music => self.destinations.get(&Category::Sfx),
                _ => None,
            })
            .unwrap_or(&self.general)
    }

    /// Every configured destination.
    pub fn destinations(&self) -> impl Iterator<Item = (Category, &Path)> {
        self.destinations
            .iter()
            .map(|(category, path)| (*category, path.as_path()))
    }
}

/// Names excluded from sorting.
///
/// Reserved names (the tool's own files and destination leaf names) are always
/// skipped. User rules are checked in this order, with early termination:
/// 1. Include patterns (whitelist) - if matched, sort it
/// 2. Hidden file filter - if hidden and disabled, skip
/// 3. Exact filename match
/// 4. File extension match
/// 5. Glob pattern match
/// 6. Regex pattern match
#[derive(Debug, Clone)]
pub struct SkipSet {
    reserved: HashSet<String>,
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl SkipSet {
    fn new(reserved: HashSet<String>, rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            reserved,
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Returns true if the entry named `file_name` must not be sorted.
    pub fn should_skip(&self, file_name: &str) -> bool {
        if self.reserved.contains(file_name) {
            return true;
        }

        if self.include_patterns.iter().any(|p| p.matches(file_name)) {
            return false;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return true;
        }

        if self.exclude_filenames.contains(file_name) {
            return true;
        }

        if let Some(ext) = Path::new(file_name).extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return true;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches(file_name)) {
            return true;
        }

        self.exclude_regexes.iter().any(|r| r.is_match(file_name))
    }

    pub fn is_reserved(&self, file_name: &str) -> bool {
        self.reserved.contains(file_name)
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}
