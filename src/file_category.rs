/// File categorization by filename suffix.
///
/// Maps a filename and its size to one of the destination categories. Rules are
/// an explicit ordered list: the first category whose suffix list matches wins,
/// so an extension listed twice resolves to the category enumerated earlier.
///
/// # Examples
///
/// ```
/// use autosort::file_category::{Category, Classifier};
///
/// let classifier = Classifier::default();
/// assert_eq!(classifier.classify("report.final.pdf", 1_024), Category::Documents);
/// assert_eq!(classifier.classify("beep.wav", 20_000), Category::Sfx);
/// assert_eq!(classifier.classify("album.flac", 40_000_000), Category::Music);
/// assert_eq!(classifier.classify("notes.xyz", 10), Category::General);
/// ```
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination category for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Short audio clips and sound effects
    Sfx,
    /// Long audio files
    Music,
    /// Video files (MP4, MKV, AVI, etc.)
    Video,
    /// Image files (PNG, JPG, GIF, etc.)
    Image,
    /// Office documents and plain text
    Documents,
    /// Installers and executables
    Programs,
    /// Anything no rule matched
    General,
    /// Archives (ZIP, RAR, 7Z, etc.)
    Compressed,
    /// Adobe project files
    Adobe,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 9] = [
        Category::Sfx,
        Category::Music,
        Category::Video,
        Category::Image,
        Category::Documents,
        Category::Programs,
        Category::General,
        Category::Compressed,
        Category::Adobe,
    ];

    /// Returns the lowercase tag used in configuration and log records.
    ///
    /// # Examples
    ///
    /// ```
    /// use autosort::file_category::Category;
    ///
    /// assert_eq!(Category::Sfx.name(), "sfx");
    /// assert_eq!(Category::Compressed.name(), "compressed");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            Category::Sfx => "sfx",
            Category::Music => "music",
            Category::Video => "video",
            Category::Image => "image",
            Category::Documents => "documents",
            Category::Programs => "programs",
            Category::General => "general",
            Category::Compressed => "compressed",
            Category::Adobe => "adobe",
        }
    }

    /// Returns the default destination, relative to the watched root.
    pub fn default_dir(&self) -> &'static str {
        match self {
            Category::Sfx => "Music/Audios",
            Category::Music => "Music",
            Category::Video => "Videos",
            Category::Image => "Pictures",
            Category::Documents => "Documents",
            Category::Programs => "Programs",
            Category::General => "General",
            Category::Compressed => "Compressed",
            Category::Adobe => "AdobeSaved",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in rule table in priority order.
const BUILTIN_RULES: &[(Category, &[&str])] = &[
    (
        Category::Sfx,
        &[".m4a", ".flac", ".mp3", ".wav", ".wma", ".aac"],
    ),
    (
        Category::Video,
        &[
            ".webm", ".mpg", ".mp2", ".mpeg", ".mpe", ".mpv", ".ogg", ".mp4", ".mp4v", ".m4v",
            ".avi", ".wmv", ".mov", ".qt", ".flv", ".swf", ".avchd", ".mkv", ".ts",
        ],
    ),
    (
        Category::Image,
        &[
            ".jpg", ".jpeg", ".jpe", ".jif", ".jfif", ".jfi", ".png", ".gif", ".webp", ".tiff",
            ".tif", ".raw", ".arw", ".cr2", ".nrw", ".k25", ".bmp", ".dib", ".heif", ".heic",
            ".ind", ".indd", ".indt", ".jp2", ".j2k", ".jpf", ".jpx", ".jpm", ".mj2", ".svg",
            ".svgz", ".ai", ".eps", ".ico",
        ],
    ),
    (
        Category::Documents,
        &[
            ".doc", ".docx", ".odt", ".pdf", ".xls", ".xlsx", ".ppt", ".pptx", ".csv", ".txt",
            ".xml", ".json", ".ods",
        ],
    ),
    (
        Category::Compressed,
        &[
            ".zip", ".rar", ".r0*", ".r1*", ".arj", ".gz", ".sit", ".sitx", ".sea", ".ace",
            ".bz2", ".7z", ".tgz",
        ],
    ),
    (Category::Adobe, &[".aep", ".psd", ".ai", ".prproj"]),
    (Category::Programs, &[".exe", ".msi"]),
];

/// Matches one registered extension against the end of a lowercased filename.
///
/// A wildcard only ever sees the final extension, so `.r0*` matches
/// `movie.r01` but not `config.r10.yaml`.
#[derive(Debug, Clone)]
enum SuffixMatcher {
    Literal(String),
    Wildcard(Pattern),
}

impl SuffixMatcher {
    fn parse(extension: &str) -> Result<Self, glob::PatternError> {
        let extension = extension.to_lowercase();
        if extension.contains(['*', '?', '[']) {
            Pattern::new(&extension).map(SuffixMatcher::Wildcard)
        } else {
            Ok(SuffixMatcher::Literal(extension))
        }
    }

    fn matches(&self, lowercase_name: &str) -> bool {
        match self {
            SuffixMatcher::Literal(suffix) => lowercase_name.ends_with(suffix.as_str()),
            SuffixMatcher::Wildcard(pattern) => lowercase_name
                .rfind('.')
                .is_some_and(|dot| pattern.matches(&lowercase_name[dot..])),
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    category: Category,
    matchers: Vec<SuffixMatcher>,
}

/// Ordered extension rule table.
///
/// Matching is case-insensitive and by suffix, so `report.final.PDF` matches
/// `.pdf`. Entries containing glob metacharacters (`.r0*`) are matched as a
/// wildcard suffix.
#[derive(Debug, Clone)]
pub struct ExtensionRules {
    rules: Vec<Rule>,
}

impl ExtensionRules {
    /// Creates an empty table. Every name classifies as `General` against it.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Creates the built-in table.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (category, extensions) in BUILTIN_RULES {
            let matchers = extensions
                .iter()
                .filter_map(|ext| SuffixMatcher::parse(ext).ok())
                .collect();
            table.rules.push(Rule {
                category: *category,
                matchers,
            });
        }
        table
    }

    /// Appends a category with its extensions at the lowest priority.
    ///
    /// # Errors
    ///
    /// Returns the offending pattern error if a wildcard extension is malformed.
    pub fn push<S: AsRef<str>>(
        &mut self,
        category: Category,
        extensions: &[S],
    ) -> Result<(), glob::PatternError> {
        let matchers = extensions
            .iter()
            .map(|ext| SuffixMatcher::parse(ext.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.rules.push(Rule { category, matchers });
        Ok(())
    }

    /// Categories in priority order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.rules.iter().map(|rule| rule.category)
    }

    /// Returns the first category whose suffix list matches `name`.
    pub fn match_category(&self, name: &str) -> Option<Category> {
        let lowercase_name = name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matchers.iter().any(|m| m.matches(&lowercase_name)))
            .map(|rule| rule.category)
    }

    #[cfg(test)]
    fn extension_count(&self) -> usize {
        self.rules.iter().map(|rule| rule.matchers.len()).sum()
    }
}

impl Default for ExtensionRules {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Policy splitting audio between `Sfx` and `Music`.
///
/// A file matched by the `Sfx` rules stays `Sfx` when it is smaller than
/// `size_threshold` bytes or its name contains `force_marker` (case-sensitive).
/// Everything else is `Music`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioPolicy {
    pub size_threshold: u64,
    pub force_marker: String,
}

impl Default for AudioPolicy {
    fn default() -> Self {
        Self {
            size_threshold: 10_000_000,
            force_marker: "SFX".to_string(),
        }
    }
}

impl AudioPolicy {
    /// Returns true if an sfx-extension file should stay in `Sfx`.
    pub fn keeps_sfx(&self, name: &str, size_bytes: u64) -> bool {
        size_bytes < self.size_threshold
            || (!self.force_marker.is_empty() && name.contains(self.force_marker.as_str()))
    }
}

/// Maps a filename and size to a category.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: ExtensionRules,
    audio: AudioPolicy,
}

impl Classifier {
    pub fn new(rules: ExtensionRules, audio: AudioPolicy) -> Self {
        Self { rules, audio }
    }

    pub fn rules(&self) -> &ExtensionRules {
        &self.rules
    }

    /// Classifies a file.
    ///
    /// Any `(n)` suffix left by collision renaming is irrelevant here: only the
    /// trailing extension and the size take part.
    pub fn classify(&self, name: &str, size_bytes: u64) -> Category {
        match self.rules.match_category(name) {
            Some(Category::Sfx) if !self.audio.keeps_sfx(name, size_bytes) => Category::Music,
            Some(category) => category,
            None => Category::General,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1_000_000;

    #[test]
    fn test_category_names() {
        assert_eq!(Category::Sfx.name(), "sfx");
        assert_eq!(Category::Music.name(), "music");
        assert_eq!(Category::Video.name(), "video");
        assert_eq!(Category::Image.name(), "image");
        assert_eq!(Category::Documents.name(), "documents");
        assert_eq!(Category::Programs.name(), "programs");
        assert_eq!(Category::General.name(), "general");
        assert_eq!(Category::Compressed.name(), "compressed");
        assert_eq!(Category::Adobe.name(), "adobe");
    }

    #[test]
    fn test_builtin_table_compiles_every_extension() {
        let expected: usize = BUILTIN_RULES.iter().map(|(_, exts)| exts.len()).sum();
        assert_eq!(ExtensionRules::builtin().extension_count(), expected);
    }

    #[test]
    fn test_builtin_priority_order() {
        let order: Vec<_> = ExtensionRules::builtin().categories().collect();
        assert_eq!(
            order,
            vec![
                Category::Sfx,
                Category::Video,
                Category::Image,
                Category::Documents,
                Category::Compressed,
                Category::Adobe,
                Category::Programs,
            ]
        );
    }

    #[test]
    fn test_non_audio_ignores_size() {
        let classifier = Classifier::default();
        for size in [0, 5 * MB, 500 * MB] {
            assert_eq!(classifier.classify("clip.mkv", size), Category::Video);
            assert_eq!(classifier.classify("photo.jpg", size), Category::Image);
            assert_eq!(classifier.classify("setup.exe", size), Category::Programs);
            assert_eq!(classifier.classify("backup.7z", size), Category::Compressed);
            assert_eq!(classifier.classify("intro.aep", size), Category::Adobe);
        }
    }

    #[test]
    fn test_suffix_not_exact_match() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("report.final.pdf", 1), Category::Documents);
        assert_eq!(classifier.classify("archive.tar.gz", 1), Category::Compressed);
    }

    #[test]
    fn test_extension_case_insensitive() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("PHOTO.JPG", 1), Category::Image);
        assert_eq!(classifier.classify("Report.Pdf", 1), Category::Documents);
    }

    #[test]
    fn test_sfx_size_threshold() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("track.mp3", 5 * MB), Category::Sfx);
        assert_eq!(classifier.classify("track.mp3", 10 * MB - 1), Category::Sfx);
        assert_eq!(classifier.classify("track.mp3", 10 * MB), Category::Music);
        assert_eq!(classifier.classify("track.mp3", 15 * MB), Category::Music);
    }

    #[test]
    fn test_sfx_marker_is_case_sensitive() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("boom SFX.wav", 50 * MB), Category::Sfx);
        assert_eq!(classifier.classify("boom sfx.wav", 50 * MB), Category::Music);
    }

    #[test]
    fn test_unmatched_is_general() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("notes.xyz", 10), Category::General);
        assert_eq!(classifier.classify("Makefile", 10), Category::General);
    }

    #[test]
    fn test_duplicate_extension_first_category_wins() {
        let classifier = Classifier::default();
        // `.ai` is registered under both image and adobe
        assert_eq!(classifier.classify("logo.ai", 1), Category::Image);
    }

    #[test]
    fn test_wildcard_extension() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("movie.r01", 1), Category::Compressed);
        assert_eq!(classifier.classify("movie.R15", 1), Category::Compressed);
        assert_eq!(classifier.classify("movie.r2", 1), Category::General);
    }

    #[test]
    fn test_wildcard_stops_at_final_extension() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("config.r10.yaml", 1), Category::General);
        assert_eq!(classifier.classify("notes.r0 draft.xyz", 1), Category::General);
        assert_eq!(classifier.classify("backup.tar.r00", 1), Category::Compressed);
    }

    #[test]
    fn test_collision_suffix_is_ignored() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("photo (1).jpg", 1), Category::Image);
        assert_eq!(classifier.classify("notes (3).pdf", 1), Category::Documents);
    }

    #[test]
    fn test_custom_rules_and_policy() {
        let mut rules = ExtensionRules::empty();
        rules.push(Category::Documents, &[".md"]).unwrap();
        rules.push(Category::Sfx, &[".ogg"]).unwrap();
        let policy = AudioPolicy {
            size_threshold: 100,
            force_marker: "[fx]".to_string(),
        };
        let classifier = Classifier::new(rules, policy);

        assert_eq!(classifier.classify("README.MD", 1), Category::Documents);
        assert_eq!(classifier.classify("hit.ogg", 99), Category::Sfx);
        assert_eq!(classifier.classify("hit.ogg", 100), Category::Music);
        assert_eq!(classifier.classify("hit [fx].ogg", 100), Category::Sfx);
        assert_eq!(classifier.classify("photo.jpg", 1), Category::General);
    }

    #[test]
    fn test_empty_marker_never_forces_sfx() {
        let policy = AudioPolicy {
            size_threshold: 10,
            force_marker: String::new(),
        };
        assert!(!policy.keeps_sfx("anything.mp3", 10));
        assert!(policy.keeps_sfx("anything.mp3", 9));
    }

    #[test]
    fn test_invalid_wildcard_rejected() {
        let mut rules = ExtensionRules::empty();
        assert!(rules.push(Category::General, &[".[x"]).is_err());
    }
}
