//! Configuration types for the extraction post-processing pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`] or loaded from `pdf-fmt.yaml` by
//! [`crate::settings`]. The config only stores pattern *strings*; every stage
//! compiles its own value objects from them ([`crate::pipeline::filter::LineFilters`],
//! [`crate::pipeline::postprocess::PostProcessor`]) so a worker never depends on
//! state owned by another.
//!
//! Invalid values never abort a run. Each setter that can reject a value logs
//! one warning and keeps the documented default.

use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Default allow-list: ASCII letters, digits, whitespace and printable punctuation.
pub const DEFAULT_CHARS_REGEX: &str = r##"[a-zA-Z0-9\s!"#$%&'()*+,-./:;<=>?@\[\\\]^_`{|}~]+"##;

/// Page-break marker emitted by most text-extraction engines (form feed).
pub const DEFAULT_PAGE_BREAK: char = '\u{000C}';

/// Default percentage above which two images count as the same picture.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 90.0;

/// Default per-image size ceiling in kilobytes.
pub const DEFAULT_MAX_IMAGE_KB: u64 = 300;

/// Configuration for one formatting run.
///
/// Built via [`PipelineConfig::builder()`] or using [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_fmt::{PipelineConfig, PageSeparator, SpellingLocale};
///
/// let config = PipelineConfig::builder()
///     .max_chars_per_line(72)
///     .footer_regexes(vec![r"^\s*\d+\s*$".to_string()])
///     .spelling_locale(SpellingLocale::EnUk)
///     .page_separator(PageSeparator::Literal("___".into()))
///     .build();
/// assert_eq!(config.max_chars_per_line, 72);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Regex whose matches are kept from every raw line; everything else is dropped.
    pub allowed_chars_regex: String,

    /// Footer patterns, matched case-insensitively at the start of the trimmed line.
    pub footer_regexes: Vec<String>,

    /// Spelling dialect to normalise to. Default: [`SpellingLocale::None`].
    pub spelling_locale: SpellingLocale,

    /// Extra US/UK variant table (tab-separated `american<TAB>british`).
    ///
    /// When set, the file must load: an unreadable dictionary aborts the run.
    pub spelling_dictionary: Option<PathBuf>,

    /// Words exempt from spelling normalisation (compared lowercase).
    pub ignore_locale_strings: Vec<String>,

    /// Lines at least this long (in characters) start a new segment. Default: 0.
    pub min_chars_per_line: usize,

    /// Wrap width in characters; 0 disables wrapping. Default: 80.
    pub max_chars_per_line: usize,

    /// Upper-case the first letter of each flushed line. Default: false.
    pub enforce_capitalization: bool,

    /// Separator emitted before every page after the first.
    pub page_separator: PageSeparator,

    /// Ordered enclosure rules applied to the joined document.
    pub regex_enclosures: Vec<EnclosureRule>,

    /// Worker-pool size hint; `None` means "hardware concurrency − 1".
    pub workers: Option<usize>,

    /// Image extraction, deduplication and re-encoding settings.
    pub images: ImageOptions,

    /// Optional progress observer (page and image events).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allowed_chars_regex: DEFAULT_CHARS_REGEX.to_string(),
            footer_regexes: Vec::new(),
            spelling_locale: SpellingLocale::default(),
            spelling_dictionary: None,
            ignore_locale_strings: Vec::new(),
            min_chars_per_line: 0,
            max_chars_per_line: 80,
            enforce_capitalization: false,
            page_separator: PageSeparator::default(),
            regex_enclosures: Vec::new(),
            workers: None,
            images: ImageOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("allowed_chars_regex", &self.allowed_chars_regex)
            .field("footer_regexes", &self.footer_regexes)
            .field("spelling_locale", &self.spelling_locale)
            .field("spelling_dictionary", &self.spelling_dictionary)
            .field("ignore_locale_strings", &self.ignore_locale_strings)
            .field("min_chars_per_line", &self.min_chars_per_line)
            .field("max_chars_per_line", &self.max_chars_per_line)
            .field("enforce_capitalization", &self.enforce_capitalization)
            .field("page_separator", &self.page_separator)
            .field("regex_enclosures", &self.regex_enclosures)
            .field("workers", &self.workers)
            .field("images", &self.images)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn allowed_chars_regex(mut self, pattern: impl Into<String>) -> Self {
        self.config.allowed_chars_regex = pattern.into();
        self
    }

    pub fn footer_regexes(mut self, patterns: Vec<String>) -> Self {
        self.config.footer_regexes = patterns;
        self
    }

    pub fn spelling_locale(mut self, locale: SpellingLocale) -> Self {
        self.config.spelling_locale = locale;
        self
    }

    pub fn spelling_dictionary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.spelling_dictionary = Some(path.into());
        self
    }

    pub fn ignore_locale_strings(mut self, words: Vec<String>) -> Self {
        self.config.ignore_locale_strings = words;
        self
    }

    pub fn min_chars_per_line(mut self, n: usize) -> Self {
        self.config.min_chars_per_line = n;
        self
    }

    pub fn max_chars_per_line(mut self, n: usize) -> Self {
        self.config.max_chars_per_line = n;
        self
    }

    pub fn enforce_capitalization(mut self, v: bool) -> Self {
        self.config.enforce_capitalization = v;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn regex_enclosures(mut self, rules: Vec<EnclosureRule>) -> Self {
        self.config.regex_enclosures = rules;
        self
    }

    /// Worker-pool size hint. Zero is treated as "not configured".
    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = if n == 0 {
            warn!("Worker count 0 is invalid; using hardware concurrency - 1");
            None
        } else {
            Some(n)
        };
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.images.extract = v;
        self
    }

    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images.output_dir = Some(dir.into());
        self
    }

    /// Similarity-discard percentage, 0–100. Out-of-range values keep the default.
    pub fn similarity_threshold(mut self, percent: f64) -> Self {
        if percent.is_finite() && (0.0..=100.0).contains(&percent) {
            self.config.images.similarity_threshold = percent;
        } else {
            warn!(
                "Similarity threshold {} is outside 0-100; using {}",
                percent, DEFAULT_SIMILARITY_THRESHOLD
            );
            self.config.images.similarity_threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }
        self
    }

    /// Candidate output formats in priority order. An empty list keeps the default.
    pub fn image_formats(mut self, formats: Vec<String>) -> Self {
        if formats.is_empty() {
            warn!("Empty image format list; using the default formats");
        } else {
            self.config.images.formats = formats;
        }
        self
    }

    pub fn max_image_kb(mut self, kb: u64) -> Self {
        self.config.images.max_size_kb = kb;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Finish building. Never fails: rejected values were replaced as they were set.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Spelling dialect enforced on surviving lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpellingLocale {
    /// No spelling changes (default).
    #[default]
    None,
    /// American spelling (`en-US`).
    EnUs,
    /// British spelling (`en-UK`).
    EnUk,
}

impl SpellingLocale {
    /// Parse a locale setting case-insensitively; `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(SpellingLocale::None),
            "en-us" | "en_us" => Some(SpellingLocale::EnUs),
            "en-uk" | "en_uk" | "en-gb" | "en_gb" => Some(SpellingLocale::EnUk),
            _ => None,
        }
    }
}

/// What to emit between pages of the formatted output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Pages follow each other directly.
    None,
    /// A fixed marker line, e.g. `___`.
    Literal(String),
    /// A banner carrying the 1-indexed page number: `--- Page N ---`. (default)
    #[default]
    Numbered,
}

impl PageSeparator {
    /// Interpret a config value: `none`, the numbered-banner keywords, or a literal marker.
    pub fn from_setting(s: &str) -> Self {
        match s.trim() {
            "none" | "" => PageSeparator::None,
            "--- PAGE SEPARATOR ---" | "numbered" => PageSeparator::Numbered,
            other => PageSeparator::Literal(other.to_string()),
        }
    }

    /// Separator line for the page at 0-based `index`, if any.
    pub fn render(&self, index: usize) -> Option<String> {
        if index == 0 {
            return None;
        }
        match self {
            PageSeparator::None => None,
            PageSeparator::Literal(s) => Some(s.clone()),
            PageSeparator::Numbered => Some(format!("--- Page {} ---", index + 1)),
        }
    }
}

/// A `{pattern, wrapper}` pair: every match of `pattern` becomes `wrapper + match + wrapper`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosureRule {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub wrapper: String,
}

impl EnclosureRule {
    pub fn new(pattern: impl Into<String>, wrapper: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            wrapper: wrapper.into(),
        }
    }
}

/// Settings for the image side channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    /// Extract images at all. Default: false.
    pub extract: bool,
    /// Directory receiving the images; defaults to `<input stem>_images` beside the input.
    pub output_dir: Option<PathBuf>,
    /// Similarity-discard percentage (0–100). Default: 90.
    pub similarity_threshold: f64,
    /// Output formats tried in order; the last one is the fallback.
    pub formats: Vec<String>,
    /// Size ceiling per encoded image, in KB.
    pub max_size_kb: u64,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            extract: false,
            output_dir: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            formats: vec!["png".to_string(), "jpg".to_string()],
            max_size_kb: DEFAULT_MAX_IMAGE_KB,
        }
    }
}
