//! `pdf-fmt.yaml` discovery and loading.
//!
//! The file is read into a [`serde_yaml::Value`] and every known key is
//! applied to a [`PipelineConfig`] independently: a missing key keeps its
//! default silently, a key of the wrong type keeps its default with one
//! warning. A document that is not valid YAML yields the full default config.
//!
//! ```yaml
//! filters:
//!   allowed_chars_regex: '[a-zA-Z0-9\s.,;:!?()-]+'
//!   footer_regexes: ['\d+\s*$', 'confidential']
//!   linting:
//!     spelling:
//!       enforce_locale: en-UK
//!       dictionary_path: ~/variants.tsv
//!     ignore_locale_strings: [color]
//! formatting:
//!   min_chars_per_line: 0
//!   max_chars_per_line: 80
//!   enforce_line_capitalization: false
//!   page_separator: '--- PAGE SEPARATOR ---'
//!   regex_enclosures:
//!     - { pattern: '\[.*?\]', wrapper: '`' }
//! images:
//!   extract: false
//!   output_dir: ./images
//!   similarity_threshold: 90
//!   formats: [png, jpg]
//!   max_size_kb: 300
//! performance:
//!   cores: 4
//! ```

use crate::config::{EnclosureRule, PageSeparator, PipelineConfig, PipelineConfigBuilder, SpellingLocale};
use crate::error::FmtError;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

pub const CONFIG_FILENAME: &str = "pdf-fmt.yaml";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PDF_FMT_CONFIG_PATH";

/// Locate the config file.
///
/// Order: `$PDF_FMT_CONFIG_PATH`, `<platform config dir>/pdf-fmt/pdf-fmt.yaml`,
/// then `./pdf-fmt.yaml`. The first existing file wins.
pub fn find_config_file() -> Option<PathBuf> {
    let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let user_path = dirs::config_dir().map(|d| d.join("pdf-fmt").join(CONFIG_FILENAME));
    let cwd_path = std::env::current_dir().ok().map(|d| d.join(CONFIG_FILENAME));

    [env_path, user_path, cwd_path]
        .into_iter()
        .flatten()
        .find(|p| p.is_file())
}

/// Read and parse the config file at `path`.
///
/// Only a read failure is an error; parse problems fall back to defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig, FmtError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| FmtError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("Loaded configuration from: {}", path.display());
    Ok(parse_config(&contents))
}

/// Build a config from YAML text.
pub fn parse_config(yaml: &str) -> PipelineConfig {
    let root: Value = match serde_yaml::from_str(yaml) {
        Ok(v) => v,
        Err(e) => {
            warn!("Could not parse configuration ({}); using defaults", e);
            return PipelineConfig::default();
        }
    };
    if !root.is_mapping() {
        if !root.is_null() {
            warn!("Configuration root is not a mapping; using defaults");
        }
        return PipelineConfig::default();
    }
    apply(&root, PipelineConfig::builder()).build()
}

fn apply(root: &Value, mut b: PipelineConfigBuilder) -> PipelineConfigBuilder {
    // ── filters ──
    if let Some(s) = read_string(root, &["filters", "allowed_chars_regex"]) {
        b = b.allowed_chars_regex(s);
    }
    if let Some(v) = read_string_list(root, &["filters", "footer_regexes"]) {
        b = b.footer_regexes(v);
    }
    if let Some(s) = read_string(root, &["filters", "linting", "spelling", "enforce_locale"]) {
        match SpellingLocale::parse(&s) {
            Some(locale) => b = b.spelling_locale(locale),
            None => warn!("Unknown spelling locale '{}'; spelling left unchanged", s),
        }
    }
    if let Some(s) = read_string(root, &["filters", "linting", "spelling", "dictionary_path"]) {
        b = b.spelling_dictionary(expand_home(&s));
    }
    if let Some(v) = read_string_list(root, &["filters", "linting", "ignore_locale_strings"]) {
        b = b.ignore_locale_strings(v);
    }

    // ── formatting ──
    if let Some(n) = read_count(root, &["formatting", "min_chars_per_line"]) {
        b = b.min_chars_per_line(n);
    }
    if let Some(n) = read_count(root, &["formatting", "max_chars_per_line"]) {
        b = b.max_chars_per_line(n);
    }
    if let Some(v) = read_bool(root, &["formatting", "enforce_line_capitalization"]) {
        b = b.enforce_capitalization(v);
    }
    if let Some(s) = read_string(root, &["formatting", "page_separator"]) {
        b = b.page_separator(PageSeparator::from_setting(&s));
    }
    if let Some(rules) = read_enclosures(root, &["formatting", "regex_enclosures"]) {
        b = b.regex_enclosures(rules);
    }

    // ── images ──
    if let Some(v) = read_bool(root, &["images", "extract"]) {
        b = b.extract_images(v);
    }
    if let Some(s) = read_string(root, &["images", "output_dir"]) {
        b = b.image_dir(expand_home(&s));
    }
    if let Some(t) = read_f64(root, &["images", "similarity_threshold"]) {
        b = b.similarity_threshold(t);
    }
    if let Some(v) = read_string_list(root, &["images", "formats"]) {
        b = b.image_formats(v);
    }
    if let Some(n) = read_count(root, &["images", "max_size_kb"]) {
        b = b.max_image_kb(n as u64);
    }

    // ── performance ──
    if let Some(n) = read_count(root, &["performance", "cores"]) {
        b = b.workers(n);
    }
    b
}

// ── Typed lookups ────────────────────────────────────────────────────────────

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, key| node.get(*key))
        .filter(|v| !v.is_null())
}

fn wrong_type(path: &[&str], expected: &str) {
    warn!(
        "Config key '{}' should be {}; using the default",
        path.join("."),
        expected
    );
}

fn read_string(root: &Value, path: &[&str]) -> Option<String> {
    let v = lookup(root, path)?;
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => {
            wrong_type(path, "a string");
            None
        }
    }
}

fn read_bool(root: &Value, path: &[&str]) -> Option<bool> {
    let v = lookup(root, path)?;
    v.as_bool().or_else(|| {
        wrong_type(path, "true or false");
        None
    })
}

fn read_f64(root: &Value, path: &[&str]) -> Option<f64> {
    let v = lookup(root, path)?;
    v.as_f64().or_else(|| {
        wrong_type(path, "a number");
        None
    })
}

/// Non-negative integer; negative values clamp to 0.
fn read_count(root: &Value, path: &[&str]) -> Option<usize> {
    let v = lookup(root, path)?;
    match v.as_i64() {
        Some(n) if n < 0 => {
            warn!("Config key '{}' is negative ({}); using 0", path.join("."), n);
            Some(0)
        }
        Some(n) => Some(n as usize),
        None => {
            wrong_type(path, "an integer");
            None
        }
    }
}

/// List of strings. Non-string entries are dropped with a warning.
fn read_string_list(root: &Value, path: &[&str]) -> Option<Vec<String>> {
    let v = lookup(root, path)?;
    let Some(seq) = v.as_sequence() else {
        wrong_type(path, "a list of strings");
        return None;
    };
    let mut out = Vec::with_capacity(seq.len());
    for item in seq {
        match item {
            Value::String(s) => out.push(s.clone()),
            other => warn!("Ignoring non-string entry {:?} in '{}'", other, path.join(".")),
        }
    }
    Some(out)
}

fn read_enclosures(root: &Value, path: &[&str]) -> Option<Vec<EnclosureRule>> {
    let v = lookup(root, path)?;
    let Some(seq) = v.as_sequence() else {
        wrong_type(path, "a list of {pattern, wrapper} entries");
        return None;
    };
    let rules = seq
        .iter()
        .filter_map(|item| match serde_yaml::from_value::<EnclosureRule>(item.clone()) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!("Ignoring malformed enclosure rule {:?}: {}", item, e);
                None
            }
        })
        .collect();
    Some(rules)
}

fn expand_home(s: &str) -> PathBuf {
    match s.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(s)),
        None => PathBuf::from(s),
    }
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// Reuses a parsed config while the file's modification time is unchanged.
#[derive(Debug, Default)]
pub struct ConfigCache {
    entry: Option<CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    path: PathBuf,
    mtime: SystemTime,
    config: PipelineConfig,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, reusing the cached config if the file has not changed.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<PipelineConfig, FmtError> {
        let path = path.as_ref();
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| FmtError::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            })?;

        if let Some(entry) = &self.entry {
            if entry.path == path && entry.mtime == mtime {
                debug!("Configuration served from cache (mtime unchanged)");
                return Ok(entry.config.clone());
            }
        }

        let config = load_config(path)?;
        self.entry = Some(CacheEntry {
            path: path.to_path_buf(),
            mtime,
            config: config.clone(),
        });
        Ok(config)
    }

    /// Discover the config file and load it; defaults when none exists.
    pub fn load_discovered(&mut self) -> Result<PipelineConfig, FmtError> {
        match find_config_file() {
            Some(path) => self.load(path),
            None => {
                warn!("Configuration file '{}' not found. Using defaults.", CONFIG_FILENAME);
                Ok(PipelineConfig::default())
            }
        }
    }

    pub fn is_warm(&self) -> bool {
        self.entry.is_some()
    }
}
