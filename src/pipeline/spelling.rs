//! US/UK spelling normalisation.
//!
//! A [`SpellingDictionary`] maps a lowercase word to its spelling in the target
//! dialect. The built-in [`VariantTable`] ships a pair list compiled into the
//! binary and can be extended from a tab-separated file. [`IdentitySpelling`]
//! is used when no dialect is configured.
//!
//! [`SpellingNormalizer`] applies a dictionary token by token, carrying the
//! original casing over to the replacement, then collapses whitespace runs.

use crate::config::{PipelineConfig, SpellingLocale};
use crate::error::FmtError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z]").unwrap());
static SUCCESSIVE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

const BUILTIN_VARIANTS: &str = include_str!("../../data/spelling_variants.tsv");

/// Looks up the dialect spelling of a single lowercase word.
///
/// Implementations return the input unchanged when they have no entry for it.
pub trait SpellingDictionary: Send + Sync {
    fn lookup(&self, word: &str, locale: SpellingLocale) -> String;
}

/// Pass-through dictionary.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentitySpelling;

impl SpellingDictionary for IdentitySpelling {
    fn lookup(&self, word: &str, _locale: SpellingLocale) -> String {
        word.to_string()
    }
}

/// Bidirectional American/British word table.
#[derive(Debug, Default, Clone)]
pub struct VariantTable {
    to_british: HashMap<String, String>,
    to_american: HashMap<String, String>,
}

impl VariantTable {
    /// The table compiled into the crate.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        table.extend_from_str(BUILTIN_VARIANTS);
        table
    }

    /// Add `american<TAB>british` pairs. Blank lines and `#` comments are
    /// ignored, as are lines without exactly two columns. Returns the number
    /// of pairs added.
    pub fn extend_from_str(&mut self, contents: &str) -> usize {
        let mut added = 0;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split('\t').map(str::trim).filter(|c| !c.is_empty());
            let (Some(us), Some(uk), None) = (cols.next(), cols.next(), cols.next()) else {
                debug!("Ignoring malformed spelling variant line: {:?}", line);
                continue;
            };
            let us = us.to_lowercase();
            let uk = uk.to_lowercase();
            self.to_british.insert(us.clone(), uk.clone());
            self.to_american.insert(uk, us);
            added += 1;
        }
        added
    }

    /// Extend the table from a TSV file on disk.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize, FmtError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| FmtError::SpellingUnavailable {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        Ok(self.extend_from_str(&contents))
    }

    /// Number of American→British pairs.
    pub fn len(&self) -> usize {
        self.to_british.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_british.is_empty()
    }
}

impl SpellingDictionary for VariantTable {
    fn lookup(&self, word: &str, locale: SpellingLocale) -> String {
        let table = match locale {
            SpellingLocale::EnUk => &self.to_british,
            SpellingLocale::EnUs => &self.to_american,
            SpellingLocale::None => return word.to_string(),
        };
        table.get(word).cloned().unwrap_or_else(|| word.to_string())
    }
}

/// Choose the dictionary for a run.
///
/// Locale `none` gets [`IdentitySpelling`]. Otherwise the built-in table is
/// used, extended by `spelling_dictionary` when one is configured; a
/// configured file that cannot be read is fatal.
pub fn select_dictionary(config: &PipelineConfig) -> Result<Arc<dyn SpellingDictionary>, FmtError> {
    if config.spelling_locale == SpellingLocale::None {
        return Ok(Arc::new(IdentitySpelling));
    }

    let mut table = VariantTable::builtin();
    if let Some(path) = &config.spelling_dictionary {
        let added = table.extend_from_file(path)?;
        info!("Loaded {} spelling variants from {}", added, path.display());
    }
    debug!(
        "Spelling normalisation to {:?} with {} variant pairs",
        config.spelling_locale,
        table.len()
    );
    Ok(Arc::new(table))
}

/// Apply the casing of `original` to `converted`.
///
/// All-uppercase originals give an uppercase result, title-case originals a
/// capitalised one; anything else returns `converted` as is.
pub fn preserve_case(original: &str, converted: &str) -> String {
    if original.is_empty() || converted.is_empty() {
        return converted.to_string();
    }

    let has_cased = original.chars().any(char::is_alphabetic);
    if has_cased && !original.chars().any(char::is_lowercase) {
        return converted.to_uppercase();
    }

    let mut orig = original.chars();
    let first_upper = orig.next().is_some_and(char::is_uppercase);
    let rest: String = orig.collect();
    let rest_lower = rest.chars().any(char::is_alphabetic) && !rest.chars().any(char::is_uppercase);
    if first_upper && rest_lower {
        let mut chars = converted.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        };
    }

    converted.to_string()
}

/// Collapse every run of two or more whitespace characters to one space, then trim.
pub fn replace_successive_spaces(text: &str) -> String {
    SUCCESSIVE_SPACES.replace_all(text, " ").trim().to_string()
}

/// Per-run spelling state shared by every page worker.
#[derive(Clone)]
pub struct SpellingNormalizer {
    locale: SpellingLocale,
    ignore: HashSet<String>,
    dictionary: Arc<dyn SpellingDictionary>,
}

impl SpellingNormalizer {
    pub fn new(
        locale: SpellingLocale,
        ignore_locale_strings: &[String],
        dictionary: Arc<dyn SpellingDictionary>,
    ) -> Self {
        Self {
            locale,
            ignore: ignore_locale_strings.iter().map(|s| s.to_lowercase()).collect(),
            dictionary,
        }
    }

    /// Normaliser that only collapses whitespace.
    pub fn disabled() -> Self {
        Self::new(SpellingLocale::None, &[], Arc::new(IdentitySpelling))
    }

    /// Spelling pass (when a dialect is set) followed by whitespace collapsing.
    pub fn clean_and_lint(&self, text: &str) -> String {
        if self.locale == SpellingLocale::None {
            return replace_successive_spaces(text);
        }
        replace_successive_spaces(&self.enforce_spelling(text))
    }

    /// Rewrite every whitespace-separated token into the configured dialect.
    pub fn enforce_spelling(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|token| self.process_token(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn process_token(&self, token: &str) -> String {
        let clean = NON_ALPHA.replace_all(token, "");
        if clean.is_empty() {
            return token.to_string();
        }

        let key = clean.to_lowercase();
        if self.ignore.contains(&key) {
            return token.to_string();
        }

        let converted = self.dictionary.lookup(&key, self.locale);
        let cased = preserve_case(&clean, &converted);
        token.replacen(clean.as_ref(), &cased, 1)
    }
}

impl std::fmt::Debug for SpellingNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpellingNormalizer")
            .field("locale", &self.locale)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn normalizer(locale: SpellingLocale, ignore: &[&str]) -> SpellingNormalizer {
        let ignore: Vec<String> = ignore.iter().map(|s| s.to_string()).collect();
        SpellingNormalizer::new(locale, &ignore, Arc::new(VariantTable::builtin()))
    }

    #[test]
    fn preserve_case_variants() {
        assert_eq!(preserve_case("COLOR", "colour"), "COLOUR");
        assert_eq!(preserve_case("Color", "colour"), "Colour");
        assert_eq!(preserve_case("cOlOr", "colour"), "colour");
        assert_eq!(preserve_case("color", "colour"), "colour");
        assert_eq!(preserve_case("", "colour"), "colour");
    }

    #[test]
    fn uk_spelling_respects_ignore_list() {
        let n = normalizer(SpellingLocale::EnUk, &["filter", "connection"]);
        assert_eq!(
            n.clean_and_lint("This is a great Color, organization, filter, and connection."),
            "This is a great Colour, organisation, filter, and connection."
        );
    }

    #[test]
    fn us_spelling() {
        let n = normalizer(SpellingLocale::EnUs, &[]);
        assert_eq!(
            n.clean_and_lint("This is a great colour and organisation."),
            "This is a great color and organization."
        );
    }

    #[test]
    fn locale_none_only_collapses_whitespace() {
        let n = normalizer(SpellingLocale::None, &[]);
        assert_eq!(
            n.clean_and_lint("  This is a great   colour and organization. "),
            "This is a great colour and organization."
        );
    }

    #[test]
    fn ignore_list_is_case_insensitive() {
        let n = normalizer(SpellingLocale::EnUk, &["COLOR"]);
        assert_eq!(n.enforce_spelling("color center"), "color centre");
    }

    #[test]
    fn unknown_word_keeps_original_token() {
        let n = normalizer(SpellingLocale::EnUk, &[]);
        assert_eq!(n.enforce_spelling("Rust-lang v1.88"), "Rust-lang v1.88");
        assert_eq!(n.enforce_spelling("(COLOR)"), "(COLOUR)");
    }

    #[test]
    fn mixed_case_tokens_take_the_lookup_casing() {
        let n = normalizer(SpellingLocale::EnUk, &[]);
        assert_eq!(n.enforce_spelling("iPhone McDonald ABCs"), "iphone mcdonald abcs");
        assert_eq!(n.enforce_spelling("Paris, LONDON"), "Paris, LONDON");
    }

    #[test]
    fn tokens_without_letters_pass_through() {
        let n = normalizer(SpellingLocale::EnUk, &[]);
        assert_eq!(n.enforce_spelling("42 -- 3.14"), "42 -- 3.14");
    }

    #[test]
    fn variant_table_parses_tsv() {
        let mut t = VariantTable::default();
        let added = t.extend_from_str("# comment\nfoo\tfoe\n\nbad line\nbar\tbaa\textra\n");
        assert_eq!(added, 1);
        assert_eq!(t.lookup("foo", SpellingLocale::EnUk), "foe");
        assert_eq!(t.lookup("foe", SpellingLocale::EnUs), "foo");
        assert_eq!(t.lookup("bar", SpellingLocale::EnUk), "bar");
    }

    #[test]
    fn builtin_table_has_common_pairs() {
        let t = VariantTable::builtin();
        assert!(t.len() > 100);
        assert_eq!(t.lookup("organization", SpellingLocale::EnUk), "organisation");
        assert_eq!(t.lookup("colour", SpellingLocale::EnUs), "color");
        assert_eq!(t.lookup("colour", SpellingLocale::None), "colour");
    }

    #[test]
    fn select_dictionary_extends_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gotten\tgot").unwrap();
        let config = PipelineConfig::builder()
            .spelling_locale(SpellingLocale::EnUk)
            .spelling_dictionary(file.path())
            .build();
        let dict = select_dictionary(&config).unwrap();
        assert_eq!(dict.lookup("gotten", SpellingLocale::EnUk), "got");
        assert_eq!(dict.lookup("color", SpellingLocale::EnUk), "colour");
    }

    #[test]
    fn select_dictionary_missing_file_is_fatal() {
        let config = PipelineConfig::builder()
            .spelling_locale(SpellingLocale::EnUs)
            .spelling_dictionary("/nonexistent/pdf-fmt/variants.tsv")
            .build();
        let err = select_dictionary(&config).err().unwrap();
        assert!(matches!(err, FmtError::SpellingUnavailable { .. }));
    }

    #[test]
    fn select_dictionary_none_ignores_missing_file() {
        let config = PipelineConfig::builder()
            .spelling_dictionary("/nonexistent/pdf-fmt/variants.tsv")
            .build();
        let dict = select_dictionary(&config).unwrap();
        assert_eq!(dict.lookup("color", SpellingLocale::EnUk), "color");
    }
}
