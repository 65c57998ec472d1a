use regex::Regex;
use tabload_error::{Result, ResultExt};

use crate::dialect::DialectOptions;

/// Values treated as null regardless of column type.
///
/// Mirrors the Arrow C++ CSV defaults.
pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "N/A", "NA", "NULL", "NaN", "n/a", "nan", "null",
];

pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// How loaded data relates to an existing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Initial load. The resolved column types are written back into the
    /// caller's schema mapping.
    #[default]
    Fresh,

    /// Incremental update against an existing table. The caller's schema
    /// mapping is the authority and is left untouched.
    Update,
}

impl LoadMode {
    pub fn from_is_update(is_update: bool) -> Self {
        if is_update {
            LoadMode::Update
        } else {
            LoadMode::Fresh
        }
    }

    pub fn is_update(&self) -> bool {
        matches!(self, LoadMode::Update)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLoadOptions {
    /// Dialect to decode with. Detected from the input when None.
    pub dialect: Option<DialectOptions>,

    /// Exact field values that decode to null.
    pub null_tokens: Vec<String>,

    /// Max number of rows per record batch in the output table.
    pub batch_size: usize,

    /// Number of data records scanned for type inference. All records when
    /// None.
    ///
    /// Values past the scanned records that don't fit the inferred type
    /// fail the load.
    pub max_infer_records: Option<usize>,
}

impl Default for CsvLoadOptions {
    fn default() -> Self {
        CsvLoadOptions {
            dialect: Some(DialectOptions::default()),
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_infer_records: None,
        }
    }
}

impl CsvLoadOptions {
    pub fn with_dialect(mut self, dialect: Option<DialectOptions>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_null_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_infer_records(mut self, max: Option<usize>) -> Self {
        self.max_infer_records = max;
        self
    }

    /// Empty fields are always null.
    pub fn is_null(&self, value: &str) -> bool {
        value.is_empty() || self.null_tokens.iter().any(|t| t == value)
    }

    /// Regex handed to the Arrow decoder. Matches exactly the empty string
    /// and the null tokens, so missing values never reach typed parsers.
    pub(crate) fn null_regex(&self) -> Result<Regex> {
        let mut alternatives = vec![String::new()];
        alternatives.extend(
            self.null_tokens
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| regex::escape(t)),
        );
        let pattern = format!("^(?:{})$", alternatives.join("|"));
        Regex::new(&pattern).context("failed to build null regex")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_regex_matches_tokens_exactly() {
        let opts = CsvLoadOptions::default();
        let re = opts.null_regex().unwrap();

        assert!(re.is_match(""));
        assert!(re.is_match("NA"));
        assert!(re.is_match("#N/A"));
        assert!(re.is_match("-1.#IND"));
        assert!(!re.is_match("NAN"));
        assert!(!re.is_match("NA "));
        assert!(!re.is_match("banana"));
    }

    #[test]
    fn custom_tokens_still_match_empty_string() {
        let opts = CsvLoadOptions::default().with_null_tokens(["-"]);
        let re = opts.null_regex().unwrap();

        assert!(re.is_match(""));
        assert!(re.is_match("-"));
        assert!(!re.is_match("NA"));
        assert!(opts.is_null(""));
        assert!(!opts.is_null("null"));
    }

    #[test]
    fn mode_from_flag() {
        assert_eq!(LoadMode::Update, LoadMode::from_is_update(true));
        assert_eq!(LoadMode::Fresh, LoadMode::from_is_update(false));
        assert!(!LoadMode::default().is_update());
    }
}
