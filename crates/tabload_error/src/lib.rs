use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

pub type Result<T, E = TabloadError> = std::result::Result<T, E>;

/// Broad category of a failure.
///
/// Callers match on the kind to tell bad input apart from bad hints and from
/// bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input had no header row.
    EmptyInput,
    /// Input could not be tokenized, e.g. records with differing field counts.
    Malformed,
    /// Column names or types conflict with each other.
    SchemaConflict,
    /// A value could not be parsed into its column's type.
    InvalidValue,
    /// Requested type or feature is not supported.
    Unsupported,
    Io,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EmptyInput => "empty input",
            Self::Malformed => "malformed csv",
            Self::SchemaConflict => "schema conflict",
            Self::InvalidValue => "invalid value",
            Self::Unsupported => "unsupported",
            Self::Io => "io",
            Self::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct TabloadError {
    inner: Box<TabloadErrorInner>,
}

#[derive(Debug)]
struct TabloadErrorInner {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    backtrace: Backtrace,
}

impl TabloadError {
    /// Create a new internal error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        TabloadError {
            inner: Box::new(TabloadErrorInner {
                kind,
                msg: msg.into(),
                source: None,
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    /// Replace the kind, keeping the message and source.
    pub fn kind_of(mut self, kind: ErrorKind) -> Self {
        self.inner.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn get_msg(&self) -> &str {
        self.inner.msg.as_str()
    }

    pub fn get_backtrace(&self) -> Option<&Backtrace> {
        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            Some(&self.inner.backtrace)
        } else {
            None
        }
    }
}

impl fmt::Display for TabloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind, self.inner.msg)?;
        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }
        if let Some(bt) = self.get_backtrace() {
            write!(f, "\nBacktrace: {bt}")?;
        }
        Ok(())
    }
}

impl Error for TabloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for TabloadError {
    fn from(value: std::io::Error) -> Self {
        TabloadError::with_source("IO error", Box::new(value)).kind_of(ErrorKind::Io)
    }
}

impl From<fmt::Error> for TabloadError {
    fn from(value: fmt::Error) -> Self {
        TabloadError::with_source("Format error", Box::new(value))
    }
}

impl From<std::string::FromUtf8Error> for TabloadError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        TabloadError::with_source("Invalid UTF-8", Box::new(value)).kind_of(ErrorKind::Malformed)
    }
}

/// Return early with an `Unsupported` error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::TabloadError::with_kind(
            $crate::ErrorKind::Unsupported,
            format!("Not yet implemented: {msg}"),
        ));
    }};
}

pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a context string generated from a function.
    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(TabloadError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(TabloadError::with_source(f(), Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(TabloadError::new(format!("Missing required value: {msg}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_source() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        let err = res.context("reading input").unwrap_err();

        assert_eq!("reading input", err.get_msg());
        assert_eq!(ErrorKind::Internal, err.kind());
        assert!(err.source().is_some());
    }

    #[test]
    fn kind_of_overrides_kind() {
        let err = TabloadError::new("bad").kind_of(ErrorKind::InvalidValue);
        assert_eq!(ErrorKind::InvalidValue, err.kind());
        assert!(err.to_string().starts_with("invalid value: bad"));
    }

    #[test]
    fn required_on_none() {
        let err = None::<u8>.required("delimiter").unwrap_err();
        assert_eq!("Missing required value: delimiter", err.get_msg());
    }

    #[test]
    fn not_implemented_is_unsupported() {
        fn unsupported() -> Result<()> {
            not_implemented!("list column {}", 3)
        }

        let err = unsupported().unwrap_err();
        assert_eq!(ErrorKind::Unsupported, err.kind());
        assert_eq!("Not yet implemented: list column 3", err.get_msg());
    }
}
