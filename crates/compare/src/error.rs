use std::fmt;

use crate::key::KeyScheme;

/// Broad category of a [`CompareError`], used by callers to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Config,
    Schema,
    Io,
    Interrupted,
    Logic,
}

#[derive(Debug)]
pub enum CompareError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing locator, duplicate table, etc.).
    ConfigValidation(String),
    /// Two tables built under different key schemes were combined.
    SchemeMismatch { expected: KeyScheme, found: KeyScheme },
    /// Required column absent from a dataset's header.
    MissingColumn { dataset: String, column: String },
    /// Column value does not parse into the column's type.
    ColumnType { dataset: String, file: String, column: String, row: usize, value: String },
    /// Data row whose field count differs from the header's.
    RowLength { dataset: String, file: String, row: usize, expected: usize, found: usize },
    /// Files of one dataset disagree on their header.
    HeaderMismatch { dataset: String, file: String },
    /// Dataset source or output destination could not be read/written.
    Io(String),
    /// Loading was cancelled through a [`crate::source::CancelToken`].
    Cancelled { dataset: String },
    /// Loading exceeded its deadline.
    TimedOut { dataset: String },
    /// Internal invariant violation in the reducer/matcher.
    Logic(String),
}

impl CompareError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::SchemeMismatch { .. } => {
                ErrorClass::Config
            }
            Self::MissingColumn { .. }
            | Self::ColumnType { .. }
            | Self::RowLength { .. }
            | Self::HeaderMismatch { .. } => {
                ErrorClass::Schema
            }
            Self::Io(_) => ErrorClass::Io,
            Self::Cancelled { .. } | Self::TimedOut { .. } => ErrorClass::Interrupted,
            Self::Logic(_) => ErrorClass::Logic,
        }
    }
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SchemeMismatch { expected, found } => {
                write!(f, "key scheme mismatch: expected {expected}, found {found}")
            }
            Self::MissingColumn { dataset, column } => {
                write!(f, "dataset '{dataset}': missing column '{column}'")
            }
            Self::ColumnType { dataset, file, column, row, value } => {
                write!(f, "dataset '{dataset}', {file} row {row}: cannot parse {column} '{value}'")
            }
            Self::RowLength { dataset, file, row, expected, found } => write!(
                f,
                "dataset '{dataset}', {file} row {row}: expected {expected} fields, found {found}"
            ),
            Self::HeaderMismatch { dataset, file } => {
                write!(f, "dataset '{dataset}': header of {file} differs from the first file")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Cancelled { dataset } => write!(f, "loading '{dataset}' was cancelled"),
            Self::TimedOut { dataset } => write!(f, "loading '{dataset}' timed out"),
            Self::Logic(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CompareError {}
