//! Error kinds raised by schema derivation, header reconciliation, field
//! validation and the underlying CSV collaborator.
//!
//! Every message that refers to a row embeds its [`Position`] (`path#line`),
//! the offending column and, where there is one, the offending value.

use std::{collections::BTreeSet, fmt};

use itertools::Itertools;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Stream-relative location of a row, rendered as `path#line`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub path: String,
    pub line: usize,
}

impl Position {
    pub fn new(path: impl Into<String>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.line)
    }
}

#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("there's no column declared in record type [{record}]")]
    Empty { record: String },
    #[error("duplicate column name [{}] in record type [{record}]", bracketed(.names))]
    DuplicateNames {
        record: String,
        names: BTreeSet<String>,
    },
    #[error("column #{index} in record type [{record}] has a blank name")]
    BlankName { record: String, index: usize },
    #[error("column[{column}] in record type [{record}] has an invalid pattern")]
    InvalidPattern {
        record: String,
        column: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{position}: column[{column}] should not be blank")]
    NotNullable { column: String, position: Position },
    #[error("{position}: column[{column}]'s value[{value}] should match regex [{pattern}]")]
    PatternMismatch {
        column: String,
        value: String,
        pattern: String,
        position: Position,
    },
    #[error("{position}: duplicate [{value}] for column[{column}]")]
    DuplicateValue {
        column: String,
        value: String,
        position: Position,
    },
}

impl ValidationError {
    pub fn column(&self) -> &str {
        match self {
            ValidationError::NotNullable { column, .. }
            | ValidationError::PatternMismatch { column, .. }
            | ValidationError::DuplicateValue { column, .. } => column,
        }
    }

    pub fn position(&self) -> &Position {
        match self {
            ValidationError::NotNullable { position, .. }
            | ValidationError::PatternMismatch { position, .. }
            | ValidationError::DuplicateValue { position, .. } => position,
        }
    }
}

/// Every discrepancy found between a schema and a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMismatch {
    pub path: String,
    pub missing: BTreeSet<String>,
    pub duplicate: BTreeSet<String>,
    pub expected: BTreeSet<String>,
    pub actual: Vec<String>,
}

impl fmt::Display for HeaderMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: header mismatch", self.path)?;
        if !self.missing.is_empty() {
            write!(f, "\nmissing header [{}]", bracketed(&self.missing))?;
        }
        if !self.duplicate.is_empty() {
            write!(f, "\nduplicate header [{}]", bracketed(&self.duplicate))?;
        }
        write!(f, "\nexpected [{}]", bracketed(&self.expected))?;
        write!(f, "\nactual [{}]", bracketed(&self.actual))
    }
}

impl std::error::Error for HeaderMismatch {}

/// Row-level failures collected by a bulk read, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowErrors {
    errors: Vec<ValidationError>,
}

impl RowErrors {
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl fmt::Display for RowErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.iter().join("\n"))
    }
}

impl std::error::Error for RowErrors {}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("{path}: this is an empty csv")]
    EmptySource { path: String },
    #[error(transparent)]
    HeaderMismatch(#[from] HeaderMismatch),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Rows(#[from] RowErrors),
    #[error("{path}: session was already closed")]
    SessionClosed { path: String },
    #[error("{position}: failed to decode text with encoding {encoding}")]
    Decode { position: Position, encoding: String },
    #[error("{path}: invalid rules file")]
    Rules {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unknown encoding '{label}'")]
    UnknownEncoding { label: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn bracketed<I>(names: I) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    names.into_iter().join(", ")
}
