//! Per-field column metadata and the compiled rule it resolves to.
//!
//! [`ColumnAttrs`] is what a record declares for one field; [`ColumnRule`] is
//! the immutable contract a [`Schema`](crate::schema::Schema) holds once the
//! column name has been resolved and the pattern compiled.

use std::fmt;

use regex::Regex;

use crate::error::SchemaError;

pub const MATCH_ANYTHING: &str = ".*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAttrs {
    name: Option<String>,
    nullable: bool,
    unique: bool,
    matches: String,
    trim: bool,
}

impl Default for ColumnAttrs {
    fn default() -> Self {
        Self {
            name: None,
            nullable: true,
            unique: false,
            matches: MATCH_ANYTHING.to_string(),
            trim: true,
        }
    }
}

impl ColumnAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column name to use instead of the field identifier.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|name| !name.is_empty());
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn matches(mut self, pattern: impl Into<String>) -> Self {
        self.matches = pattern.into();
        self
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn resolved_name<'a>(&'a self, ident: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(ident)
    }

    pub fn compile(&self, ident: &str, record: &str) -> Result<ColumnRule, SchemaError> {
        let name = self.resolved_name(ident).to_string();
        let pattern = Pattern::compile(&self.matches).map_err(|source| {
            SchemaError::InvalidPattern {
                record: record.to_string(),
                column: name.clone(),
                source,
            }
        })?;
        Ok(ColumnRule {
            name,
            nullable: self.nullable,
            unique: self.unique,
            pattern,
            trim: self.trim,
        })
    }
}

/// Full-match constraint on a normalized value.
#[derive(Debug, Clone)]
pub enum Pattern {
    Any,
    Regex { source: String, regex: Regex },
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        if source == MATCH_ANYTHING {
            return Ok(Pattern::Any);
        }
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Pattern::Regex {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Pattern::Any)
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Regex { regex, .. } => regex.is_match(value),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Any => MATCH_ANYTHING,
            Pattern::Regex { source, .. } => source,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRule {
    name: String,
    nullable: bool,
    unique: bool,
    pattern: Pattern,
    trim: bool,
}

impl ColumnRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn unique(&self) -> bool {
        self.unique
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn trim(&self) -> bool {
        self.trim
    }
}
