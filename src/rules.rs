//! Column rules loaded at runtime from a YAML file, bound to [`DynamicRow`].
//!
//! ```yaml
//! name: words
//! columns:
//!   - name: hanzi
//!     nullable: false
//!     unique: true
//!   - name: number-pinyin
//!     matches: "[a-z0-4\\-]+"
//!     trim: false
//! ```

use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    column::{ColumnAttrs, MATCH_ANYTHING},
    error::{Error, Result, SchemaError},
    schema::{Declaration, Record, Schema},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default = "default_matches")]
    pub matches: String,
    #[serde(default = "default_true")]
    pub trim: bool,
}

fn default_true() -> bool {
    true
}

fn default_matches() -> String {
    MATCH_ANYTHING.to_string()
}

impl ColumnConfig {
    pub fn attrs(&self) -> ColumnAttrs {
        ColumnAttrs::new()
            .name(self.name.as_str())
            .nullable(self.nullable)
            .unique(self.unique)
            .matches(self.matches.as_str())
            .trim(self.trim)
    }
}

impl RuleSet {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| Error::Rules {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|source| Error::Rules {
            path: "<inline>".to_string(),
            source,
        })
    }

    /// Compiles the rules into a schema over [`DynamicRow`].
    pub fn to_schema(&self) -> Result<Arc<Schema<DynamicRow>>, SchemaError> {
        let mut declaration = Declaration::new(self.name.as_deref().unwrap_or("rules"));
        for column in &self.columns {
            let read_key = column.name.clone();
            let write_key = column.name.clone();
            declaration.column(
                &column.name,
                column.attrs(),
                move |row: &DynamicRow| row.get(&read_key).map(str::to_string),
                move |row: &mut DynamicRow, value| row.set(&write_key, value),
            );
        }
        Schema::derive(declaration).map(Arc::new)
    }
}

/// A record whose fields are addressed by column name.
///
/// Render it with [`Schema::render`], which lists every schema column and
/// shows unset ones as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicRow {
    line: usize,
    values: Vec<(String, String)>,
}

impl DynamicRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.set(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, column: &str, value: String) {
        match self.values.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column.to_string(), value)),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl Record for DynamicRow {
    fn at_line(line: usize) -> Self {
        Self {
            line,
            values: Vec::new(),
        }
    }

    fn line(&self) -> usize {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Position,
        header::HeaderIndex,
        mapper::{RawRow, populate},
        validate::UniquenessTracker,
    };

    const RULES: &str = r#"
name: words
columns:
  - name: hanzi
    nullable: false
    unique: true
  - name: number-pinyin
    matches: "[a-z0-4\\-]+"
    trim: false
"#;

    #[test]
    fn yaml_rules_fill_in_column_defaults() {
        let rules = RuleSet::from_yaml_str(RULES).expect("rules");
        assert_eq!(rules.name.as_deref(), Some("words"));
        let hanzi = &rules.columns[0];
        assert!(!hanzi.nullable);
        assert!(hanzi.unique);
        assert_eq!(hanzi.matches, ".*");
        assert!(hanzi.trim);
        let pinyin = &rules.columns[1];
        assert_eq!(pinyin.matches, "[a-z0-4\\-]+");
        assert!(!pinyin.trim);
    }

    #[test]
    fn rules_compile_into_a_schema_over_dynamic_rows() {
        let schema = RuleSet::from_yaml_str(RULES)
            .expect("rules")
            .to_schema()
            .expect("schema");
        assert_eq!(schema.record_type(), "words");
        assert_eq!(schema.header_row(), vec!["hanzi", "number-pinyin"]);

        let headers = vec!["number-pinyin".to_string(), "hanzi".to_string()];
        let index = HeaderIndex::reconcile(&schema, &headers, "words.csv").expect("headers");
        let fields = vec!["ni3-hao3".to_string(), " 你好 ".to_string()];
        let tracker = UniquenessTracker::new();
        let (row, _) = populate(
            &RawRow::new(&index, &fields),
            &schema,
            &tracker,
            &Position::new("words.csv", 2),
        )
        .expect("row");
        assert_eq!(row.get("hanzi"), Some("你好"));
        assert_eq!(
            schema.render(&row),
            "line:2 hanzi[你好], number-pinyin[ni3-hao3]"
        );
    }

    #[test]
    fn partially_filled_rows_render_unset_columns_as_null() {
        let schema = RuleSet::from_yaml_str(RULES)
            .expect("rules")
            .to_schema()
            .expect("schema");
        let row = DynamicRow::new().with("number-pinyin", "zai4-jian4");
        assert_eq!(
            schema.render(&row),
            "line:0 hanzi[null], number-pinyin[zai4-jian4]"
        );
    }

    #[test]
    fn duplicate_rule_names_are_rejected() {
        let rules = RuleSet::from_yaml_str("columns:\n  - name: a\n  - name: a\n").expect("rules");
        assert!(matches!(
            rules.to_schema(),
            Err(SchemaError::DuplicateNames { .. })
        ));
    }

    #[test]
    fn empty_or_blank_rule_sets_are_rejected() {
        let empty = RuleSet::from_yaml_str("columns: []\n").expect("rules");
        assert!(matches!(empty.to_schema(), Err(SchemaError::Empty { .. })));
        let blank = RuleSet::from_yaml_str("columns:\n  - name: ''\n").expect("rules");
        assert!(matches!(
            blank.to_schema(),
            Err(SchemaError::BlankName { index: 1, .. })
        ));
    }

    #[test]
    fn malformed_yaml_reports_rules_error() {
        let err = RuleSet::from_yaml_str("columns: {").expect_err("bad yaml");
        assert!(matches!(err, Error::Rules { .. }));
    }

    #[test]
    fn dynamic_row_set_replaces_existing_value() {
        let mut row = DynamicRow::new().with("hanzi", "你好");
        row.set("hanzi", "再见".to_string());
        assert_eq!(row.values().collect::<Vec<_>>(), vec![("hanzi", "再见")]);
    }
}
