//! Record capabilities, static column declarations and the derived [`Schema`].
//!
//! A record type lists its fields once through [`Declared::declare`]: each
//! mapped field contributes its identifier, its [`ColumnAttrs`] and a
//! getter/setter pair. [`Schema::derive`] resolves column names, rejects empty
//! or ambiguous declarations and compiles patterns; the result is immutable and
//! is cached per type by [`Schema::shared`].

use std::{
    any::{Any, TypeId},
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use crate::{
    column::{ColumnAttrs, ColumnRule},
    error::SchemaError,
    normalize::is_blank,
};

type Getter<R> = Box<dyn Fn(&R) -> Option<String> + Send + Sync>;
type Setter<R> = Box<dyn Fn(&mut R, String) + Send + Sync>;

/// A row-shaped value that a session can create for a given line.
pub trait Record: Sized {
    /// Creates an unpopulated record for the 1-based stream line `line`.
    fn at_line(line: usize) -> Self;

    fn line(&self) -> usize;
}

/// A record whose columns are declared statically on the type.
pub trait Declared: Record {
    fn declare(declaration: &mut Declaration<Self>);
}

enum FieldDecl<R> {
    Column {
        ident: String,
        attrs: ColumnAttrs,
        get: Getter<R>,
        set: Setter<R>,
    },
    Ignored,
}

/// Field list of one record type, in declaration order.
pub struct Declaration<R> {
    record: String,
    fields: Vec<FieldDecl<R>>,
}

impl<R> Declaration<R> {
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            fields: Vec::new(),
        }
    }

    pub fn for_type() -> Self
    where
        R: 'static,
    {
        Self::new(short_type_name::<R>())
    }

    pub fn column<G, S>(&mut self, ident: &str, attrs: ColumnAttrs, get: G, set: S) -> &mut Self
    where
        G: Fn(&R) -> Option<String> + Send + Sync + 'static,
        S: Fn(&mut R, String) + Send + Sync + 'static,
    {
        self.fields.push(FieldDecl::Column {
            ident: ident.to_string(),
            attrs,
            get: Box::new(get),
            set: Box::new(set),
        });
        self
    }

    /// Declares a field that carries no column metadata.
    pub fn ignore(&mut self, _ident: &str) -> &mut Self {
        self.fields.push(FieldDecl::Ignored);
        self
    }

    pub fn record(&self) -> &str {
        &self.record
    }
}

pub struct Column<R> {
    rule: ColumnRule,
    get: Getter<R>,
    set: Setter<R>,
}

impl<R> Column<R> {
    pub fn rule(&self) -> &ColumnRule {
        &self.rule
    }

    pub fn name(&self) -> &str {
        self.rule.name()
    }

    pub fn get(&self, record: &R) -> Option<String> {
        (self.get)(record)
    }

    pub fn set(&self, record: &mut R, value: String) {
        (self.set)(record, value)
    }
}

pub struct Schema<R> {
    record: String,
    columns: Vec<Column<R>>,
}

impl<R> Schema<R> {
    pub fn derive(declaration: Declaration<R>) -> Result<Self, SchemaError> {
        let Declaration { record, fields } = declaration;

        let mut names = HashSet::new();
        let mut duplicates = BTreeSet::new();
        let mut pending = Vec::new();
        for field in fields {
            let FieldDecl::Column {
                ident,
                attrs,
                get,
                set,
            } = field
            else {
                continue;
            };
            let name = attrs.resolved_name(&ident).to_string();
            if is_blank(&name) {
                return Err(SchemaError::BlankName {
                    record,
                    index: pending.len() + 1,
                });
            }
            if !names.insert(name.clone()) {
                duplicates.insert(name);
            }
            pending.push((ident, attrs, get, set));
        }

        if pending.is_empty() {
            return Err(SchemaError::Empty { record });
        }
        if !duplicates.is_empty() {
            return Err(SchemaError::DuplicateNames {
                record,
                names: duplicates,
            });
        }

        let mut columns = Vec::with_capacity(pending.len());
        for (ident, attrs, get, set) in pending {
            let rule = attrs.compile(&ident, &record)?;
            columns.push(Column { rule, get, set });
        }

        Ok(Self { record, columns })
    }

    pub fn record_type(&self) -> &str {
        &self.record
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn rules(&self) -> impl Iterator<Item = &ColumnRule> {
        self.columns.iter().map(Column::rule)
    }

    pub fn column(&self, name: &str) -> Option<&Column<R>> {
        self.columns.iter().find(|column| column.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Header row a writer emits: column names in schema order.
    pub fn header_row(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.name().to_string())
            .collect()
    }

    /// Formats a record as `line:N name[value], name[value]`.
    pub fn render(&self, record: &R) -> String
    where
        R: Record,
    {
        let fields = self
            .columns
            .iter()
            .map(|column| {
                let value = column.get(record).unwrap_or_else(|| "null".to_string());
                format!("{}[{}]", column.name(), value)
            })
            .collect::<Vec<_>>();
        format!("line:{} {}", record.line(), fields.join(", "))
    }
}

impl<R: Declared + 'static> Schema<R> {
    /// Derives the schema declared on `R`.
    pub fn of() -> Result<Self, SchemaError> {
        let mut declaration = Declaration::for_type();
        R::declare(&mut declaration);
        Self::derive(declaration)
    }

    /// Derived schema for `R`, computed once per process.
    pub fn shared() -> Result<Arc<Self>, SchemaError> {
        let key = TypeId::of::<R>();
        let cached = schema_cache()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(Ok(schema)) = cached.map(|entry| entry.downcast::<Self>()) {
            return Ok(schema);
        }

        let schema = Arc::new(Self::of()?);
        let mut cache = schema_cache().lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache
            .entry(key)
            .or_insert_with(|| schema.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        Ok(entry.downcast::<Self>().unwrap_or(schema))
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("record", &self.record)
            .field("rules", &self.rules().collect::<Vec<_>>())
            .finish()
    }
}

type SchemaCache = Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn schema_cache() -> &'static SchemaCache {
    static CACHE: OnceLock<SchemaCache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
