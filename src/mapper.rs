//! Conversion between raw rows and records, with normalization and
//! validation applied to every column in schema order.

use crate::{
    error::{Position, ValidationError},
    header::HeaderIndex,
    normalize::normalize,
    schema::{Record, Schema},
    validate::{PendingValues, UniquenessTracker, validate},
};

/// One data row addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    index: &'a HeaderIndex,
    fields: &'a [String],
}

impl<'a> RawRow<'a> {
    pub fn new(index: &'a HeaderIndex, fields: &'a [String]) -> Self {
        Self { index, fields }
    }

    /// Field under `name`; `None` when the row is shorter than the header.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.index
            .position(name)
            .and_then(|idx| self.fields.get(idx))
            .map(String::as_str)
    }
}

/// Builds the record for `position.line`, stopping at the first invalid field.
///
/// The row's unique values come back staged; nothing is recorded in `tracker`.
pub fn populate<R: Record>(
    row: &RawRow<'_>,
    schema: &Schema<R>,
    tracker: &UniquenessTracker,
    position: &Position,
) -> Result<(R, PendingValues), ValidationError> {
    let mut record = R::at_line(position.line);
    let mut pending = PendingValues::new();
    for column in schema.columns() {
        let value = normalize(row.get(column.name()), column.rule());
        validate(&value, column.rule(), tracker, &mut pending, position)?;
        column.set(&mut record, value);
    }
    Ok((record, pending))
}

/// Field values of `record` in schema order, normalized and validated.
pub fn extract<R>(
    record: &R,
    schema: &Schema<R>,
    tracker: &UniquenessTracker,
    position: &Position,
) -> Result<(Vec<String>, PendingValues), ValidationError> {
    let mut row = Vec::with_capacity(schema.columns().len());
    let mut pending = PendingValues::new();
    for column in schema.columns() {
        let value = normalize(column.get(record).as_deref(), column.rule());
        validate(&value, column.rule(), tracker, &mut pending, position)?;
        row.push(value);
    }
    Ok((row, pending))
}
