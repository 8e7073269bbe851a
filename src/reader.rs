//! Read sessions: header verification, row iteration and the bulk and
//! single-record read disciplines.

use std::{io::Read, path::Path, sync::Arc};

use log::debug;

use crate::{
    error::{Error, Position, Result, RowErrors},
    header::HeaderIndex,
    io_utils::{CsvSource, SessionOptions, TableSource},
    mapper::{RawRow, populate},
    schema::{Declared, Record, Schema},
    validate::UniquenessTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Opening,
    HeaderVerified,
    Iterating,
    Closed,
}

/// One read pass over a tabular source.
///
/// The line counter starts at the header (line 1); every data row read
/// advances it, valid or not. Uniqueness is tracked for the lifetime of the
/// session only. Dropping the reader closes it.
pub struct Reader<R, S: TableSource = CsvSource<Box<dyn Read>>> {
    source: Option<S>,
    schema: Arc<Schema<R>>,
    index: HeaderIndex,
    tracker: UniquenessTracker,
    path: String,
    line: usize,
    state: ReaderState,
}

impl<R: Declared + 'static, S: TableSource> Reader<R, S> {
    /// Opens a session using the schema declared on `R`.
    pub fn open(mut source: S, path: impl Into<String>) -> Result<Self> {
        match Schema::<R>::shared() {
            Ok(schema) => Self::with_schema(source, path, schema),
            Err(err) => {
                source.close();
                Err(err.into())
            }
        }
    }
}

impl<R: Declared + 'static> Reader<R> {
    pub fn from_path(path: impl AsRef<Path>, options: &SessionOptions) -> Result<Self> {
        let path = path.as_ref();
        let source = CsvSource::open(path, options)?;
        Self::open(source, crate::io_utils::display_path(path, "stdin"))
    }
}

impl<R: Record, S: TableSource> Reader<R, S> {
    pub fn with_schema(
        mut source: S,
        path: impl Into<String>,
        schema: Arc<Schema<R>>,
    ) -> Result<Self> {
        let mut reader = Self {
            source: None,
            schema,
            index: HeaderIndex::default(),
            tracker: UniquenessTracker::new(),
            path: path.into(),
            line: 0,
            state: ReaderState::Opening,
        };
        if let Err(err) = reader.verify_header(&mut source) {
            source.close();
            reader.state = ReaderState::Closed;
            return Err(err);
        }
        reader.source = Some(source);
        Ok(reader)
    }

    fn verify_header(&mut self, source: &mut S) -> Result<()> {
        let Some(headers) = source.read_header()? else {
            return Err(Error::EmptySource {
                path: self.path.clone(),
            });
        };
        self.line += 1;
        self.index = HeaderIndex::reconcile(&self.schema, &headers, &self.path)?;
        self.state = ReaderState::HeaderVerified;
        debug!(
            "{}: header verified against {} column(s) of [{}]",
            self.path,
            self.schema.columns().len(),
            self.schema.record_type()
        );
        Ok(())
    }

    /// Reads the next row. `Ok(None)` means end of input (the session is then
    /// closed); a validation error concerns this row only and the session
    /// stays positioned after it. Unique values of a rejected row are not
    /// recorded, so they never clash with later rows.
    pub fn next_record(&mut self) -> Result<Option<R>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        let Some(fields) = source.read_row()? else {
            self.close();
            return Ok(None);
        };
        self.line += 1;
        self.state = ReaderState::Iterating;
        let position = Position::new(self.path.as_str(), self.line);
        let row = RawRow::new(&self.index, &fields);
        let (record, pending) = populate(&row, &self.schema, &self.tracker, &position)?;
        pending.commit(&mut self.tracker);
        Ok(Some(record))
    }

    /// Reads every remaining row. Row errors are collected rather than
    /// returned one by one; if any occurred, the whole read fails with all of
    /// them and no records are returned.
    pub fn read_all(mut self) -> Result<Vec<R>> {
        let mut records = Vec::new();
        let mut errors = RowErrors::default();
        loop {
            match self.next_record() {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                Err(Error::Validation(err)) => errors.push(err),
                Err(err) => return Err(err),
            }
        }
        self.close();
        if !errors.is_empty() {
            debug!(
                "{}: {} invalid row(s), discarding {} valid record(s)",
                self.path,
                errors.len(),
                records.len()
            );
            return Err(Error::Rows(errors));
        }
        Ok(records)
    }

    /// Reads a single row and closes the session; errors propagate as is.
    pub fn read_first(mut self) -> Result<Option<R>> {
        let record = self.next_record();
        self.close();
        record
    }

    /// Releases the source. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
            self.tracker.clear();
            debug!("{}: reader closed at line {}", self.path, self.line);
        }
        self.state = ReaderState::Closed;
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &Arc<Schema<R>> {
        &self.schema
    }
}

impl<R: Record, S: TableSource> Iterator for Reader<R, S> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

impl<R, S: TableSource> Drop for Reader<R, S> {
    fn drop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
    }
}

/// Reads every record of a CSV file, failing with all row errors at once.
pub fn read_records<R: Declared + 'static>(
    path: impl AsRef<Path>,
    options: &SessionOptions,
) -> Result<Vec<R>> {
    Reader::<R>::from_path(path, options)?.read_all()
}

/// Reads only the first record of a CSV file.
pub fn read_first_record<R: Declared + 'static>(
    path: impl AsRef<Path>,
    options: &SessionOptions,
) -> Result<Option<R>> {
    Reader::<R>::from_path(path, options)?.read_first()
}
