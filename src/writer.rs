//! Write sessions: header emission and fail-fast record writing.

use std::{path::Path, sync::Arc};

use log::{debug, warn};

use crate::{
    error::{Error, Position, Result},
    io_utils::{CsvSink, SessionOptions, TableSink, display_path},
    mapper::extract,
    schema::{Declared, Schema},
    validate::UniquenessTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Opening,
    HeaderWritten,
    Writing,
    Closed,
}

/// One write pass over a tabular sink. The header row is written on open;
/// dropping the writer closes (and flushes) it.
pub struct Writer<R, S: TableSink = CsvSink> {
    sink: Option<S>,
    schema: Arc<Schema<R>>,
    tracker: UniquenessTracker,
    path: String,
    line: usize,
    state: WriterState,
}

impl<R: Declared + 'static, S: TableSink> Writer<R, S> {
    pub fn open(mut sink: S, path: impl Into<String>) -> Result<Self> {
        match Schema::<R>::shared() {
            Ok(schema) => Self::with_schema(sink, path, schema),
            Err(err) => {
                let _ = sink.close();
                Err(err.into())
            }
        }
    }
}

impl<R: Declared + 'static> Writer<R> {
    pub fn create(path: impl AsRef<Path>, options: &SessionOptions) -> Result<Self> {
        let path = path.as_ref();
        let sink = CsvSink::create(path, options)?;
        Self::open(sink, display_path(path, "stdout"))
    }
}

impl<R, S: TableSink> Writer<R, S> {
    pub fn with_schema(sink: S, path: impl Into<String>, schema: Arc<Schema<R>>) -> Result<Self> {
        let mut writer = Self {
            sink: Some(sink),
            schema,
            tracker: UniquenessTracker::new(),
            path: path.into(),
            line: 0,
            state: WriterState::Opening,
        };
        let header = writer.schema.header_row();
        if let Err(err) = writer.emit(&header) {
            let _ = writer.close();
            return Err(err);
        }
        writer.line += 1;
        writer.state = WriterState::HeaderWritten;
        debug!("{}: header written {:?}", writer.path, header);
        Ok(writer)
    }

    /// Validates and writes one record, returning the line it occupies.
    ///
    /// The record is borrowed, so its own `line()` is left as it was; the
    /// returned line is the one reported in diagnostics for this write.
    /// A validation failure leaves nothing written, reserves none of the
    /// record's unique values and keeps the session open.
    pub fn write_record(&mut self, record: &R) -> Result<usize> {
        if self.sink.is_none() {
            return Err(Error::SessionClosed {
                path: self.path.clone(),
            });
        }
        self.line += 1;
        let position = Position::new(self.path.as_str(), self.line);
        let (row, pending) = extract(record, &self.schema, &self.tracker, &position)?;
        self.emit(&row)?;
        pending.commit(&mut self.tracker);
        self.state = WriterState::Writing;
        Ok(self.line)
    }

    pub fn write_all<'a, I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let mut written = 0usize;
        for record in records {
            self.write_record(record)?;
            written += 1;
        }
        Ok(written)
    }

    fn emit(&mut self, row: &[String]) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.write_row(row),
            None => Err(Error::SessionClosed {
                path: self.path.clone(),
            }),
        }
    }

    /// Flushes and releases the sink. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        self.state = WriterState::Closed;
        if let Some(mut sink) = self.sink.take() {
            self.tracker.clear();
            sink.close()?;
            debug!("{}: writer closed at line {}", self.path, self.line);
        }
        Ok(())
    }

    pub fn state(&self) -> WriterState {
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

impl<R, S: TableSink> Drop for Writer<R, S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("{}: failed to close writer: {err}", self.path);
        }
    }
}

/// Writes `records` to a new CSV file, stopping at the first invalid record.
pub fn write_records<'a, R, I>(
    path: impl AsRef<Path>,
    records: I,
    options: &SessionOptions,
) -> Result<usize>
where
    R: Declared + 'static,
    I: IntoIterator<Item = &'a R>,
{
    let mut writer = Writer::<R>::create(path, options)?;
    let written = writer.write_all(records)?;
    writer.close()?;
    Ok(written)
}
