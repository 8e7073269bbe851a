//! Tabular collaborator contract and its `csv`-backed implementation.
//!
//! Sessions only ever see [`TableSource`] and [`TableSink`]: header row, data
//! rows and row emission. Splitting, quoting and byte decoding stay here:
//!
//! - **Delimiters**: comma by default, tab for `.tsv` paths, overridable.
//! - **Encoding**: input decoding and output transcoding via `encoding_rs`,
//!   defaulting to UTF-8.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.
//! - **Quoting**: output fields are quoted only when required.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use csv::{ByteRecord, QuoteStyle, Trim};
use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Position, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// Read side of the collaborator.
pub trait TableSource {
    /// First row of the input, or `None` when the input holds no rows at all.
    fn read_header(&mut self) -> Result<Option<Vec<String>>>;

    /// Next data row, or `None` at end of input.
    fn read_row(&mut self) -> Result<Option<Vec<String>>>;

    fn close(&mut self) {}
}

/// Write side of the collaborator.
pub trait TableSink {
    fn write_row(&mut self, row: &[String]) -> Result<()>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Settings handed to the collaborator when a session opens a stream.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    /// Let the CSV parser trim fields itself, before column rules apply.
    pub trim_whitespace: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
            trim_whitespace: false,
        }
    }
}

impl SessionOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => {
            Encoding::for_label(value.trim().as_bytes()).ok_or_else(|| Error::UnknownEncoding {
                label: value.to_string(),
            })
        }
        None => Ok(UTF_8),
    }
}

pub fn resolve_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| {
        match path
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
        {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
            _ => DEFAULT_CSV_DELIMITER,
        }
    })
}

/// Identifier used in diagnostics for a file-backed stream.
pub fn display_path(path: &Path, stream: &str) -> String {
    if is_dash(path) {
        return stream.to_string();
    }
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

pub struct CsvSource<R: Read> {
    reader: csv::Reader<R>,
    record: ByteRecord,
    encoding: &'static Encoding,
    path: String,
    rows: usize,
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R, options: &SessionOptions, path: impl Into<String>) -> Self {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .delimiter(options.delimiter)
            .double_quote(true)
            .flexible(true)
            .trim(if options.trim_whitespace {
                Trim::All
            } else {
                Trim::None
            });
        Self {
            reader: builder.from_reader(reader),
            record: ByteRecord::new(),
            encoding: options.encoding,
            path: path.into(),
            rows: 0,
        }
    }

    /// Reads and decodes the next row; the header counts as row 1.
    fn next_decoded(&mut self) -> Result<Option<Vec<String>>> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }
        self.rows += 1;
        let position = Position::new(self.path.as_str(), self.rows);
        self.record
            .iter()
            .map(|field| decode_bytes(field, self.encoding, &position))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

impl CsvSource<Box<dyn Read>> {
    pub fn open(path: &Path, options: &SessionOptions) -> Result<Self> {
        let reader: Box<dyn Read> = if is_dash(path) {
            Box::new(io::stdin().lock())
        } else {
            Box::new(BufReader::new(File::open(path)?))
        };
        Ok(Self::from_reader(reader, options, display_path(path, "stdin")))
    }
}

impl<R: Read> TableSource for CsvSource<R> {
    fn read_header(&mut self) -> Result<Option<Vec<String>>> {
        self.next_decoded()
    }

    fn read_row(&mut self) -> Result<Option<Vec<String>>> {
        self.next_decoded()
    }
}

pub fn decode_bytes(
    bytes: &[u8],
    encoding: &'static Encoding,
    position: &Position,
) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(Error::Decode {
            position: position.clone(),
            encoding: encoding.name().to_string(),
        })
    } else {
        Ok(text.into_owned())
    }
}

pub struct CsvSink {
    writer: csv::Writer<Box<dyn Write>>,
}

impl CsvSink {
    pub fn from_writer<W: Write + 'static>(writer: W, options: &SessionOptions) -> Self {
        let base: Box<dyn Write> = if options.encoding == UTF_8 {
            Box::new(writer)
        } else {
            Box::new(TranscodingWriter::new(writer, options.encoding))
        };
        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(options.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true)
            .flexible(false);
        Self {
            writer: builder.from_writer(base),
        }
    }

    pub fn create(path: &Path, options: &SessionOptions) -> Result<Self> {
        if is_dash(path) {
            return Ok(Self::from_writer(io::stdout(), options));
        }
        let file = BufWriter::new(File::create(path)?);
        Ok(Self::from_writer(file, options))
    }
}

impl TableSink for CsvSink {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.writer.write_record(row)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Re-encodes the UTF-8 produced by the CSV writer into a target encoding.
///
/// Bytes of a code point split across two writes are held back until the
/// rest of the sequence arrives.
struct TranscodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    pending: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            pending: Vec::new(),
        }
    }

    fn encode_complete(&mut self) -> io::Result<()> {
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(err) if err.error_len().is_some() => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid UTF-8 sequence in output stream",
                ));
            }
            Err(err) => err.valid_up_to(),
        };
        if complete == 0 {
            return Ok(());
        }
        let rest = self.pending.split_off(complete);
        let text = String::from_utf8(std::mem::replace(&mut self.pending, rest))
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        let (encoded, _, had_errors) = self.encoding.encode(&text);
        if had_errors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to encode text using {}", self.encoding.name()),
            ));
        }
        self.inner.write_all(&encoded)
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.encode_complete()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encode_complete()?;
        if !self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "incomplete UTF-8 sequence at end of output stream",
            ));
        }
        self.inner.flush()
    }
}
