//! Bind CSV rows to typed records through declared column rules.
//!
//! A record type declares its columns once (name, nullability, uniqueness,
//! pattern, trimming). A [`reader::Reader`] verifies the header of a stream
//! against that schema and yields populated records; a [`writer::Writer`]
//! emits the header and validates every record before writing it.

pub mod cli;
pub mod column;
pub mod error;
pub mod header;
pub mod io_utils;
pub mod mapper;
pub mod normalize;
pub mod reader;
pub mod rewrite;
pub mod rules;
pub mod schema;
pub mod validate;
pub mod verify;
pub mod writer;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};

pub use crate::{
    column::{ColumnAttrs, ColumnRule, Pattern},
    error::{Error, HeaderMismatch, Position, RowErrors, SchemaError, ValidationError},
    io_utils::{CsvSink, CsvSource, SessionOptions, TableSink, TableSource},
    reader::{Reader, ReaderState, read_first_record, read_records},
    rules::{DynamicRow, RuleSet},
    schema::{Declaration, Declared, Record, Schema},
    writer::{Writer, WriterState, write_records},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_binder", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Verify(args) => verify::execute(&args),
        Commands::Rewrite(args) => rewrite::execute(&args),
        Commands::Headers(args) => handle_headers(&args),
    }
}

fn handle_headers(args: &cli::HeadersArgs) -> Result<()> {
    let rules = RuleSet::load(&args.rules)
        .with_context(|| format!("Loading rules from {:?}", args.rules))?;
    let schema = rules
        .to_schema()
        .with_context(|| format!("Deriving schema from {:?}", args.rules))?;
    let delimiter = char::from(args.delimiter.unwrap_or(b',')).to_string();
    info!(
        "Header for [{}] with {} column(s)",
        schema.record_type(),
        schema.columns().len()
    );
    println!("{}", schema.header_row().join(&delimiter));
    Ok(())
}
