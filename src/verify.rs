use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::VerifyArgs,
    io_utils::{self, SessionOptions},
    reader::Reader,
    rules::{DynamicRow, RuleSet},
    schema::Schema,
};

pub fn execute(args: &VerifyArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let rules = RuleSet::load(&args.rules)
        .with_context(|| format!("Loading rules from {:?}", args.rules))?;
    let schema = rules
        .to_schema()
        .with_context(|| format!("Deriving schema from {:?}", args.rules))?;
    for input in &args.inputs {
        let options = SessionOptions::default()
            .with_delimiter(io_utils::resolve_delimiter(Some(input), args.delimiter))
            .with_encoding(encoding);
        let rows = verify_file(&schema, input, &options)
            .with_context(|| format!("Verifying {:?}", input))?;
        info!("✓ {:?} matches rules ({} row(s))", input, rows);
    }
    Ok(())
}

/// Reads `path` in bulk mode and returns how many rows it holds.
pub fn verify_file(
    schema: &Arc<Schema<DynamicRow>>,
    path: &Path,
    options: &SessionOptions,
) -> Result<usize> {
    let source = io_utils::CsvSource::open(path, options)?;
    let reader = Reader::with_schema(
        source,
        io_utils::display_path(path, "stdin"),
        schema.clone(),
    )?;
    Ok(reader.read_all()?.len())
}
