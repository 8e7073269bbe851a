use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::RewriteArgs,
    io_utils::{self, CsvSink, CsvSource, SessionOptions},
    reader::Reader,
    rules::RuleSet,
    writer::Writer,
};

pub fn execute(args: &RewriteArgs) -> Result<()> {
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    let rules = RuleSet::load(&args.rules)
        .with_context(|| format!("Loading rules from {:?}", args.rules))?;
    let schema = rules
        .to_schema()
        .with_context(|| format!("Deriving schema from {:?}", args.rules))?;

    let input_delimiter = io_utils::resolve_delimiter(Some(&args.input), args.delimiter);
    let output_delimiter = args.output_delimiter.unwrap_or_else(|| {
        io_utils::resolve_delimiter(Some(&args.output), args.delimiter)
    });
    let input_options = SessionOptions::default()
        .with_delimiter(input_delimiter)
        .with_encoding(input_encoding);
    let output_options = SessionOptions::default()
        .with_delimiter(output_delimiter)
        .with_encoding(output_encoding);

    let source = CsvSource::open(&args.input, &input_options)
        .with_context(|| format!("Opening input {:?}", args.input))?;
    let rows = Reader::with_schema(
        source,
        io_utils::display_path(&args.input, "stdin"),
        schema.clone(),
    )
    .and_then(Reader::read_all)
    .with_context(|| format!("Reading {:?}", args.input))?;

    let sink = CsvSink::create(&args.output, &output_options)
        .with_context(|| format!("Creating output {:?}", args.output))?;
    let mut writer = Writer::with_schema(sink, io_utils::display_path(&args.output, "stdout"), schema)
        .with_context(|| format!("Writing header to {:?}", args.output))?;
    let written = writer
        .write_all(&rows)
        .with_context(|| format!("Writing rows to {:?}", args.output))?;
    writer
        .close()
        .with_context(|| format!("Flushing {:?}", args.output))?;
    info!(
        "Rewrote {} row(s) from {:?} into {:?}",
        written, args.input, args.output
    );
    Ok(())
}
