use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Bind CSV rows to validated records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Verify one or more CSV files against a YAML rules file
    Verify(VerifyArgs),
    /// Read a CSV file against a rules file and write the normalized rows
    Rewrite(RewriteArgs),
    /// Print the header row a writer emits for a rules file
    Headers(HeadersArgs),
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// YAML rules file describing the expected columns
    #[arg(short, long)]
    pub rules: PathBuf,
    /// One or more CSV files to verify (`-` reads stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct RewriteArgs {
    /// YAML rules file describing the expected columns
    #[arg(short, long)]
    pub rules: PathBuf,
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (`-` writes stdout)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// CSV delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct HeadersArgs {
    /// YAML rules file describing the columns
    #[arg(short, long)]
    pub rules: PathBuf,
    /// Delimiter used to join the header names
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
