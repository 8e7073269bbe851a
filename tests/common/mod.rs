#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_binder::{ColumnAttrs, Declaration, Declared, Record};
use tempfile::{TempDir, tempdir};

pub const WORD_RULES: &str = "\
name: words
columns:
  - name: hanzi
    nullable: false
    unique: true
  - name: mark-pinyin
    nullable: false
  - name: number-pinyin
    matches: \"[a-z]+[0-5]( [a-z]+[0-5])*\"
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// Vocabulary entry used across the integration tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Word {
    pub line: usize,
    pub hanzi: Option<String>,
    pub mark_pinyin: Option<String>,
    pub note: Option<String>,
}

impl Word {
    pub fn new(hanzi: &str, mark_pinyin: &str) -> Self {
        Self {
            hanzi: Some(hanzi.to_string()),
            mark_pinyin: Some(mark_pinyin.to_string()),
            ..Self::default()
        }
    }
}

impl Record for Word {
    fn at_line(line: usize) -> Self {
        Self {
            line,
            ..Self::default()
        }
    }

    fn line(&self) -> usize {
        self.line
    }
}

impl Declared for Word {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration
            .column(
                "hanzi",
                ColumnAttrs::new().nullable(false).unique(true),
                |word| word.hanzi.clone(),
                |word, value| word.hanzi = Some(value),
            )
            .column(
                "mark_pinyin",
                ColumnAttrs::new().name("mark-pinyin").nullable(false),
                |word| word.mark_pinyin.clone(),
                |word, value| word.mark_pinyin = Some(value),
            )
            .ignore("note");
    }
}
