mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, WORD_RULES};
use predicates::prelude::*;
use predicates::str::contains;

fn binder() -> Command {
    Command::cargo_bin("csv-binder").expect("binary exists")
}

#[test]
fn verify_accepts_valid_files() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("words.yml", WORD_RULES);
    let first = workspace.write(
        "a.csv",
        "hanzi,mark-pinyin,number-pinyin\n你好,nǐ hǎo,ni3 hao3\n",
    );
    let second = workspace.write(
        "b.tsv",
        "number-pinyin\thanzi\tmark-pinyin\nzai4 jian4\t再见\tzài jiàn\n",
    );
    binder()
        .args([
            "verify",
            "-r",
            rules.to_str().unwrap(),
            "-i",
            first.to_str().unwrap(),
            "-i",
            second.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(contains("matches rules"));
}

#[test]
fn verify_reports_every_invalid_row() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("words.yml", WORD_RULES);
    let input = workspace.write(
        "words.csv",
        "hanzi,mark-pinyin,number-pinyin\n你好,nǐ hǎo,ni3 hao3\n,kōng,kong1\n你好,nǐ hǎo,nihao\n",
    );
    binder()
        .args([
            "verify",
            "-r",
            rules.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("#3: column[hanzi] should not be blank"))
        .stderr(contains("#4: duplicate [你好] for column[hanzi]"))
        .stderr(contains("should match regex").not());
}

#[test]
fn verify_reports_header_mismatch() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("words.yml", WORD_RULES);
    let input = workspace.write("words.csv", "hanzi,hanzi\n你好,你好\n");
    binder()
        .args([
            "verify",
            "-r",
            rules.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("header mismatch"))
        .stderr(contains("duplicate header [hanzi]"))
        .stderr(contains("missing header [mark-pinyin, number-pinyin]"));
}

#[test]
fn verify_rejects_unknown_encoding() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("words.yml", WORD_RULES);
    let input = workspace.write("words.csv", "hanzi,mark-pinyin,number-pinyin\n");
    binder()
        .args([
            "verify",
            "-r",
            rules.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "--input-encoding",
            "klingon",
        ])
        .assert()
        .failure()
        .stderr(contains("unknown encoding 'klingon'"));
}

#[test]
fn rewrite_normalizes_and_transcodes() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("words.yml", WORD_RULES);
    let input = workspace.write(
        "words.csv",
        "number-pinyin,mark-pinyin,hanzi\nni3 hao3,nǐ hǎo,\u{3000}你好 \n",
    );
    let output = workspace.path().join("out.csv");
    binder()
        .args([
            "rewrite",
            "-r",
            rules.to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--output-delimiter",
            ";",
            "--output-encoding",
            "gbk",
        ])
        .assert()
        .success();

    let bytes = fs::read(&output).expect("output");
    let (text, _, had_errors) = encoding_rs::GBK.decode(&bytes);
    assert!(!had_errors);
    assert_eq!(
        text,
        "hanzi;mark-pinyin;number-pinyin\n你好;nǐ hǎo;ni3 hao3\n"
    );
}

#[test]
fn rewrite_to_stdout_and_stops_on_invalid_rows() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("words.yml", WORD_RULES);
    let valid = workspace.write(
        "valid.csv",
        "hanzi,mark-pinyin,number-pinyin\n再见,zài jiàn,zai4 jian4\n",
    );
    binder()
        .args([
            "rewrite",
            "-r",
            rules.to_str().unwrap(),
            "-i",
            valid.to_str().unwrap(),
            "-o",
            "-",
        ])
        .assert()
        .success()
        .stdout("hanzi,mark-pinyin,number-pinyin\n再见,zài jiàn,zai4 jian4\n");

    let invalid = workspace.write(
        "invalid.csv",
        "hanzi,mark-pinyin,number-pinyin\n再见,,zai4 jian4\n",
    );
    let output = workspace.path().join("never.csv");
    binder()
        .args([
            "rewrite",
            "-r",
            rules.to_str().unwrap(),
            "-i",
            invalid.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("column[mark-pinyin] should not be blank"));
    assert!(!output.exists());
}

#[test]
fn headers_prints_the_writer_header() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("words.yml", WORD_RULES);
    binder()
        .args(["headers", "-r", rules.to_str().unwrap(), "--delimiter", "tab"])
        .assert()
        .success()
        .stdout("hanzi\tmark-pinyin\tnumber-pinyin\n");
}

#[test]
fn rules_with_duplicate_names_are_rejected() {
    let workspace = TestWorkspace::new();
    let rules = workspace.write("dup.yml", "columns:\n  - name: hanzi\n  - name: hanzi\n");
    binder()
        .args(["headers", "-r", rules.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("duplicate column name [hanzi] in record type [rules]"));
}
