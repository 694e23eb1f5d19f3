//! Integration tests for the koboshelf CLI

use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::{params, Connection};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>One</title></head>
<body><p>Hello</p></body>
</html>"#;

/// Create a small EPUB with optional calibre series metadata
fn create_test_epub(root: &Path, rel: &str, series: Option<(&str, &str)>) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let meta = series
        .map(|(name, index)| {
            format!(
                r#"<meta name="calibre:series" content="{}"/><meta name="calibre:series_index" content="{}"/>"#,
                name, index
            )
        })
        .unwrap_or_default();
    let opf = format!(
        r#"<package xmlns="http://www.idpf.org/2007/opf"><metadata>{}</metadata></package>"#,
        meta
    );

    let mut writer = ZipWriter::new(File::create(&path).expect("Failed to create test file"));
    let entries = [
        ("mimetype", "application/epub+zip".to_string()),
        (
            "META-INF/container.xml",
            r#"<container><rootfiles><rootfile full-path="content.opf"/></rootfiles></container>"#
                .to_string(),
        ),
        ("content.opf", opf),
        ("chapter.xhtml", CHAPTER.to_string()),
    ];
    for (name, content) in entries {
        writer.start_file(name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Create a device root with a catalog holding the given ContentIDs
fn create_test_kobo(root: &Path, content_ids: &[&str]) -> PathBuf {
    let kobo_dir = root.join(".kobo");
    fs::create_dir_all(&kobo_dir).unwrap();
    let db = kobo_dir.join("KoboReader.sqlite");

    let conn = Connection::open(&db).unwrap();
    conn.execute_batch(
        "CREATE TABLE content (ContentID TEXT NOT NULL, ImageID TEXT, Series TEXT, SeriesNumber TEXT);",
    )
    .unwrap();
    for cid in content_ids {
        conn.execute(
            "INSERT INTO content (ContentID, ImageID) VALUES (?1, ?2)",
            params![cid, cid.replace([' ', '/', ':', '.'], "_")],
        )
        .unwrap();
    }
    db
}

fn koboshelf() -> Command {
    Command::cargo_bin("koboshelf").unwrap()
}

#[test]
fn test_help() {
    koboshelf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("seriesmeta"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn test_version() {
    koboshelf()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("koboshelf"));
}

#[test]
fn test_convert_help() {
    koboshelf()
        .args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--update"))
        .stdout(predicate::str::contains("--replace"));
}

#[test]
fn test_convert_missing_input() {
    koboshelf()
        .arg("convert")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_convert_conflicting_hyphenation() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(temp_dir.path(), "book.epub", None);
    let output = temp_dir.path().join("out");

    koboshelf()
        .args([
            "convert",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--hyphenate",
            "--no-hyphenate",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hyphenat"));

    assert!(!output.exists());
}

#[test]
fn test_convert_malformed_replacement() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(temp_dir.path(), "book.epub", None);

    koboshelf()
        .args(["convert", input.to_str().unwrap(), "-r", "no separator"])
        .current_dir(temp_dir.path())
        .assert()
        .failure();
}

#[test]
fn test_convert_nonexistent_file() {
    let temp_dir = TempDir::new().unwrap();

    koboshelf()
        .args(["convert", "/nonexistent/file.epub"])
        .current_dir(temp_dir.path())
        .assert()
        .failure();
}

#[test]
fn test_convert_rejects_kepub() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(temp_dir.path(), "book.kepub.epub", None);

    koboshelf()
        .args(["convert", input.to_str().unwrap()])
        .current_dir(temp_dir.path())
        .assert()
        .failure();
}

#[test]
fn test_convert_file_to_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(temp_dir.path(), "book.epub", None);
    let output = temp_dir.path().join("out");

    koboshelf()
        .args([
            "convert",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converting 1 books"))
        .stdout(predicate::str::contains(
            "1 total, 1 converted, 0 skipped, 0 errored",
        ));

    let kepub = output.join("book.kepub.epub");
    assert!(kepub.exists(), "Output file should exist");
    let archive = zip::ZipArchive::new(File::open(&kepub).unwrap());
    assert!(archive.is_ok(), "Output should be a valid ZIP/EPUB file");
}

#[test]
fn test_convert_directory_update_skips() {
    let temp_dir = TempDir::new().unwrap();
    let lib = temp_dir.path().join("lib");
    create_test_epub(&lib, "a/one.epub", None);
    create_test_epub(&lib, "a/two.kepub.epub", None);
    create_test_epub(&lib, "b/three.epub", None);
    let output = temp_dir.path().join("out");

    let args = [
        "convert",
        lib.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "-u",
    ];

    koboshelf()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2 total, 2 converted, 0 skipped, 0 errored",
        ));
    assert!(output.join("a/one.kepub.epub").exists());
    assert!(output.join("b/three.kepub.epub").exists());

    koboshelf()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipping"))
        .stdout(predicate::str::contains(
            "2 total, 0 converted, 2 skipped, 0 errored",
        ));
}

#[test]
fn test_convert_single_failure_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("broken.epub");
    fs::write(&input, b"not a zip").unwrap();

    koboshelf()
        .args(["convert", input.to_str().unwrap()])
        .current_dir(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.epub"));
}

#[test]
fn test_convert_partial_failure_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let lib = temp_dir.path().join("lib");
    create_test_epub(&lib, "good.epub", None);
    fs::write(lib.join("broken.epub"), b"not a zip").unwrap();
    let output = temp_dir.path().join("out");

    koboshelf()
        .args(["convert", lib.to_str().unwrap(), "-o", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2 total, 1 converted, 0 skipped, 1 errored",
        ))
        .stderr(predicate::str::contains("Errors:"));
}

#[test]
fn test_convert_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(temp_dir.path(), "book.epub", None);
    let output = temp_dir.path().join("out");

    let assert = koboshelf()
        .args([
            "convert",
            "--json",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(json["converted"], 1);
    assert_eq!(json["results"][0]["outcome"]["status"], "converted");
}

#[test]
fn test_seriesmeta_updates_database() {
    let temp_dir = TempDir::new().unwrap();
    let db = create_test_kobo(
        temp_dir.path(),
        &["file:///mnt/onboard/Author/Title.kobo.epub"],
    );
    create_test_epub(
        temp_dir.path(),
        "Author/Title.kobo.epub",
        Some(("Discworld", "3")),
    );
    create_test_epub(temp_dir.path(), "Plain.epub", None);

    koboshelf()
        .args(["seriesmeta", temp_dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Finished updating metadata. 1 updated, 1 without metadata, 0 errored.",
        ));

    let conn = Connection::open(&db).unwrap();
    let (series, number): (Option<String>, Option<String>) = conn
        .query_row(
            "SELECT Series, SeriesNumber FROM content WHERE ContentID = ?1",
            params!["file:///mnt/onboard/Author/Title.kobo.epub"],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(series.as_deref(), Some("Discworld"));
    assert_eq!(number.as_deref(), Some("3"));
    assert!(temp_dir.path().join(".kobo/KoboReader.sqlite.bak").exists());
}

#[test]
fn test_seriesmeta_not_a_kobo() {
    let temp_dir = TempDir::new().unwrap();

    koboshelf()
        .args(["seriesmeta", temp_dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Kobo"));
}

#[test]
fn test_info_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(temp_dir.path(), "Book.epub", Some(("Foundation", "1.5")));

    let assert = koboshelf()
        .args(["info", "--json", input.to_str().unwrap()])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(json["series"], "Foundation");
    assert_eq!(json["series_number"], "1.5");
    assert_eq!(json["image_id"], "file____mnt_onboard_Book_epub");
}

#[test]
fn test_info_nonexistent_file() {
    koboshelf()
        .args(["info", "/nonexistent/file.epub"])
        .assert()
        .failure();
}

#[test]
fn test_verbose_flag() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(temp_dir.path(), "book.epub", None);

    koboshelf()
        .args(["--verbose", "info", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Series:       (none)"));
}
