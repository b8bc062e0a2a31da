use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn cfloc_bin() -> &'static str {
    env!("CARGO_BIN_EXE_cfloc")
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("failed to write test file");
}

fn parse_totals(stdout: &str) -> HashMap<String, (u64, u64, u64)> {
    // Map: lang -> (files, code, total)
    let mut out = HashMap::new();
    let mut iter = stdout.lines();
    // Seek to the totals section
    while let Some(line) = iter.next() {
        if line.contains("Totals by language:") {
            break;
        }
    }
    // Read until a blank line or "Overall Summary:" appears
    for line in iter {
        if line.trim().is_empty() || line.contains("Overall Summary:") {
            break;
        }
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        // Totals rows are fixed-width; languages used here are single tokens
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let lang = parts[0].to_string();
        let parse_u64 = |s: &str| s.parse::<u64>().unwrap_or(0);
        let files = parse_u64(parts[1]);
        let code = parse_u64(parts[2]);
        let total = parse_u64(parts[3]);
        out.insert(lang, (files, code, total));
    }
    out
}

#[test]
fn cli_totals_count_code_lines_per_language() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let root = temp_dir.path();

    // C: 5 total lines, 2 carry code
    write_file(
        &root.join("a.c"),
        "int x = 1;\n/*\nnotes\n*/\nint y = 2;\n",
    );

    // Java: 4 total lines, 2 carry code (trailing comment lines excluded)
    write_file(
        &root.join("B.java"),
        "class B {\n  // only a comment\n}\n\n",
    );

    // Go in a subdirectory: 3 total lines, 2 carry code
    let sub = root.join("pkg");
    fs::create_dir(&sub).expect("failed to create sub directory");
    write_file(&sub.join("c.go"), "package pkg\n\nvar X = 1\n");

    let output = Command::new(cfloc_bin())
        .arg(root)
        .output()
        .expect("failed to execute cfloc");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let totals = parse_totals(&stdout);

    assert_eq!(totals.get("C"), Some(&(1, 2, 5)), "totals: {totals:?}");
    assert_eq!(totals.get("Java"), Some(&(1, 2, 4)), "totals: {totals:?}");
    assert_eq!(totals.get("Go"), Some(&(1, 2, 3)), "totals: {totals:?}");
}

#[test]
fn cli_totals_ignore_comment_markers_inside_strings() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let root = temp_dir.path();

    write_file(
        &root.join("strings.c"),
        "char *a = \"hello /* hello\";\nchar *b = \"no // comment\";\n",
    );

    let output = Command::new(cfloc_bin())
        .arg(root)
        .output()
        .expect("failed to execute cfloc");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let totals = parse_totals(&stdout);
    assert_eq!(totals.get("C"), Some(&(1, 2, 2)), "totals: {totals:?}");
}

#[test]
fn cli_totals_handle_delimiter_collisions() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let root = temp_dir.path();

    // /*/ opens but does not immediately close; only the line after the
    // real close carries code.
    write_file(
        &root.join("open.c"),
        "/*/\nint a = 25;\n*/\nint b = 25;\n",
    );
    // The * right after the close is multiplication, not a new opener.
    write_file(&root.join("mul.c"), "i = 4\n/*\ni++;\n */* 2;\n");

    let output = Command::new(cfloc_bin())
        .arg(root)
        .output()
        .expect("failed to execute cfloc");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let totals = parse_totals(&stdout);
    assert_eq!(totals.get("C"), Some(&(2, 3, 8)), "totals: {totals:?}");
}

#[test]
fn cli_totals_skip_unrecognised_extensions() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let root = temp_dir.path();

    write_file(&root.join("code.ts"), "const x = 1;\n");
    write_file(&root.join("notes.txt"), "just text\n");
    write_file(&root.join("script.py"), "x = 1\n");

    let output = Command::new(cfloc_bin())
        .arg(root)
        .output()
        .expect("failed to execute cfloc");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let totals = parse_totals(&stdout);
    assert_eq!(totals.len(), 1, "only TypeScript should appear: {totals:?}");
    assert_eq!(totals.get("TypeScript"), Some(&(1, 1, 1)));
}
