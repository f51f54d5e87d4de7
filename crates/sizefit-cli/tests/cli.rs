//! End-to-end runs of the `sizefit` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

fn sizefit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sizefit"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_jpeg(dir: &Path, name: &str) -> PathBuf {
    let image = RgbImage::from_fn(64, 48, |x, y| {
        Rgb([(x * 4) as u8, (y * 5) as u8, ((x ^ y) * 3) as u8])
    });
    let path = dir.join(name);
    image.save_with_format(&path, ImageFormat::Jpeg).unwrap();
    path
}

fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut found: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.to_string_lossy().ends_with(suffix))
        .collect();
    found.sort();
    found
}

#[test]
fn test_help() {
    let output = sizefit(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--target-size"));
    assert!(stdout.contains("--size-range"));
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = sizefit(&[dir.path().join("nope.jpg").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_default_run_writes_unique_name_beside_input() {
    let dir = TempDir::new().unwrap();
    let input = write_jpeg(dir.path(), "cat.jpg");
    let before = fs::read(&input).unwrap();

    let output = sizefit(&[input.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let written = files_with_suffix(dir.path(), "_compressed.jpg");
    assert_eq!(written.len(), 1);
    assert!(fs::read(&written[0]).unwrap().starts_with(&[0xFF, 0xD8]));
    assert_eq!(fs::read(&input).unwrap(), before);
}

#[test]
fn test_exact_target_is_padded() {
    let dir = TempDir::new().unwrap();
    let input = write_jpeg(dir.path(), "cat.jpg");
    let out = dir.path().join("out.jpg");

    let output = sizefit(&[
        input.to_str().unwrap(),
        "-t",
        "50",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::metadata(&out).unwrap().len(), 50 * 1024);
}

#[test]
fn test_webp_conversion_into_directory() {
    let dir = TempDir::new().unwrap();
    let input = write_jpeg(dir.path(), "cat.jpg");
    let out = dir.path().join("out");

    let output = sizefit(&[
        input.to_str().unwrap(),
        "--webp",
        "--webp-quality",
        "80",
        "-o",
        out.to_str().unwrap(),
        "-f",
        "--json",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let written = out.join("cat.webp");
    let bytes = fs::read(&written).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let summary: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(summary["format"], "WebP");
    assert_eq!(summary["webp_quality"], 80);
    assert!(summary["error"].is_null());
}

#[test]
fn test_existing_output_file_without_force() {
    let dir = TempDir::new().unwrap();
    let input = write_jpeg(dir.path(), "cat.jpg");
    let out = dir.path().join("taken.jpg");
    fs::write(&out, b"keep me").unwrap();

    let output = sizefit(&[input.to_str().unwrap(), "-o", out.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert_eq!(fs::read(&out).unwrap(), b"keep me");
}

#[test]
fn test_directory_input() {
    let dir = TempDir::new().unwrap();
    let photos = dir.path().join("photos");
    fs::create_dir(&photos).unwrap();
    write_jpeg(&photos, "a.jpg");
    write_jpeg(&photos, "b.jpeg");
    fs::write(photos.join("notes.txt"), b"skip").unwrap();
    let out = dir.path().join("out");

    let output = sizefit(&[
        photos.to_str().unwrap(),
        "-q",
        "60",
        "-j",
        "2",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(files_with_suffix(&out, "_compressed.jpg").len(), 1);
    assert_eq!(files_with_suffix(&out, "_compressed.jpeg").len(), 1);
}

#[test]
fn test_existing_webp_output_without_force() {
    let dir = TempDir::new().unwrap();
    let input = write_jpeg(dir.path(), "cat.jpg");
    let out = dir.path().join("out.jpg");
    let converted = dir.path().join("out.webp");
    fs::write(&converted, b"keep me").unwrap();

    let output = sizefit(&[
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--webp",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert_eq!(fs::read(&converted).unwrap(), b"keep me");
    assert!(!out.exists());
}

#[test]
fn test_shared_webp_destination_is_rejected() {
    let dir = TempDir::new().unwrap();
    let photos = dir.path().join("photos");
    fs::create_dir(&photos).unwrap();
    write_jpeg(&photos, "a.jpg");
    write_jpeg(&photos, "a.jpeg");
    let out = dir.path().join("out");

    let output = sizefit(&[
        photos.to_str().unwrap(),
        "--webp",
        "-f",
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("would both be written to"));
    assert!(files_with_suffix(&out, ".webp").is_empty());
}

#[test]
fn test_default_quality_is_80() {
    let dir = TempDir::new().unwrap();
    let input = write_jpeg(dir.path(), "cat.jpg");

    let output = sizefit(&[input.to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let summary: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(summary["quality"], "80");

    // A range search starts from the same default.
    let output = sizefit(&[input.to_str().unwrap(), "-s", "0.5", "500", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let summary: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).unwrap();
    assert_eq!(summary["quality"], "80");
}
