//! Shared fixtures: plugin packages built on the fly from WebAssembly text

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// The four arithmetic operations as (declared name, entry point, wasm instruction)
pub const ARITHMETIC: [(&str, &str, &str); 4] = [
    ("Addition", "calc.ops.Addition", "f64.add"),
    ("Subtraction", "calc.ops.Subtraction", "f64.sub"),
    ("Multiplication", "calc.ops.Multiplication", "f64.mul"),
    ("Division", "calc.ops.Division", "f64.div"),
];

/// Writes a zip archive at `dir/file` holding `entries`
pub fn write_package(dir: &Path, file: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(file);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// Rewrites the uncompressed size every header of `path` declares
///
/// The entry data is left alone, so the archive lies about its contents.
pub fn forge_declared_size(path: &Path, size: u32) {
    const LOCAL_HEADER: &[u8] = b"PK\x03\x04";
    const CENTRAL_HEADER: &[u8] = b"PK\x01\x02";

    let mut bytes = fs::read(path).unwrap();
    let mut patched = 0;
    for at in 0..bytes.len().saturating_sub(4) {
        let offset = match &bytes[at..at + 4] {
            sig if sig == LOCAL_HEADER => 22,
            sig if sig == CENTRAL_HEADER => 24,
            _ => continue,
        };
        bytes[at + offset..at + offset + 4].copy_from_slice(&size.to_le_bytes());
        patched += 1;
    }
    assert!(patched >= 2, "no zip headers found in {}", path.display());
    fs::write(path, bytes).unwrap();
}

/// Manifest text declaring `entry_point`
pub fn manifest(entry_point: &str) -> String {
    format!("# generated for tests\nentrypoint = {entry_point}\n")
}

/// Archive path of the text module for `entry_point`
pub fn module_entry(entry_point: &str) -> String {
    format!("{}.wat", entry_point.replace('.', "/"))
}

/// A module declaring `name` whose `operate` applies `instruction` to both operands
pub fn operation_wat(name: &str, instruction: &str) -> String {
    operation_wat_with_body(name, &format!("local.get 0 local.get 1 {instruction}"))
}

/// A module declaring `name` with an arbitrary `operate` body
pub fn operation_wat_with_body(name: &str, body: &str) -> String {
    format!(
        r#"(module
  (import "host" "log" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "{name}")
  (func (export "_initialize")
    i32.const 0 i32.const {len} call $log)
  (func (export "name") (result i32 i32)
    i32.const 0 i32.const {len})
  (func (export "operate") (param f64 f64) (result f64)
    {body}))"#,
        len = name.len(),
    )
}

/// Writes a package with one operation module and a manifest pointing at it
pub fn operation_package(
    dir: &Path,
    file: &str,
    name: &str,
    entry_point: &str,
    instruction: &str,
) -> PathBuf {
    let manifest = manifest(entry_point);
    let entry = module_entry(entry_point);
    let module = operation_wat(name, instruction);
    write_package(
        dir,
        file,
        &[
            ("plugin.properties", manifest.as_str()),
            (entry.as_str(), module.as_str()),
        ],
    )
}

/// Writes the four arithmetic packages into `dir`
pub fn arithmetic_packages(dir: &Path) -> Vec<PathBuf> {
    ARITHMETIC
        .iter()
        .map(|(name, entry_point, instruction)| {
            let file = format!("{}.zip", name.to_lowercase());
            operation_package(dir, &file, name, entry_point, instruction)
        })
        .collect()
}
