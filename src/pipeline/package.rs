//! Batch packaging: several converted files → one ZIP archive.
//!
//! Entries keep input order and take their bytes straight from each
//! [`Payload`](crate::output::Payload). Two inputs with the same base name
//! would collide inside the archive, so later duplicates get a numeric
//! suffix: `icon.png`, `icon-2.png`, `icon-3.png`.

use crate::error::ImgConvError;
use crate::output::{BatchArchive, ConversionResult, ARCHIVE_NAME};
use crate::pipeline::input::base_name;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Pack `results` into one archive named [`ARCHIVE_NAME`].
pub fn package(results: &[ConversionResult]) -> Result<BatchArchive, ImgConvError> {
    let packaging_err = |e: &dyn std::fmt::Display| ImgConvError::Packaging {
        detail: e.to_string(),
    };

    let names = unique_entry_names(results.iter().map(|r| r.name.as_str()));
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (result, name) in results.iter().zip(&names) {
        writer
            .start_file(name.clone(), entry_options())
            .map_err(|e| packaging_err(&e))?;
        writer
            .write_all(&result.payload.bytes)
            .map_err(|e| packaging_err(&e))?;
        debug!("Archived {} ({} bytes)", name, result.payload.len());
    }

    let bytes = writer.finish().map_err(|e| packaging_err(&e))?.into_inner();

    Ok(BatchArchive {
        name: ARCHIVE_NAME.to_string(),
        bytes,
        entries: names,
    })
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Give every entry a distinct name, keeping the first occurrence as-is.
fn unique_entry_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for name in names {
        let mut candidate = name.to_string();
        let mut n = 2;
        while taken.contains(&candidate) {
            candidate = with_suffix(name, n);
            n += 1;
        }
        if candidate != name {
            warn!("Duplicate archive entry '{}' renamed to '{}'", name, candidate);
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

fn with_suffix(name: &str, n: usize) -> String {
    let base = base_name(name);
    match name.get(base.len()..) {
        Some(ext) if !ext.is_empty() => format!("{base}-{n}{ext}"),
        _ => format!("{name}-{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Payload;
    use std::io::Read;

    fn result(name: &str, bytes: &[u8]) -> ConversionResult {
        ConversionResult {
            name: name.to_string(),
            payload: Payload::new("image/png", bytes.to_vec()),
        }
    }

    fn read_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn entries_in_input_order_with_raw_bytes() {
        let archive = package(&[
            result("b.png", b"second"),
            result("a.svg", b"<svg/>"),
            result("c.xml", b"<vector/>"),
        ])
        .unwrap();

        assert_eq!(archive.name, "converted-images.zip");
        assert_eq!(archive.entries, vec!["b.png", "a.svg", "c.xml"]);
        assert_eq!(
            read_entries(&archive.bytes),
            vec![
                ("b.png".to_string(), b"second".to_vec()),
                ("a.svg".to_string(), b"<svg/>".to_vec()),
                ("c.xml".to_string(), b"<vector/>".to_vec()),
            ]
        );
    }

    #[test]
    fn duplicate_names_are_suffixed() {
        let archive = package(&[
            result("icon.png", b"1"),
            result("icon.png", b"2"),
            result("icon.png", b"3"),
            result("icon-2.png", b"4"),
        ])
        .unwrap();

        assert_eq!(
            archive.entries,
            vec!["icon.png", "icon-2.png", "icon-3.png", "icon-2-2.png"]
        );
        assert_eq!(read_entries(&archive.bytes).len(), 4);
    }

    #[test]
    fn suffix_without_extension() {
        assert_eq!(with_suffix("README", 2), "README-2");
        assert_eq!(with_suffix("a.b.png", 3), "a.b-3.png");
    }
}
