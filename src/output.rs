//! Output types: payloads, per-file results and the overall conversion output.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Name of the archive produced when more than one image is converted.
pub const ARCHIVE_NAME: &str = "converted-images.zip";

/// Encoded bytes together with their mime type.
///
/// Produced once at decode time for the source image and once per encoder
/// for the output, so no stage ever re-parses a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Payload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One converted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// `<source-base-name>.<target-extension>`
    pub name: String,
    pub payload: Payload,
}

/// Several results packed into one ZIP.
#[derive(Debug, Clone)]
pub struct BatchArchive {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Entry names in archive order.
    pub entries: Vec<String>,
}

/// What a conversion hands back: the single result, or an archive of all of them.
#[derive(Debug, Clone)]
pub enum ConvertedFile {
    Single(ConversionResult),
    Archive(BatchArchive),
}

impl ConvertedFile {
    /// Conventional download name.
    pub fn file_name(&self) -> &str {
        match self {
            ConvertedFile::Single(r) => &r.name,
            ConvertedFile::Archive(a) => &a.name,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ConvertedFile::Single(r) => &r.payload.bytes,
            ConvertedFile::Archive(a) => &a.bytes,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            ConvertedFile::Single(r) => &r.payload.mime_type,
            ConvertedFile::Archive(_) => "application/zip",
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, ConvertedFile::Archive(_))
    }
}

/// Complete output of a conversion operation.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub file: ConvertedFile,
    pub stats: ConversionStats,
}

/// Aggregate statistics for a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_files: usize,
    pub total_input_bytes: u64,
    pub total_output_bytes: u64,
    pub total_duration_ms: u64,
    /// Time spent packaging; zero for single-file runs.
    pub packaging_duration_ms: u64,
}

/// Basic facts about a source image, read without converting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub byte_size: usize,
}
