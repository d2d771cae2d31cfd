//! Conversion entry points.
//!
//! Every input file runs through its own pipeline:
//!
//! ```text
//! decode ──▶ plan ──▶ { rasterize | wrap_svg | vectorize } ──▶ ConversionResult
//! ```
//!
//! Files are dispatched concurrently (all at once unless `config.concurrency`
//! sets a cap) and the operation is all-or-nothing: the first failing file
//! fails the whole call and no partial results are returned. Files already
//! dispatched are not cancelled; they run to completion in the background and
//! their results are dropped. With more than one file the results
//! are packed into `converted-images.zip`; a single result is returned as-is.

use crate::config::{ConversionConfig, Route};
use crate::error::ImgConvError;
use crate::output::{ConversionOutput, ConversionResult, ConversionStats, ConvertedFile, ImageMetadata};
use crate::pipeline::input::{self, SourceFile};
use crate::pipeline::vectorize::{self, VectorModel};
use crate::pipeline::{decode, package, plan, raster, vector_wrap};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Convert image files or URLs.
///
/// # Arguments
/// * `inputs` — local file paths or HTTP/HTTPS URLs, in output order
/// * `config` — conversion configuration
///
/// # Errors
/// Any failure of any file: unreadable input, undecodable bytes, impossible
/// dimensions, encoder failure, vectorizer failure, archive failure.
pub async fn convert<I, S>(inputs: I, config: &ConversionConfig) -> Result<ConversionOutput, ImgConvError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let files = input::resolve_inputs(inputs, config.download_timeout_secs).await?;
    convert_files(files, config).await
}

/// Convert a single in-memory image.
pub async fn convert_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ImgConvError> {
    convert_files(vec![SourceFile::new(name, bytes)], config).await
}

/// Convert in-memory images.
pub async fn convert_files(
    files: Vec<SourceFile>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ImgConvError> {
    let total_start = Instant::now();
    if files.is_empty() {
        return Err(ImgConvError::NoInputs);
    }

    let total = files.len();
    let total_input_bytes: u64 = files.iter().map(|f| f.bytes.len() as u64).sum();
    info!(
        "Starting conversion of {} file(s) to {}",
        total, config.target_format
    );

    if config.width.is_some() && config.height.is_some() && config.maintain_aspect_ratio {
        warn!("Both width and height given: they are used as-is and the aspect ratio is not kept");
    }

    // Resolved once; a missing credential fails here, before any file is touched.
    let model = match config.target_format.route() {
        Route::AiVector => Some(vectorize::resolve_model(config).map_err(|e| {
            error!(kind = e.kind(), "Vectorizer unavailable: {}", e);
            ImgConvError::from(e)
        })?),
        Route::Raster(_) | Route::VectorWrap => None,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total);
    }

    // At most `limit` files in flight; a zero cap would never poll anything.
    let limit = config.concurrency.unwrap_or(total).max(1);
    let shared = Arc::new(config.clone());

    // Each file runs as its own task. When one fails the call returns at
    // once, and tasks already dispatched are detached, not cancelled.
    let mut indexed: Vec<(usize, ConversionResult)> =
        stream::iter(files.into_iter().enumerate().map(|(index, file)| {
            let config = Arc::clone(&shared);
            let model = model.clone();
            tokio::spawn(async move { run_file(index, total, file, &config, model).await })
        }))
        .buffer_unordered(limit)
        .map(|joined| {
            joined.unwrap_or_else(|e| Err(ImgConvError::Internal(format!("File task panicked: {}", e))))
        })
        .try_collect()
        .await?;

    indexed.sort_by_key(|(index, _)| *index);
    let mut results: Vec<ConversionResult> = indexed.into_iter().map(|(_, r)| r).collect();

    let packaging_start = Instant::now();
    let file = if results.len() == 1 {
        ConvertedFile::Single(results.remove(0))
    } else {
        ConvertedFile::Archive(package::package(&results)?)
    };
    let packaging_duration_ms = if file.is_archive() {
        packaging_start.elapsed().as_millis() as u64
    } else {
        0
    };

    let stats = ConversionStats {
        total_files: total,
        total_input_bytes,
        total_output_bytes: file.bytes().len() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        packaging_duration_ms,
    };

    info!(
        "Conversion complete: {} file(s) → {} ({} bytes, {}ms)",
        total,
        file.file_name(),
        stats.total_output_bytes,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total, total);
    }

    Ok(ConversionOutput { file, stats })
}

/// Convert one file and report it to the progress callback.
async fn run_file(
    index: usize,
    total: usize,
    file: SourceFile,
    config: &ConversionConfig,
    model: Option<Arc<dyn VectorModel>>,
) -> Result<(usize, ConversionResult), ImgConvError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(index, total, &file.name);
    }
    let name = file.name.clone();
    match convert_one(file, config, model).await {
        Ok(result) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_complete(index, total, result.payload.len());
            }
            Ok((index, result))
        }
        Err(e) => {
            error!(kind = e.kind(), "{}: {}", name, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(index, total, &e.to_string());
            }
            Err(e)
        }
    }
}

/// Run one file through decode → plan → its format's handler.
async fn convert_one(
    file: SourceFile,
    config: &ConversionConfig,
    model: Option<Arc<dyn VectorModel>>,
) -> Result<ConversionResult, ImgConvError> {
    let output_name = format!("{}.{}", file.base_name(), config.target_format.extension());
    let source_name = file.name;

    let decoded = {
        let name = source_name.clone();
        let bytes = file.bytes;
        tokio::task::spawn_blocking(move || decode::decode_image(&name, bytes))
            .await
            .map_err(|e| ImgConvError::Internal(format!("Decode task panicked: {}", e)))??
    };

    let target = plan::plan_dimensions(decoded.width, decoded.height, config.width, config.height)?;
    debug!(
        "{}: {}x{} → {}x{}",
        source_name, decoded.width, decoded.height, target.width, target.height
    );

    let payload = match config.target_format.route() {
        Route::Raster(format) => {
            let quality = config.quality;
            let preserve = config.preserve_transparency;
            tokio::task::spawn_blocking(move || {
                raster::rasterize(&decoded, target, format, quality, preserve)
            })
            .await
            .map_err(|e| ImgConvError::Internal(format!("Encode task panicked: {}", e)))??
        }
        Route::VectorWrap => vector_wrap::wrap_svg(&decoded.source, target),
        Route::AiVector => {
            let model = model.ok_or_else(|| {
                ImgConvError::Internal("AI vectorizer requested without a model".to_string())
            })?;
            vectorize::vectorize(model.as_ref(), &source_name, &decoded.source, config).await?
        }
    };

    Ok(ConversionResult {
        name: output_name,
        payload,
    })
}

/// Convert and write the output to `output_path`.
///
/// When `output_path` is an existing directory the file is written inside it
/// under its conventional name (`<base>.<ext>` or `converted-images.zip`).
/// The write is atomic: a temp file in the same directory is renamed into place.
pub async fn convert_to_file<I, S>(
    inputs: I,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<(PathBuf, ConversionStats), ImgConvError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let output = convert(inputs, config).await?;
    let requested = output_path.as_ref();

    let path = if requested.is_dir() {
        requested.join(output.file.file_name())
    } else {
        requested.to_path_buf()
    };

    let bytes = output.file.bytes().to_vec();
    let target = path.clone();
    tokio::task::spawn_blocking(move || write_atomically(&target, &bytes))
        .await
        .map_err(|e| ImgConvError::Internal(format!("Write task panicked: {}", e)))??;

    info!("Wrote {}", path.display());
    Ok((path, output.stats))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ImgConvError> {
    let write_err = |source: std::io::Error| ImgConvError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<I, S>(inputs: I, config: &ConversionConfig) -> Result<ConversionOutput, ImgConvError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokio::runtime::Runtime::new()
        .map_err(|e| ImgConvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(inputs, config))
}

/// Read an image's format and size without converting it.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<ImageMetadata, ImgConvError> {
    let file = input::resolve_input(input_str.as_ref(), 120).await?;
    inspect_bytes(&file)
}

pub(crate) fn inspect_bytes(file: &SourceFile) -> Result<ImageMetadata, ImgConvError> {
    let decode_err = |detail: String| ImgConvError::Decode {
        name: file.name.clone(),
        detail,
    };

    let reader = image::ImageReader::new(Cursor::new(&file.bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| decode_err("unrecognised image format".to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| decode_err(e.to_string()))?;

    Ok(ImageMetadata {
        name: file.name.clone(),
        mime_type: format.to_mime_type().to_string(),
        width,
        height,
        byte_size: file.bytes.len(),
    })
}
