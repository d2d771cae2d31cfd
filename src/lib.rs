//! # edgequake-imgconv
//!
//! Convert images between PNG, JPEG and WebP, wrap them in SVG, or have a
//! Vision Language Model redraw them as Android vector drawables.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image(s)
//!  │
//!  ├─ 1. Input    resolve local files or download URLs
//!  ├─ 2. Decode   sniff PNG / JPEG / WebP, keep the original bytes
//!  ├─ 3. Plan     output size (one side given → aspect ratio kept)
//!  ├─ 4. Render   one of:
//!  │      • raster     scoped surface → PNG / JPEG / WebP
//!  │      • svg-wrap   original raster inlined in an <svg>
//!  │      • ai-vector  VLM call, response must be <vector>…</vector>
//!  └─ 5. Package  one file as-is, several as converted-images.zip
//! ```
//!
//! Files are converted concurrently; one failure fails the whole operation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_imgconv::{convert, ConversionConfig, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .target_format(TargetFormat::Webp)
//!         .width(512)
//!         .build()?;
//!     let output = convert(["photo.png", "logo.jpg"], &config).await?;
//!     std::fs::write(output.file.file_name(), output.file.bytes())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgconv` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## AI vectorization
//!
//! `ai-vector` needs a vision model. The provider defaults to Gemini
//! (`GEMINI_API_KEY`); `openai`, `anthropic`, `azure`, `mistral`,
//! `openrouter`, `ollama` and `lmstudio` are also accepted. Without the
//! credential the conversion fails before any request is sent.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, Quality, RasterFormat, Route, TargetFormat};
pub use convert::{convert, convert_bytes, convert_files, convert_sync, convert_to_file, inspect};
pub use error::{ImgConvError, VectorizationError, GENERIC_FAILURE_MESSAGE};
pub use output::{
    BatchArchive, ConversionOutput, ConversionResult, ConversionStats, ConvertedFile, ImageMetadata,
    Payload, ARCHIVE_NAME,
};
pub use pipeline::input::SourceFile;
pub use pipeline::vectorize::{LlmVectorModel, VectorModel};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
