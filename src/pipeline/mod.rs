//! Pipeline stages for image conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//!                         ┌──▶ raster       (PNG / JPEG / WebP)
//! input ──▶ decode ──▶ plan ──▶ vector_wrap  (SVG around the source)   ──▶ package
//! (path/URL)  (image)  (dims) └──▶ vectorize  (VLM → vector drawable)      (ZIP, >1 file)
//! ```
//!
//! 1. [`input`]       — read a local path or download a URL into memory
//! 2. [`decode`]      — sniff the container, decode pixels, keep the source payload
//! 3. [`plan`]        — resolve output dimensions from the requested sides
//! 4. [`raster`]      — draw onto a scoped surface and encode; runs in
//!    `spawn_blocking` because it is CPU-bound
//! 5. [`vector_wrap`] — embed the source raster in an SVG container
//! 6. [`vectorize`]   — the only stage with network I/O: one VLM call per file,
//!    structurally validated
//! 7. [`package`]     — ZIP all results when more than one file was converted

pub mod decode;
pub mod input;
pub mod package;
pub mod plan;
pub mod raster;
pub mod vector_wrap;
pub mod vectorize;
