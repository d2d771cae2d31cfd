//! Progress-callback trait for per-file conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each input image.
//!
//! # Example
//!
//! ```rust
//! use edgequake_imgconv::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("File {}/{} done ({} bytes)", index + 1, total, output_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each file.
///
/// Files are converted concurrently, so `on_file_*` methods may be called
/// from different threads and out of order. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any file is decoded.
    fn on_conversion_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file's pipeline starts.
    ///
    /// # Arguments
    /// * `index` — 0-based position of the file in the input list
    /// * `total` — number of files in the operation
    /// * `name`  — source file name
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file converted successfully.
    fn on_file_complete(&self, index: usize, total: usize, output_len: usize) {
        let _ = (index, total, output_len);
    }

    /// Called when a file failed. The operation as a whole fails with it.
    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every file succeeded and the output is assembled.
    /// Never called for a failed operation; files still in flight at that
    /// point may report `on_file_*` events after the call has returned.
    fn on_conversion_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
