//! Error types for the edgequake-imgconv library.
//!
//! Two enums reflect two layers of failure:
//!
//! * [`ImgConvError`] — every failure that can end a conversion: unreadable
//!   input, undecodable bytes, impossible dimensions, encoder failure,
//!   archive assembly failure. Returned as `Err(ImgConvError)` from the
//!   top-level `convert*` functions.
//!
//! * [`VectorizationError`] — the AI vectorizer's own failure family
//!   (missing credential, malformed model output, transport failure). It is
//!   wrapped in [`ImgConvError::Vectorization`] when it reaches the caller.
//!
//! Nothing in the pipeline recovers from its own errors: one failed file
//! fails the whole operation. End users only ever see
//! [`ImgConvError::user_message`]; the specific variant is for logs.

use std::path::PathBuf;
use thiserror::Error;

/// The single message shown to end users for any conversion failure.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Conversion failed. Please check your files and try again.";

/// All errors returned by the edgequake-imgconv library.
#[derive(Debug, Error)]
pub enum ImgConvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The conversion was started with an empty input list.
    #[error("No input images were given")]
    NoInputs,

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Bytes do not parse as a supported image container.
    #[error("Could not decode '{name}': {detail}")]
    Decode { name: String, detail: String },

    /// A resolved target dimension is zero.
    #[error("Invalid target dimensions {width}x{height}: both sides must be at least 1px")]
    Dimension { width: i64, height: i64 },

    /// The drawing surface could not be acquired or the codec failed.
    #[error("Encoding failed: {detail}")]
    Encoding { detail: String },

    /// The AI vectorizer failed.
    #[error(transparent)]
    Vectorization(#[from] VectorizationError),

    /// The batch archive could not be assembled.
    #[error("Failed to build archive: {detail}")]
    Packaging { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImgConvError {
    /// Stable name of the error kind, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ImgConvError::FileNotFound { .. } => "FileNotFound",
            ImgConvError::PermissionDenied { .. } => "PermissionDenied",
            ImgConvError::InvalidInput { .. } => "InvalidInput",
            ImgConvError::DownloadFailed { .. } => "DownloadFailed",
            ImgConvError::DownloadTimeout { .. } => "DownloadTimeout",
            ImgConvError::NoInputs => "NoInputs",
            ImgConvError::Decode { .. } => "DecodeError",
            ImgConvError::Dimension { .. } => "DimensionError",
            ImgConvError::Encoding { .. } => "EncodingError",
            ImgConvError::Vectorization(e) => e.kind(),
            ImgConvError::Packaging { .. } => "PackagingError",
            ImgConvError::OutputWriteFailed { .. } => "OutputWriteFailed",
            ImgConvError::InvalidConfig(_) => "InvalidConfig",
            ImgConvError::Internal(_) => "Internal",
        }
    }

    /// The user-facing message. Always the same generic text.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

/// Failures of the AI vectorizer.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum VectorizationError {
    /// No API credential is configured for the provider. No call was made.
    #[error("No API credential for provider '{provider}': set {env_var}")]
    MissingCredential { provider: String, env_var: String },

    /// The provider name is unknown or the provider could not be built.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model answered, but not with a bare `<vector>…</vector>` document.
    #[error("Model did not return a valid vector drawable (starts with {preview:?})")]
    MalformedResponse { preview: String },

    /// The call itself failed (network, HTTP status, timeout).
    #[error("Vectorization request failed: {detail}")]
    Transport { detail: String },
}

impl VectorizationError {
    pub fn kind(&self) -> &'static str {
        match self {
            VectorizationError::MissingCredential { .. } => "MissingCredentialError",
            VectorizationError::ProviderNotConfigured { .. } => "ProviderNotConfigured",
            VectorizationError::MalformedResponse { .. } => "MalformedResponseError",
            VectorizationError::Transport { .. } => "TransportError",
        }
    }

    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VectorizationError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_display() {
        let e = ImgConvError::Dimension { width: 0, height: 12 };
        assert!(e.to_string().contains("0x12"), "got: {e}");
    }

    #[test]
    fn vectorization_errors_are_transparent() {
        let e: ImgConvError = VectorizationError::MissingCredential {
            provider: "gemini".into(),
            env_var: "GEMINI_API_KEY".into(),
        }
        .into();
        assert!(e.to_string().contains("GEMINI_API_KEY"));
        assert_eq!(e.kind(), "MissingCredentialError");
    }

    #[test]
    fn user_message_is_generic_for_every_kind() {
        let errors = [
            ImgConvError::Decode {
                name: "a.png".into(),
                detail: "bad magic".into(),
            },
            ImgConvError::Packaging {
                detail: "disk full".into(),
            },
            VectorizationError::Transport {
                detail: "connection reset".into(),
            }
            .into(),
        ];
        for e in &errors {
            assert_eq!(e.user_message(), GENERIC_FAILURE_MESSAGE);
            assert!(!e.user_message().contains("a.png"));
        }
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(VectorizationError::Transport { detail: "x".into() }.is_retryable());
        assert!(!VectorizationError::MalformedResponse {
            preview: "```xml".into()
        }
        .is_retryable());
        assert!(!VectorizationError::MissingCredential {
            provider: "openai".into(),
            env_var: "OPENAI_API_KEY".into()
        }
        .is_retryable());
    }
}
