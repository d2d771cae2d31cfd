//! Configuration types for image conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so the
//! same config can be shared by every file of a batch and logged as a whole.

use crate::error::ImgConvError;
use crate::pipeline::vectorize::VectorModel;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a conversion operation.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_imgconv::{ConversionConfig, TargetFormat};
///
/// let config = ConversionConfig::builder()
///     .target_format(TargetFormat::Jpeg)
///     .quality(80)
///     .width(640)
///     .build()
///     .unwrap();
/// assert_eq!(config.quality.fraction(), 0.8);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Output format. Default: [`TargetFormat::Png`].
    pub target_format: TargetFormat,

    /// Encoder quality. Only lossy formats consult it. Default: 90%.
    pub quality: Quality,

    /// Keep the alpha channel for PNG/WebP. Ignored for JPEG, which is always
    /// composited onto white. Default: true.
    pub preserve_transparency: bool,

    /// Requested output width in pixels.
    pub width: Option<u32>,

    /// Requested output height in pixels.
    pub height: Option<u32>,

    /// Accepted for compatibility. When both `width` and `height` are given
    /// they are used verbatim regardless of this flag. Default: true.
    pub maintain_aspect_ratio: bool,

    /// Cap on files in flight at once, which also caps concurrent VLM calls.
    /// Default: None (every file is dispatched at once).
    pub concurrency: Option<usize>,

    /// LLM model identifier for the AI vectorizer, e.g. "gemini-2.5-flash".
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama"). Default: gemini.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed vector model. Takes precedence over `provider`.
    pub vector_model: Option<Arc<dyn VectorModel>>,

    /// Environment variable holding the API credential. When `None` the
    /// provider's conventional variable is used (e.g. `GEMINI_API_KEY`).
    pub credential_var: Option<String>,

    /// Sampling temperature for the vectorizer. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 4096.
    pub max_tokens: usize,

    /// Extra attempts after a transport failure. Malformed responses are
    /// never retried. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-VLM-call timeout in seconds. Default: None (no timeout).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target_format: TargetFormat::default(),
            quality: Quality::default(),
            preserve_transparency: true,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            concurrency: None,
            model: None,
            provider_name: None,
            provider: None,
            vector_model: None,
            credential_var: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("target_format", &self.target_format)
            .field("quality", &self.quality)
            .field("preserve_transparency", &self.preserve_transparency)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("maintain_aspect_ratio", &self.maintain_aspect_ratio)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("vector_model", &self.vector_model.as_ref().map(|_| "<dyn VectorModel>"))
            .field("credential_var", &self.credential_var)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn target_format(mut self, format: TargetFormat) -> Self {
        self.config.target_format = format;
        self
    }

    /// Quality as an integer percent. Out-of-range values fail in [`build`](Self::build).
    pub fn quality(mut self, percent: u8) -> Self {
        self.config.quality = Quality(percent);
        self
    }

    pub fn preserve_transparency(mut self, v: bool) -> Self {
        self.config.preserve_transparency = v;
        self
    }

    pub fn width(mut self, px: u32) -> Self {
        self.config.width = Some(px);
        self
    }

    pub fn height(mut self, px: u32) -> Self {
        self.config.height = Some(px);
        self
    }

    pub fn maintain_aspect_ratio(mut self, v: bool) -> Self {
        self.config.maintain_aspect_ratio = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = Some(n);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn vector_model(mut self, model: Arc<dyn VectorModel>) -> Self {
        self.config.vector_model = Some(model);
        self
    }

    pub fn credential_var(mut self, var: impl Into<String>) -> Self {
        self.config.credential_var = Some(var.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ImgConvError> {
        let c = &self.config;
        Quality::from_percent(c.quality.percent())?;
        if c.width == Some(0) || c.height == Some(0) {
            return Err(ImgConvError::InvalidConfig(format!(
                "Width and height must be positive, got {:?}x{:?}",
                c.width, c.height
            )));
        }
        if c.concurrency == Some(0) {
            return Err(ImgConvError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Quality ──────────────────────────────────────────────────────────────

/// Lossy-encoder quality, stored as the caller's integer percent (1–100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(u8);

impl Quality {
    pub fn from_percent(percent: u8) -> Result<Self, ImgConvError> {
        if (1..=100).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(ImgConvError::InvalidConfig(format!(
                "Quality must be 1–100, got {percent}"
            )))
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// `percent / 100`, with no further rounding.
    pub fn fraction(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

// ── Formats ──────────────────────────────────────────────────────────────

/// Requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    /// SVG document embedding the unmodified source raster.
    SvgWrap,
    /// Android vector drawable synthesised by a vision LLM.
    AiVector,
}

/// Raster formats the encoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterFormat {
    Png,
    Jpeg,
    Webp,
}

/// The pipeline branch a target format is handled by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Raster(RasterFormat),
    VectorWrap,
    AiVector,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 5] = [
        TargetFormat::Png,
        TargetFormat::Jpeg,
        TargetFormat::Webp,
        TargetFormat::SvgWrap,
        TargetFormat::AiVector,
    ];

    pub fn route(self) -> Route {
        match self {
            TargetFormat::Png => Route::Raster(RasterFormat::Png),
            TargetFormat::Jpeg => Route::Raster(RasterFormat::Jpeg),
            TargetFormat::Webp => Route::Raster(RasterFormat::Webp),
            TargetFormat::SvgWrap => Route::VectorWrap,
            TargetFormat::AiVector => Route::AiVector,
        }
    }

    /// File extension of the converted output.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Webp => "webp",
            TargetFormat::SvgWrap => "svg",
            TargetFormat::AiVector => "xml",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self.route() {
            Route::Raster(raster) => raster.mime_type(),
            Route::VectorWrap => "image/svg+xml",
            Route::AiVector => "application/xml",
        }
    }

    /// The name used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Webp => "webp",
            TargetFormat::SvgWrap => "svg-wrap",
            TargetFormat::AiVector => "ai-vector",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = ImgConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(TargetFormat::Png),
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            "webp" => Ok(TargetFormat::Webp),
            "svg-wrap" | "svg" => Ok(TargetFormat::SvgWrap),
            "ai-vector" | "xml" => Ok(TargetFormat::AiVector),
            other => Err(ImgConvError::InvalidConfig(format!(
                "Unknown target format '{other}' (expected png, jpeg, webp, svg-wrap or ai-vector)"
            ))),
        }
    }
}

impl RasterFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::Webp => "image/webp",
        }
    }

    pub fn has_alpha(self) -> bool {
        !matches!(self, RasterFormat::Jpeg)
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, RasterFormat::Jpeg | RasterFormat::Webp)
    }
}
