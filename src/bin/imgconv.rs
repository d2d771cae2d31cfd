//! CLI binary for edgequake-imgconv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes the result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_imgconv::{
    convert, convert_to_file, inspect, ConversionConfig, ConversionProgressCallback,
    ConversionStats, ImgConvError, ProgressCallback, TargetFormat, GENERIC_FAILURE_MESSAGE,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar. Files finish out of order, so every line names
/// its file.
struct CliProgressCallback {
    bar: ProgressBar,
    names: std::sync::Mutex<Vec<String>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            names: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Stop the spinner after a failed run, leaving finished lines in place.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }

    fn name_of(&self, index: usize) -> String {
        self.names
            .lock()
            .ok()
            .and_then(|names| names.get(index).cloned())
            .unwrap_or_else(|| format!("#{}", index + 1))
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        if let Ok(mut names) = self.names.lock() {
            names.resize(total_files, String::new());
        }
    }

    fn on_file_start(&self, index: usize, _total: usize, name: &str) {
        if let Ok(mut names) = self.names.lock() {
            if let Some(slot) = names.get_mut(index) {
                *slot = name.to_string();
            }
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, _total: usize, output_len: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            self.name_of(index),
            dim(&format!("{output_len} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, _total: usize, _error: &str) {
        // Details go to the log; the user sees the generic message at the end.
        self.bar.println(format!("  {} {}", red("✗"), self.name_of(index)));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, _total_files: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PNG → JPEG at 80% quality
  imgconv photo.png --format jpeg --quality 80

  # Resize to 512px wide, keep aspect ratio
  imgconv banner.webp --format png --width 512

  # Several files → converted-images.zip
  imgconv a.png b.png c.jpg --format webp -o out/

  # Wrap a raster in an SVG container
  imgconv logo.png --format svg-wrap

  # Redraw an icon as an Android vector drawable (needs GEMINI_API_KEY)
  imgconv icon.png --format ai-vector

  # Inspect an image (no conversion)
  imgconv --inspect-only photo.jpg

FORMATS:
  png        lossless, keeps transparency unless --no-transparency
  jpeg       lossy (--quality), always on a white background
  webp       lossy (--quality), keeps transparency unless --no-transparency
  svg-wrap   SVG document embedding the original image
  ai-vector  Android vector drawable (.xml) generated by a vision LLM

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (default AI provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_PROVIDER      Override provider (gemini, openai, anthropic, ollama, …)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Convert images between PNG, JPEG, WebP, SVG and AI vector drawables.
#[derive(Parser, Debug)]
#[command(
    name = "imgconv",
    version,
    about = "Convert images between PNG, JPEG, WebP, SVG and AI vector drawables",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file or directory. Default: conventional name in the current directory.
    #[arg(short, long, env = "IMGCONV_OUTPUT")]
    output: Option<PathBuf>,

    /// Target format: png, jpeg, webp, svg-wrap, ai-vector.
    #[arg(short, long, env = "IMGCONV_FORMAT", default_value = "png")]
    format: String,

    /// Quality percent for lossy formats (1–100).
    #[arg(long, env = "IMGCONV_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Flatten onto a white background even for PNG/WebP.
    #[arg(long, env = "IMGCONV_NO_TRANSPARENCY")]
    no_transparency: bool,

    /// Output width in pixels.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    height: Option<u32>,

    /// Do not keep the aspect ratio (only matters when one side is given).
    #[arg(long, env = "IMGCONV_NO_ASPECT_RATIO")]
    no_aspect_ratio: bool,

    /// Cap on files converted at the same time (default: no cap).
    #[arg(short, long, env = "IMGCONV_CONCURRENCY",
          value_parser = clap::value_parser!(u64).range(1..))]
    concurrency: Option<u64>,

    /// LLM provider for ai-vector: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID for ai-vector.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Per-call LLM timeout in seconds (default: none).
    #[arg(long, env = "IMGCONV_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Retries after an LLM transport failure.
    #[arg(long, env = "IMGCONV_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IMGCONV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print image metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print metadata / stats as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMGCONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMGCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMGCONV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The specific cause is for the log only.
            tracing::error!("{:#}", e);
            if let Some(kind) = e.downcast_ref::<ImgConvError>().map(ImgConvError::kind) {
                tracing::debug!(kind, "conversion failed");
            }
            eprintln!("{} {}", red("✘"), GENERIC_FAILURE_MESSAGE);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        for input in &cli.inputs {
            let meta = inspect(input).await.context("Failed to inspect image")?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
                );
            } else {
                println!("File:         {}", meta.name);
                println!("Type:         {}", meta.mime_type);
                println!("Dimensions:   {}x{}", meta.width, meta.height);
                println!("Size:         {} bytes", meta.byte_size);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);

    // ── Run conversion ───────────────────────────────────────────────────
    let converted = match build_config(cli, progress.clone().map(|cb| cb as ProgressCallback)) {
        Ok(config) => write_output(cli, &config).await,
        Err(e) => Err(e),
    };
    if converted.is_err() {
        if let Some(ref cb) = progress {
            cb.abandon();
        }
    }
    let (path, stats) = converted?;

    if cli.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        let mut stderr = io::stderr().lock();
        writeln!(
            stderr,
            "{}  {} file(s)  {}ms  →  {}",
            green("✔"),
            stats.total_files,
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        )
        .ok();
    }

    Ok(())
}

/// Convert and write to `-o` or to the conventional name in the current directory.
async fn write_output(cli: &Cli, config: &ConversionConfig) -> Result<(PathBuf, ConversionStats)> {
    match cli.output {
        Some(ref output_path) => convert_to_file(&cli.inputs, output_path, config)
            .await
            .context("Conversion failed"),
        None => {
            let output = convert(&cli.inputs, config)
                .await
                .context("Conversion failed")?;
            let path = PathBuf::from(output.file.file_name());
            std::fs::write(&path, output.file.bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok((path, output.stats))
        }
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let format: TargetFormat = cli.format.parse().context("Invalid --format")?;

    let mut builder = ConversionConfig::builder()
        .target_format(format)
        .quality(cli.quality)
        .preserve_transparency(!cli.no_transparency)
        .maintain_aspect_ratio(!cli.no_aspect_ratio)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout);

    if let Some(w) = cli.width {
        builder = builder.width(w);
    }
    if let Some(h) = cli.height {
        builder = builder.height(h);
    }
    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(usize::try_from(n).context("Invalid --concurrency")?);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
