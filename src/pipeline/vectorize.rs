//! AI vectorization: ask a vision LLM to redraw the image as an Android
//! vector drawable, then refuse anything that is not a bare `<vector>` document.
//!
//! ## Lifecycle of one file
//!
//! ```text
//! Idle ─▶ CredentialCheck ─▶ Submitted ─▶ Validating ─▶ Succeeded
//!              │                 │             │
//!              ▼                 ▼             ▼
//!     MissingCredential      Transport   MalformedResponse
//! ```
//!
//! The credential check happens in [`resolve_model`], before any provider is
//! built, so a missing key never reaches the network. Each file makes one
//! call. Extra attempts happen only when `max_retries > 0` and only after a
//! transport failure; a model that answers with prose or fenced code is
//! rejected, not asked again.

use crate::config::ConversionConfig;
use crate::error::VectorizationError;
use crate::output::Payload;
use crate::prompts::VECTOR_DRAWABLE_PROMPT;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

pub const VECTOR_XML_MIME: &str = "application/xml";

/// Provider used when none is configured.
pub const DEFAULT_PROVIDER: &str = "gemini";

const OPEN_TAG: &str = "<vector";
const CLOSE_TAG: &str = "</vector>";

/// Something that turns an image plus a prompt into text.
///
/// The production implementation is [`LlmVectorModel`]; tests plug in a
/// canned model so no network is involved.
pub trait VectorModel: Send + Sync {
    fn generate<'a>(
        &'a self,
        image: &'a Payload,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, VectorizationError>>;
}

/// [`VectorModel`] backed by an `edgequake-llm` provider.
pub struct LlmVectorModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmVectorModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
        }
    }
}

impl VectorModel for LlmVectorModel {
    fn generate<'a>(
        &'a self,
        image: &'a Payload,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, VectorizationError>> {
        Box::pin(async move {
            let image_data = ImageData::new(STANDARD.encode(&image.bytes), image.mime_type.as_str());
            let messages = vec![ChatMessage::user_with_images(prompt, vec![image_data])];

            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| VectorizationError::Transport {
                    detail: e.to_string(),
                })?;

            debug!(
                "Vectorizer: {} input tokens, {} output tokens",
                response.prompt_tokens, response.completion_tokens
            );
            Ok(response.content)
        })
    }
}

/// Resolve the model for the AI route, checking the credential first.
///
/// 1. **Pre-built model** (`config.vector_model`): used as-is.
/// 2. **Pre-built provider** (`config.provider`): wrapped in [`LlmVectorModel`];
///    it already holds its credential.
/// 3. **Named provider** (`config.provider_name`, default `gemini`): the
///    credential variable (`config.credential_var` or the provider's
///    conventional one) must be set, otherwise
///    [`VectorizationError::MissingCredential`] and nothing is built.
pub fn resolve_model(config: &ConversionConfig) -> Result<Arc<dyn VectorModel>, VectorizationError> {
    if let Some(ref model) = config.vector_model {
        return Ok(Arc::clone(model));
    }

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(LlmVectorModel::new(Arc::clone(provider), config)));
    }

    let provider_name = config.provider_name.as_deref().unwrap_or(DEFAULT_PROVIDER);
    let env_var = match config.credential_var.as_deref() {
        Some(var) => Some(var),
        None => credential_var_for(provider_name)?,
    };

    if let Some(var) = env_var {
        let present = std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false);
        if !present {
            return Err(VectorizationError::MissingCredential {
                provider: provider_name.to_string(),
                env_var: var.to_string(),
            });
        }
    }

    let model = config
        .model
        .as_deref()
        .unwrap_or_else(|| default_model(provider_name));
    info!("Vectorizer: provider {} model {}", provider_name, model);

    let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        VectorizationError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })?;

    Ok(Arc::new(LlmVectorModel::new(provider, config)))
}

/// Conventional credential variable per provider. `Ok(None)` for local
/// providers that need no key.
fn credential_var_for(provider: &str) -> Result<Option<&'static str>, VectorizationError> {
    match provider {
        "gemini" => Ok(Some("GEMINI_API_KEY")),
        "openai" => Ok(Some("OPENAI_API_KEY")),
        "anthropic" => Ok(Some("ANTHROPIC_API_KEY")),
        "azure" => Ok(Some("AZURE_OPENAI_API_KEY")),
        "mistral" => Ok(Some("MISTRAL_API_KEY")),
        "openrouter" => Ok(Some("OPENROUTER_API_KEY")),
        "ollama" | "lmstudio" => Ok(None),
        other => Err(VectorizationError::ProviderNotConfigured {
            provider: other.to_string(),
            hint: "Unknown provider. Use gemini, openai, anthropic, azure, mistral, \
                   openrouter, ollama or lmstudio, or set a credential variable explicitly."
                .to_string(),
        }),
    }
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" | "azure" => "gpt-4.1-mini",
        "anthropic" => "claude-sonnet-4-20250514",
        "ollama" => "llama3.2-vision",
        _ => "gemini-2.5-flash",
    }
}

/// Accept `text` only if, trimmed, it runs from `<vector` to `</vector>`.
pub fn validate_vector_markup(text: &str) -> Result<String, VectorizationError> {
    let trimmed = text.trim();
    if trimmed.starts_with(OPEN_TAG) && trimmed.ends_with(CLOSE_TAG) {
        Ok(trimmed.to_string())
    } else {
        Err(VectorizationError::MalformedResponse {
            preview: trimmed.chars().take(40).collect(),
        })
    }
}

/// Longest wait between two attempts.
const MAX_BACKOFF_MS: u64 = 60_000;

/// `base_ms * 2^(attempt-1)`, saturating and capped at [`MAX_BACKOFF_MS`].
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Vectorize one source image.
///
/// `name` only labels log lines.
pub async fn vectorize(
    model: &dyn VectorModel,
    name: &str,
    source: &Payload,
    config: &ConversionConfig,
) -> Result<Payload, VectorizationError> {
    let start = Instant::now();
    let mut last_err: Option<VectorizationError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_delay(config.retry_backoff_ms, attempt);
            warn!(
                "{}: vectorizer retry {}/{} after {:?}",
                name, attempt, config.max_retries, backoff
            );
            sleep(backoff).await;
        }

        let call = model.generate(source, VECTOR_DRAWABLE_PROMPT);
        let outcome = match config.api_timeout_secs {
            Some(secs) => timeout(Duration::from_secs(secs), call)
                .await
                .unwrap_or_else(|_| {
                    Err(VectorizationError::Transport {
                        detail: format!("no response within {secs}s"),
                    })
                }),
            None => call.await,
        };

        match outcome {
            Ok(text) => {
                let xml = validate_vector_markup(&text)?;
                debug!(
                    "{}: vector drawable of {} bytes in {:?}",
                    name,
                    xml.len(),
                    start.elapsed()
                );
                return Ok(Payload::new(VECTOR_XML_MIME, xml.into_bytes()));
            }
            Err(e) if e.is_retryable() => {
                warn!("{}: vectorizer attempt {} failed: {}", name, attempt + 1, e);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| VectorizationError::Transport {
        detail: "no attempt was made".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const DRAWABLE: &str = r##"<vector xmlns:android="http://schemas.android.com/apk/res/android"
    android:width="24dp" android:height="24dp"
    android:viewportWidth="24" android:viewportHeight="24">
  <path android:fillColor="#000" android:pathData="M0,0h24v24h-24z"/>
</vector>"##;

    /// Replays scripted outcomes, one per call.
    struct ScriptedModel {
        outcomes: Mutex<Vec<Result<String, VectorizationError>>>,
        calls: AtomicUsize,
        seen_prompt: Mutex<Option<String>>,
    }

    impl ScriptedModel {
        fn new(mut outcomes: Vec<Result<String, VectorizationError>>) -> Self {
            outcomes.reverse();
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
                seen_prompt: Mutex::new(None),
            }
        }
    }

    impl VectorModel for ScriptedModel {
        fn generate<'a>(
            &'a self,
            _image: &'a Payload,
            prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, VectorizationError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_prompt.lock().unwrap() = Some(prompt.to_string());
            let next = self.outcomes.lock().unwrap().pop().unwrap_or_else(|| {
                Err(VectorizationError::Transport {
                    detail: "script exhausted".into(),
                })
            });
            Box::pin(async move { next })
        }
    }

    struct HangingModel;

    impl VectorModel for HangingModel {
        fn generate<'a>(
            &'a self,
            _image: &'a Payload,
            _prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, VectorizationError>> {
            Box::pin(futures::future::pending())
        }
    }

    fn source() -> Payload {
        Payload::new("image/png", vec![1, 2, 3])
    }

    fn transport() -> VectorizationError {
        VectorizationError::Transport {
            detail: "connection reset".into(),
        }
    }

    #[test]
    fn accepts_bare_vector_document() {
        let xml = validate_vector_markup(&format!("\n  {DRAWABLE}\n\n")).unwrap();
        assert_eq!(xml, DRAWABLE);
    }

    #[test]
    fn rejects_fenced_or_chatty_responses() {
        let fenced = format!("```xml\n{DRAWABLE}\n```");
        let chatty = format!("Here is your icon:\n{DRAWABLE}");
        let trailing = format!("{DRAWABLE}\nHope this helps!");
        for bad in [fenced.as_str(), chatty.as_str(), trailing.as_str(), "", "<svg></svg>"] {
            let err = validate_vector_markup(bad).unwrap_err();
            assert!(
                matches!(err, VectorizationError::MalformedResponse { .. }),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn success_sends_fixed_prompt_once() {
        let model = ScriptedModel::new(vec![Ok(DRAWABLE.to_string())]);
        let config = ConversionConfig::default();

        let out = tokio_test::block_on(vectorize(&model, "icon.png", &source(), &config)).unwrap();
        assert_eq!(out.mime_type, VECTOR_XML_MIME);
        assert_eq!(out.bytes, DRAWABLE.as_bytes());
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            model.seen_prompt.lock().unwrap().as_deref(),
            Some(VECTOR_DRAWABLE_PROMPT)
        );
    }

    #[test]
    fn malformed_is_never_retried() {
        let model = ScriptedModel::new(vec![
            Ok("Sure! ```xml<vector/>```".to_string()),
            Ok(DRAWABLE.to_string()),
        ]);
        let config = ConversionConfig::builder()
            .max_retries(3)
            .retry_backoff_ms(1)
            .build()
            .unwrap();

        let err = tokio_test::block_on(vectorize(&model, "icon.png", &source(), &config)).unwrap_err();
        assert!(matches!(err, VectorizationError::MalformedResponse { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transport_failure_without_retries_fails_after_one_call() {
        let model = ScriptedModel::new(vec![Err(transport()), Ok(DRAWABLE.to_string())]);
        let config = ConversionConfig::default();

        let err = tokio_test::block_on(vectorize(&model, "icon.png", &source(), &config)).unwrap_err();
        assert!(matches!(err, VectorizationError::Transport { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_retried_when_enabled() {
        let model = ScriptedModel::new(vec![Err(transport()), Ok(DRAWABLE.to_string())]);
        let config = ConversionConfig::builder()
            .max_retries(1)
            .retry_backoff_ms(1)
            .build()
            .unwrap();

        let out = vectorize(&model, "icon.png", &source(), &config).await.unwrap();
        assert_eq!(out.bytes, DRAWABLE.as_bytes());
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(500, 70), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(0, 70), Duration::ZERO);
    }

    #[tokio::test]
    async fn many_retries_do_not_overflow() {
        // An empty script answers every call with a transport failure.
        let model = ScriptedModel::new(vec![]);
        let config = ConversionConfig::builder()
            .max_retries(70)
            .retry_backoff_ms(0)
            .build()
            .unwrap();

        let err = vectorize(&model, "icon.png", &source(), &config).await.unwrap_err();
        assert!(matches!(err, VectorizationError::Transport { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 71);
    }

    #[tokio::test]
    async fn timeout_is_a_transport_failure() {
        let config = ConversionConfig::builder().api_timeout_secs(1).build().unwrap();
        let err = vectorize(&HangingModel, "icon.png", &source(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorizationError::Transport { ref detail } if detail.contains("1s")));
    }

    #[test]
    fn missing_credential_builds_nothing() {
        let config = ConversionConfig::builder()
            .provider_name("openai")
            .credential_var("EDGEQUAKE_IMGCONV_TEST_UNSET_CREDENTIAL")
            .build()
            .unwrap();

        match resolve_model(&config) {
            Err(VectorizationError::MissingCredential { provider, env_var }) => {
                assert_eq!(provider, "openai");
                assert_eq!(env_var, "EDGEQUAKE_IMGCONV_TEST_UNSET_CREDENTIAL");
            }
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("resolved a model without a credential"),
        }
    }

    #[test]
    fn unknown_provider_is_not_configured() {
        let config = ConversionConfig::builder()
            .provider_name("carrier-pigeon")
            .build()
            .unwrap();
        assert!(matches!(
            resolve_model(&config),
            Err(VectorizationError::ProviderNotConfigured { .. })
        ));
    }

    #[test]
    fn prebuilt_model_skips_credential_check() {
        let model: Arc<dyn VectorModel> = Arc::new(ScriptedModel::new(vec![]));
        let config = ConversionConfig::builder()
            .vector_model(Arc::clone(&model))
            .credential_var("EDGEQUAKE_IMGCONV_TEST_UNSET_CREDENTIAL")
            .build()
            .unwrap();
        assert!(resolve_model(&config).is_ok());
    }

    #[test]
    fn credential_vars() {
        assert_eq!(credential_var_for("gemini").unwrap(), Some("GEMINI_API_KEY"));
        assert_eq!(credential_var_for("ollama").unwrap(), None);
        assert_eq!(default_model("gemini"), "gemini-2.5-flash");
    }
}
