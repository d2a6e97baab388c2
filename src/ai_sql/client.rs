//! Local model client for SQL generation
//!
//! The inference session is not safe for concurrent use, so a dedicated
//! worker thread owns the backend, model and per-call context outright and
//! drains a FIFO request channel. Callers hand over a prompt and await a
//! oneshot reply; at most one generation is ever in flight. There is no
//! cancellation once a prompt has been submitted — a caller that times out
//! simply stops waiting for the reply.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::{mpsc as std_mpsc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use encoding_rs::UTF_8;
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::ai_sql::error::{AiError, AiResult};
use crate::config::AiConfig;

/// Blocking inference backend driven by the model worker.
///
/// The worker owns exactly one engine; splitting the trait out keeps the
/// queueing contract testable without model weights on disk.
pub trait CompletionEngine: Send {
    /// Run one prompt to completion and return the raw generated text.
    fn complete(&mut self, prompt: &str) -> AiResult<String>;
}

enum WorkerMessage {
    Generate {
        prompt: String,
        reply: oneshot::Sender<AiResult<String>>,
    },
    Shutdown,
}

/// Handle to the model worker.
///
/// `generate` is the one public operation: one prompt in, one completion out.
/// Concurrent callers queue in submission order. `shutdown` releases the
/// model exactly once and is safe to call repeatedly; dropping the client
/// without calling it shuts the worker down as well.
pub struct GenerationClient {
    sender: mpsc::UnboundedSender<WorkerMessage>,
    worker: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
}

impl GenerationClient {
    /// Start a client backed by a local GGUF model described in `config`.
    ///
    /// Fails before spawning anything when the model path is unset or the
    /// file is missing; fails after the worker reports back when the model
    /// cannot be loaded. There is no degraded mode — callers that need the
    /// assistant get a working one or an error.
    pub fn local(config: &AiConfig) -> AiResult<Self> {
        let path = config.model_path.clone().ok_or_else(|| {
            AiError::Configuration("model_path is not set in the [ai] config section".to_string())
        })?;
        if !path.is_file() {
            return Err(AiError::ArtifactNotFound(path));
        }

        let params = LlamaEngineParams {
            n_threads: config.n_threads,
            context_size: config.context_size,
            max_tokens: config.max_tokens,
        };
        let timeout = Duration::from_secs(config.generation_timeout_secs);
        Self::start(
            move || LlamaEngine::load(&path, params).map(|e| Box::new(e) as Box<dyn CompletionEngine>),
            timeout,
        )
    }

    /// Start the worker thread around an engine built by `factory`.
    ///
    /// The factory runs on the worker thread so the engine never crosses a
    /// thread boundary; construction errors are relayed back synchronously.
    pub fn start<F>(factory: F, timeout: Duration) -> AiResult<Self>
    where
        F: FnOnce() -> AiResult<Box<dyn CompletionEngine>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("model-worker".to_string())
            .spawn(move || {
                let engine = match factory() {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                worker_loop(engine, receiver);
            })
            .map_err(|e| AiError::Configuration(format!("failed to spawn model worker: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                sender,
                worker: Mutex::new(Some(handle)),
                timeout,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AiError::Generation(
                    "model worker exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    /// Submit one prompt and wait for its completion.
    pub async fn generate(&self, prompt: &str) -> AiResult<String> {
        if prompt.trim().is_empty() {
            return Err(AiError::EmptyPrompt);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(WorkerMessage::Generate {
                prompt: prompt.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| AiError::WorkerGone)?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AiError::WorkerGone),
            Err(_) => Err(AiError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    /// Stop the worker and release the model. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.sender.send(WorkerMessage::Shutdown);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("model worker panicked during shutdown");
            }
        }
    }
}

impl Drop for GenerationClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    mut engine: Box<dyn CompletionEngine>,
    mut receiver: mpsc::UnboundedReceiver<WorkerMessage>,
) {
    info!("model worker ready");
    while let Some(message) = receiver.blocking_recv() {
        match message {
            WorkerMessage::Generate { prompt, reply } => {
                debug!(prompt_chars = prompt.len(), "running generation request");
                let result = engine.complete(&prompt);
                // The caller may have timed out and dropped the receiver.
                let _ = reply.send(result);
            }
            WorkerMessage::Shutdown => break,
        }
    }
    info!("model worker stopped");
}

/// Tuning knobs for the llama engine, read from `[ai]` config.
#[derive(Debug, Clone, Copy)]
pub struct LlamaEngineParams {
    pub n_threads: i32,
    pub context_size: u32,
    pub max_tokens: usize,
}

/// llama.cpp-backed engine. Loads the GGUF artifact once; each completion
/// builds a fresh context so requests do not leak state into each other.
struct LlamaEngine {
    backend: LlamaBackend,
    model: LlamaModel,
    params: LlamaEngineParams,
}

impl LlamaEngine {
    fn load(path: &Path, params: LlamaEngineParams) -> AiResult<Self> {
        let backend = LlamaBackend::init()
            .map_err(|e| AiError::Generation(format!("llama backend init failed: {e}")))?;

        // CPU-only defaults; GPU offload stays at zero layers.
        let model_params = LlamaModelParams::default();
        let model = LlamaModel::load_from_file(&backend, path, &model_params).map_err(|e| {
            AiError::Configuration(format!("failed to load model {}: {e}", path.display()))
        })?;

        info!(model = %path.display(), "model artifact loaded");
        Ok(Self {
            backend,
            model,
            params,
        })
    }
}

impl CompletionEngine for LlamaEngine {
    fn complete(&mut self, prompt: &str) -> AiResult<String> {
        let ctx_params = LlamaContextParams::default()
            .with_n_threads(self.params.n_threads)
            .with_n_ctx(NonZeroU32::new(self.params.context_size));
        let mut context = self
            .model
            .new_context(&self.backend, ctx_params)
            .map_err(|e| AiError::Generation(format!("failed to create context: {e}")))?;

        let tokens = context
            .model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| AiError::Generation(format!("tokenization failed: {e}")))?;
        if tokens.is_empty() {
            return Err(AiError::Generation(
                "prompt tokenized to an empty sequence".to_string(),
            ));
        }
        let n_ctx = context.n_ctx() as usize;
        if tokens.len() >= n_ctx {
            return Err(AiError::Generation(format!(
                "prompt of {} tokens exceeds the {n_ctx} token context window",
                tokens.len()
            )));
        }

        let mut batch = LlamaBatch::new(n_ctx, 1);
        let last_index = (tokens.len() - 1) as i32;
        for (i, token) in (0_i32..).zip(tokens.into_iter()) {
            batch
                .add(token, i, &[0], i == last_index)
                .map_err(|e| AiError::Generation(format!("batch build failed: {e}")))?;
        }
        context
            .decode(&mut batch)
            .map_err(|e| AiError::Generation(format!("prompt decode failed: {e}")))?;

        let mut output = String::new();
        let mut decoder = UTF_8.new_decoder();
        let mut sampler =
            LlamaSampler::chain_simple([LlamaSampler::dist(1234), LlamaSampler::greedy()]);

        let mut n_cur = batch.n_tokens();
        let budget = n_cur + self.params.max_tokens as i32;
        while n_cur <= budget {
            let token = sampler.sample(&context, batch.n_tokens() - 1);
            sampler.accept(token);

            if context.model.is_eog_token(token) {
                break;
            }

            let bytes = context
                .model
                .token_to_bytes(token, Special::Tokenize)
                .map_err(|e| AiError::Generation(format!("token decode failed: {e}")))?;
            let mut piece = String::with_capacity(32);
            let _ = decoder.decode_to_string(&bytes, &mut piece, false);
            output.push_str(&piece);

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .map_err(|e| AiError::Generation(format!("batch build failed: {e}")))?;
            n_cur += 1;
            if n_cur as usize >= n_ctx {
                break;
            }

            context
                .decode(&mut batch)
                .map_err(|e| AiError::Generation(format!("decode failed: {e}")))?;
        }

        debug!(output_chars = output.len(), "completion finished");
        Ok(output.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    /// Engine that echoes the prompt after a fixed delay and asserts it is
    /// never entered twice at once.
    struct SlowEcho {
        delay: Duration,
        busy: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
    }

    impl CompletionEngine for SlowEcho {
        fn complete(&mut self, prompt: &str) -> AiResult<String> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(self.delay);
            self.busy.store(false, Ordering::SeqCst);
            Ok(format!("echo:{prompt}"))
        }
    }

    fn echo_client(delay: Duration, timeout: Duration) -> (GenerationClient, Arc<AtomicUsize>) {
        let overlaps = Arc::new(AtomicUsize::new(0));
        let overlaps_clone = Arc::clone(&overlaps);
        let client = GenerationClient::start(
            move || {
                Ok(Box::new(SlowEcho {
                    delay,
                    busy: Arc::new(AtomicBool::new(false)),
                    overlaps: overlaps_clone,
                }) as Box<dyn CompletionEngine>)
            },
            timeout,
        )
        .unwrap();
        (client, overlaps)
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_touching_the_worker() {
        let (client, _) = echo_client(Duration::from_millis(1), Duration::from_secs(5));
        assert!(matches!(client.generate("   ").await, Err(AiError::EmptyPrompt)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_are_serialized() {
        let per_call = Duration::from_millis(20);
        let (client, overlaps) = echo_client(per_call, Duration::from_secs(30));
        let client = Arc::new(client);

        let started = Instant::now();
        let mut tasks = Vec::new();
        for i in 0..10 {
            let client = Arc::clone(&client);
            tasks.push(tokio::spawn(async move {
                client.generate(&format!("prompt-{i}")).await
            }));
        }

        for (i, task) in tasks.into_iter().enumerate() {
            let completion = task.await.unwrap().unwrap();
            assert_eq!(completion, format!("echo:prompt-{i}"));
        }

        // Exclusivity: total wall time is at least the sum of serialized
        // per-call times, and the engine never saw overlapping entries.
        assert!(started.elapsed() >= per_call * 10);
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_generation_times_out() {
        let (client, _) = echo_client(Duration::from_millis(200), Duration::from_millis(30));
        match client.generate("anything").await {
            Err(AiError::Timeout { .. }) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_closes_the_queue() {
        let (client, _) = echo_client(Duration::from_millis(1), Duration::from_secs(5));
        client.shutdown();
        client.shutdown();
        assert!(matches!(
            client.generate("after shutdown").await,
            Err(AiError::WorkerGone)
        ));
    }

    #[tokio::test]
    async fn factory_failure_surfaces_from_the_constructor() {
        let result = GenerationClient::start(
            || Err(AiError::Configuration("no engine".to_string())),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(AiError::Configuration(_))));
    }

    #[test]
    fn local_requires_a_configured_model_path() {
        let config = AiConfig::default();
        assert!(matches!(
            GenerationClient::local(&config),
            Err(AiError::Configuration(_))
        ));
    }

    #[test]
    fn local_requires_the_artifact_to_exist() {
        let config = AiConfig {
            model_path: Some(PathBuf::from("/definitely/not/here.gguf")),
            ..AiConfig::default()
        };
        assert!(matches!(
            GenerationClient::local(&config),
            Err(AiError::ArtifactNotFound(_))
        ));
    }
}
