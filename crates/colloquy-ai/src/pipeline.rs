use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use colloquy_core::config::PipelineConfig;
use colloquy_core::{
    ContentFilter, Exchange, ExchangeError, ExchangeFault, ExchangeStatus, MirrorRecord,
    MirrorSink, PolicySet, ResponseGenerator, Stage, TranscriptStore, Unavailable,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Runs one user submission through input filter → generator → output filter
/// and appends exactly one terminal [`Exchange`] to the session's store.
///
/// Holds no per-session state; the caller owns the [`TranscriptStore`].
pub struct ExchangePipeline {
    input_filter: Arc<dyn ContentFilter>,
    output_filter: Arc<dyn ContentFilter>,
    generator: Arc<dyn ResponseGenerator>,
    mirror: Option<MirrorQueue>,
    input_policies: PolicySet,
    output_policies: PolicySet,
    messages: PipelineConfig,
}

impl ExchangePipeline {
    /// Create a pipeline that uses `filter` for both input and output checks.
    pub fn new(filter: Arc<dyn ContentFilter>, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            input_filter: Arc::clone(&filter),
            output_filter: filter,
            generator,
            mirror: None,
            input_policies: PolicySet::new(colloquy_core::PolicyRule::input_defaults()),
            output_policies: PolicySet::new(colloquy_core::PolicyRule::output_defaults()),
            messages: PipelineConfig::default(),
        }
    }

    pub fn with_output_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.output_filter = filter;
        self
    }

    pub fn with_mirror(mut self, sink: Arc<dyn MirrorSink>) -> Self {
        self.mirror = Some(MirrorQueue::new(sink));
        self
    }

    pub fn with_policies(mut self, input: PolicySet, output: PolicySet) -> Self {
        self.input_policies = input;
        self.output_policies = output;
        self
    }

    pub fn with_messages(mut self, messages: PipelineConfig) -> Self {
        self.messages = messages;
        self
    }

    /// Resolve `raw_input` and append the resulting exchange to `store`.
    ///
    /// Blank input is rejected before any capability is called and leaves
    /// the store untouched. Every other input appends exactly one exchange.
    pub async fn submit<'s>(
        &self,
        store: &'s mut TranscriptStore,
        raw_input: &str,
    ) -> Result<&'s Exchange, ExchangeError> {
        let user_message = raw_input.trim();
        if user_message.is_empty() {
            return Err(ExchangeError::EmptyMessage);
        }

        let exchange = self.resolve(user_message).await;
        if let Some(queue) = &self.mirror {
            queue.push(MirrorRecord::from(&exchange));
        }
        Ok(store.append(exchange))
    }

    /// Run the state machine to a terminal exchange without storing it.
    pub async fn resolve(&self, user_message: &str) -> Exchange {
        match self.run(user_message).await {
            Ok(reply) => {
                tracing::info!("Exchange answered ({} chars)", reply.len());
                Exchange::answered(user_message, reply)
            }
            Err(fault) => {
                tracing::warn!("Exchange ended early: {fault}");
                self.exchange_for_fault(user_message, fault)
            }
        }
    }

    async fn run(&self, user_message: &str) -> Result<String, ExchangeFault> {
        tracing::debug!("Input filtering");
        self.screen(Stage::Input, user_message).await?;

        tracing::debug!("Generating");
        let reply = self
            .generator
            .generate(user_message)
            .await
            .map_err(ExchangeFault::GenerationUnavailable)?;
        if reply.trim().is_empty() {
            return Err(ExchangeFault::GenerationUnavailable(Unavailable::Malformed(
                "generator returned an empty reply".into(),
            )));
        }

        tracing::debug!("Output filtering");
        self.screen(Stage::Output, &reply).await?;
        Ok(reply)
    }

    async fn screen(&self, stage: Stage, text: &str) -> Result<(), ExchangeFault> {
        let (filter, policies) = match stage {
            Stage::Input => (&self.input_filter, &self.input_policies),
            Stage::Output => (&self.output_filter, &self.output_policies),
        };
        match filter.check(text, policies).await {
            Ok(verdict) if verdict.passed => Ok(()),
            Ok(verdict) => Err(ExchangeFault::FilterBlocked {
                stage,
                violations: verdict.violations,
            }),
            Err(cause) => Err(ExchangeFault::FilterUnavailable { stage, cause }),
        }
    }

    fn exchange_for_fault(&self, user_message: &str, fault: ExchangeFault) -> Exchange {
        let m = &self.messages;
        match fault {
            ExchangeFault::FilterUnavailable { stage: Stage::Input, .. } => Exchange::resolved(
                user_message,
                m.input_unavailable_message.as_str(),
                ExchangeStatus::BlockedInput,
                Vec::new(),
            ),
            ExchangeFault::FilterBlocked { stage: Stage::Input, violations } => Exchange::resolved(
                user_message,
                blocked_message(&m.input_blocked_prefix, &violations),
                ExchangeStatus::BlockedInput,
                violations,
            ),
            ExchangeFault::GenerationUnavailable(_) => Exchange::resolved(
                user_message,
                m.generation_failed_message.as_str(),
                ExchangeStatus::GenerationFailed,
                Vec::new(),
            ),
            ExchangeFault::FilterUnavailable { stage: Stage::Output, .. } => Exchange::resolved(
                user_message,
                m.output_unavailable_message.as_str(),
                ExchangeStatus::BlockedOutput,
                Vec::new(),
            ),
            ExchangeFault::FilterBlocked { stage: Stage::Output, violations } => Exchange::resolved(
                user_message,
                blocked_message(&m.output_blocked_prefix, &violations),
                ExchangeStatus::BlockedOutput,
                violations,
            ),
        }
    }

    /// Mirror writes queued but not yet finished.
    pub fn pending_mirror_writes(&self) -> usize {
        self.mirror.as_ref().map_or(0, MirrorQueue::pending)
    }

    /// Wait until every queued mirror write has finished. Called on shutdown.
    pub async fn flush_mirror(&self) {
        if let Some(queue) = &self.mirror {
            queue.flush().await;
        }
    }
}

impl Drop for ExchangePipeline {
    fn drop(&mut self) {
        let pending = self.pending_mirror_writes();
        if pending > 0 {
            tracing::warn!(
                "Pipeline dropped with {pending} mirror writes pending; \
                 they complete only while the runtime keeps running"
            );
        }
    }
}

/// Single writer task per pipeline. Records reach the sink in submission order.
struct MirrorQueue {
    sink: Arc<dyn MirrorSink>,
    worker: Mutex<Option<MirrorWorker>>,
    pending: Arc<AtomicUsize>,
}

struct MirrorWorker {
    tx: mpsc::UnboundedSender<MirrorRecord>,
    handle: JoinHandle<()>,
}

impl MirrorQueue {
    fn new(sink: Arc<dyn MirrorSink>) -> Self {
        Self {
            sink,
            worker: Mutex::new(None),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Queue `record`. The writer task starts on first use so that building a
    /// pipeline does not require a running runtime.
    fn push(&self, record: MirrorRecord) {
        let Ok(mut worker) = self.worker.lock() else {
            tracing::warn!("Mirror queue unavailable, dropping record {}", record.id);
            return;
        };
        let worker = worker.get_or_insert_with(|| self.start_worker());
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(record)) = worker.tx.send(record) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Mirror writer stopped, dropping record {}", record.id);
        }
    }

    fn start_worker(&self) -> MirrorWorker {
        let (tx, mut rx) = mpsc::unbounded_channel::<MirrorRecord>();
        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending);
        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = sink.mirror(&record).await {
                    tracing::warn!("Mirror write failed for exchange {}: {e}", record.id);
                }
                pending.fetch_sub(1, Ordering::SeqCst);
            }
        });
        MirrorWorker { tx, handle }
    }

    /// Close the channel and wait for the writer to drain it. A later push
    /// starts a fresh writer.
    async fn flush(&self) {
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(MirrorWorker { tx, handle }) = worker else {
            return;
        };
        drop(tx);
        if let Err(e) = handle.await {
            tracing::warn!("Mirror writer aborted: {e}");
        }
    }
}

fn blocked_message(prefix: &str, violations: &[String]) -> String {
    if violations.is_empty() {
        format!("{prefix}content policy")
    } else {
        format!("{prefix}{}", violations.join(", "))
    }
}
