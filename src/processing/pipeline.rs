//! Request-scoped orchestration of extract → segment → summarize → synthesize.
//!
//! Each call to [`SummaryPipeline::run`] walks one request through
//! `Idle → Extracting → Segmenting → Summarizing → Synthesizing → Done | Failed` and returns a
//! [`PipelineReport`] holding the visited stages and the terminal state.
//!
//! Chunk summaries fan out onto a [`JoinSet`]. The first failed chunk ends the run and dropping
//! the set aborts the calls still in flight, so a doomed request stops spending tokens. Nothing is
//! retried here; retry policy belongs to the caller.

use crate::{
    extract::TextExtractor,
    summarization::{GenerationClient, GenerationError},
};
use futures_util::FutureExt;
use std::{collections::BTreeSet, panic::AssertUnwindSafe, sync::Arc};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    chunking::{DEFAULT_MAX_CHUNK_SIZE, segment},
    summarize::{summarize_chunk, synthesize},
    tier::{SummaryTier, TierPlan},
    types::{ChunkSummary, FinalSummary, PipelineError, PipelineStage, SourceDocument, TextChunk},
};

/// Tunables applied to every run of a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Maximum chunk length, in characters.
    pub max_chunk_size: usize,
    /// Cap on simultaneous chunk calls; `None` issues them all at once.
    pub max_concurrency: Option<usize>,
    /// Token ceiling for each generation request.
    pub max_tokens: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_concurrency: None,
            max_tokens: 4096,
        }
    }
}

/// Where the run obtains its text.
pub enum DocumentInput<'a> {
    /// Text already produced by an extractor.
    Extracted(SourceDocument),
    /// Raw bytes still to be handed to `extractor`.
    Raw {
        /// Extractor that turns the bytes into a [`SourceDocument`].
        extractor: &'a dyn TextExtractor,
        /// Document bytes.
        bytes: Vec<u8>,
    },
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum PipelineState {
    /// Run produced a summary.
    Done(FinalSummary),
    /// Run stopped; `stage` is where the error occurred.
    Failed {
        /// Stage that was active when the error surfaced.
        stage: PipelineStage,
        /// Originating error.
        error: PipelineError,
    },
}

/// Record of a single run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Identifier attached to every log line of the run.
    pub request_id: Uuid,
    /// Stages entered, in order, starting with `Idle`.
    pub transitions: Vec<PipelineStage>,
    /// How the run ended.
    pub state: PipelineState,
}

impl PipelineReport {
    /// Terminal stage (`Done` or `Failed`).
    pub fn final_stage(&self) -> PipelineStage {
        match self.state {
            PipelineState::Done(_) => PipelineStage::Done,
            PipelineState::Failed { .. } => PipelineStage::Failed,
        }
    }

    /// Collapse the report into the summary or the originating error.
    pub fn into_result(self) -> Result<FinalSummary, PipelineError> {
        match self.state {
            PipelineState::Done(summary) => Ok(summary),
            PipelineState::Failed { error, .. } => Err(error),
        }
    }
}

/// Stateless orchestrator shared across requests.
#[derive(Clone)]
pub struct SummaryPipeline {
    client: Arc<dyn GenerationClient>,
    options: PipelineOptions,
}

impl SummaryPipeline {
    /// Build a pipeline over `client`.
    pub fn new(client: Arc<dyn GenerationClient>, options: PipelineOptions) -> Self {
        Self { client, options }
    }

    /// Options the pipeline was built with.
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Run one request to completion.
    pub async fn run(&self, input: DocumentInput<'_>, tier: SummaryTier) -> PipelineReport {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("summarize", %request_id, %tier);
        let mut run = RunTracker::new(request_id);
        let result = self.drive(&mut run, input, tier).instrument(span.clone()).await;

        let state = span.in_scope(|| match result {
            Ok(summary) => {
                run.advance(PipelineStage::Done);
                tracing::info!(
                    chunks = summary.chunk_count,
                    words = summary.word_count(),
                    target_words = tier.target_word_count(),
                    "Summary completed"
                );
                PipelineState::Done(summary)
            }
            Err(error) => {
                let stage = run.stage;
                run.advance(PipelineStage::Failed);
                tracing::warn!(stage = ?stage, kind = error.kind(), error = %error, "Summary failed");
                PipelineState::Failed { stage, error }
            }
        });

        PipelineReport {
            request_id,
            transitions: run.transitions,
            state,
        }
    }

    async fn drive(
        &self,
        run: &mut RunTracker,
        input: DocumentInput<'_>,
        tier: SummaryTier,
    ) -> Result<FinalSummary, PipelineError> {
        let plan = TierPlan::resolve(tier);

        run.advance(PipelineStage::Extracting);
        let document = match input {
            DocumentInput::Extracted(document) => document,
            DocumentInput::Raw { extractor, bytes } => extractor.extract(bytes).await?,
        };
        tracing::debug!(
            chars = document.text.chars().count(),
            pages = ?document.metadata.page_count,
            title = ?document.metadata.title,
            "Document text available"
        );

        run.advance(PipelineStage::Segmenting);
        let chunks = segment(&document.text, self.options.max_chunk_size)?;
        if chunks.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }
        tracing::info!(
            chunks = chunks.len(),
            max_chunk_size = self.options.max_chunk_size,
            model = self.client.model(),
            "Document segmented"
        );

        run.advance(PipelineStage::Summarizing);
        let summaries = self.summarize_chunks(chunks, &plan).await?;

        run.advance(PipelineStage::Synthesizing);
        synthesize(
            self.client.as_ref(),
            summaries,
            &plan,
            &document.metadata,
            self.options.max_tokens,
        )
        .await
    }

    /// Fan out one call per chunk and wait for all of them, returning summaries in index order.
    async fn summarize_chunks(
        &self,
        chunks: Vec<TextChunk>,
        plan: &TierPlan,
    ) -> Result<Vec<ChunkSummary>, PipelineError> {
        let total = chunks.len();
        let limiter = self
            .options
            .max_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits)));
        let mut pending: BTreeSet<usize> = chunks.iter().map(|chunk| chunk.index).collect();
        let mut join_set = JoinSet::new();

        for chunk in chunks {
            let client = Arc::clone(&self.client);
            let limiter = limiter.clone();
            let instruction = plan.chunk_instruction;
            let max_tokens = self.options.max_tokens;
            join_set.spawn(
                async move {
                    let index = chunk.index;
                    let call = async {
                        let _permit = match limiter {
                            Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(
                                |_| PipelineError::ChunkSummarization {
                                    index,
                                    source: GenerationError::ProviderUnavailable(
                                        "concurrency limiter closed".into(),
                                    ),
                                },
                            )?),
                            None => None,
                        };
                        summarize_chunk(client.as_ref(), &chunk, instruction, max_tokens).await
                    };
                    (index, AssertUnwindSafe(call).catch_unwind().await)
                }
                .in_current_span(),
            );
        }

        let mut summaries = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            let outcome = match joined {
                Ok((index, Ok(result))) => {
                    pending.remove(&index);
                    result
                }
                Ok((index, Err(_panic))) => Err(PipelineError::ChunkSummarization {
                    index,
                    source: GenerationError::GenerationFailed("chunk task panicked".into()),
                }),
                // Panics are caught inside the task and abort_all only runs on the way out, so
                // this arm is reached only when the runtime shuts down mid-request. A cancelled
                // task carries no payload; report the lowest chunk still outstanding.
                Err(join_error) => Err(PipelineError::ChunkSummarization {
                    index: pending.first().copied().unwrap_or_default(),
                    source: GenerationError::GenerationFailed(format!(
                        "chunk task cancelled: {join_error}"
                    )),
                }),
            };

            match outcome {
                Ok(summary) => summaries.push(summary),
                Err(error) => {
                    let outstanding = join_set.len();
                    join_set.abort_all();
                    tracing::warn!(
                        outstanding,
                        error = %error,
                        "Chunk summarization failed; cancelling remaining chunks"
                    );
                    return Err(error);
                }
            }
        }

        summaries.sort_by_key(|summary| summary.index);
        tracing::debug!(summaries = summaries.len(), "All chunks summarized");
        Ok(summaries)
    }
}

struct RunTracker {
    request_id: Uuid,
    stage: PipelineStage,
    transitions: Vec<PipelineStage>,
}

impl RunTracker {
    fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            stage: PipelineStage::Idle,
            transitions: vec![PipelineStage::Idle],
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            is_valid_transition(self.stage, next),
            "invalid pipeline transition {:?} -> {next:?}",
            self.stage
        );
        tracing::debug!(request_id = %self.request_id, from = ?self.stage, to = ?next, "Pipeline transition");
        self.stage = next;
        self.transitions.push(next);
    }
}

fn is_valid_transition(from: PipelineStage, to: PipelineStage) -> bool {
    use PipelineStage::*;
    match (from, to) {
        (Idle, Extracting)
        | (Extracting, Segmenting)
        | (Segmenting, Summarizing)
        | (Summarizing, Synthesizing)
        | (Synthesizing, Done) => true,
        (from, Failed) => !from.is_terminal(),
        _ => false,
    }
}
