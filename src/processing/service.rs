//! Summary service shared by the HTTP surface and the CLI.

use crate::{
    config::Config,
    extract::{PdfExtractor, TextExtractor},
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        pipeline::{
            DocumentInput, PipelineOptions, PipelineReport, PipelineState, SummaryPipeline,
        },
        tier::SummaryTier,
        types::{PipelineError, SourceDocument, SummaryOutcome},
    },
    summarization::{
        GenerationClient, GenerationError, GenerationRequest, build_generation_client,
    },
};
use async_trait::async_trait;
use std::sync::Arc;

/// Owns the pipeline, the extractor, and the metrics registry.
///
/// Construct it once near process start and share it through an `Arc`. The service keeps no
/// per-request state; concurrent requests only share the generation client and counters.
pub struct SummaryService {
    pipeline: SummaryPipeline,
    extractor: Arc<dyn TextExtractor>,
    metrics: Arc<SummaryMetrics>,
}

/// Abstraction over the summary pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Extract and summarize a PDF at the named tier.
    async fn summarize_pdf(
        &self,
        bytes: Vec<u8>,
        tier: &str,
    ) -> Result<SummaryOutcome, PipelineError>;

    /// Summarize text that was extracted elsewhere.
    async fn summarize_text(
        &self,
        document: SourceDocument,
        tier: &str,
    ) -> Result<SummaryOutcome, PipelineError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummaryService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        client: Arc<dyn GenerationClient>,
        extractor: Arc<dyn TextExtractor>,
        options: PipelineOptions,
    ) -> Self {
        let metrics = Arc::new(SummaryMetrics::new());
        let client = Arc::new(CountingClient {
            inner: client,
            metrics: Arc::clone(&metrics),
        });
        Self {
            pipeline: SummaryPipeline::new(client, options),
            extractor,
            metrics,
        }
    }

    /// Build the service described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let client = build_generation_client(config)?;
        let extractor = Arc::new(PdfExtractor::new(config.max_upload_bytes));
        Ok(Self::new(
            client,
            extractor,
            PipelineOptions {
                max_chunk_size: config.max_chunk_size,
                max_concurrency: config.max_concurrency,
                max_tokens: config.llm_max_tokens,
            },
        ))
    }

    /// Run the pipeline on a document and return the full report.
    pub async fn run(&self, input: DocumentInput<'_>, tier: SummaryTier) -> PipelineReport {
        let report = self.pipeline.run(input, tier).await;
        match &report.state {
            PipelineState::Done(summary) => {
                self.metrics.record_document(summary.chunk_count as u64);
            }
            PipelineState::Failed { .. } => self.metrics.record_failure(),
        }
        report
    }

    /// Extract and summarize a PDF. The tier is validated before any extraction or generation.
    pub async fn summarize_pdf(
        &self,
        bytes: Vec<u8>,
        tier: &str,
    ) -> Result<SummaryOutcome, PipelineError> {
        let tier = self.validate_tier(tier)?;
        let input = DocumentInput::Raw {
            extractor: self.extractor.as_ref(),
            bytes,
        };
        self.run(input, tier)
            .await
            .into_result()
            .map(SummaryOutcome::from)
    }

    /// Summarize already-extracted text. The tier is validated before any generation.
    pub async fn summarize_text(
        &self,
        document: SourceDocument,
        tier: &str,
    ) -> Result<SummaryOutcome, PipelineError> {
        let tier = self.validate_tier(tier)?;
        self.run(DocumentInput::Extracted(document), tier)
            .await
            .into_result()
            .map(SummaryOutcome::from)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn validate_tier(&self, tier: &str) -> Result<SummaryTier, PipelineError> {
        tier.parse::<SummaryTier>().map_err(|error| {
            tracing::warn!(tier, "Rejected request with unknown summary tier");
            self.metrics.record_failure();
            PipelineError::from(error)
        })
    }
}

/// Counts every request handed to the wrapped client, including ones that fail or are cancelled.
struct CountingClient {
    inner: Arc<dyn GenerationClient>,
    metrics: Arc<SummaryMetrics>,
}

#[async_trait]
impl GenerationClient for CountingClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.metrics.record_generation_call();
        self.inner.generate(request).await
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[async_trait]
impl SummaryApi for SummaryService {
    async fn summarize_pdf(
        &self,
        bytes: Vec<u8>,
        tier: &str,
    ) -> Result<SummaryOutcome, PipelineError> {
        SummaryService::summarize_pdf(self, bytes, tier).await
    }

    async fn summarize_text(
        &self,
        document: SourceDocument,
        tier: &str,
    ) -> Result<SummaryOutcome, PipelineError> {
        SummaryService::summarize_text(self, document, tier).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryService::metrics_snapshot(self)
    }
}
