//! Core data types and error definitions for the summarization pipeline.

use crate::{extract::ExtractionError, summarization::GenerationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tier::{InvalidTierError, SummaryTier};

/// Descriptive metadata reported by the text extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Document title from the PDF Info dictionary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document author from the PDF Info dictionary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Number of pages in the source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

/// Extracted document handed to the pipeline. Immutable for the lifetime of one request.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    /// Plain text content.
    pub text: String,
    /// Metadata captured during extraction.
    pub metadata: DocumentMetadata,
}

impl SourceDocument {
    /// Wrap already-extracted text.
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// Bounded slice of the document processed as one summarization unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of the chunk in document order.
    pub index: usize,
    /// Chunk text.
    pub content: String,
}

/// Condensed form of a single [`TextChunk`], keyed by the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Index of the chunk this summary was produced from.
    pub index: usize,
    /// Summary text returned by the model.
    pub text: String,
}

/// Terminal artifact of a successful run.
#[derive(Debug, Clone)]
pub struct FinalSummary {
    /// Synthesized summary text, untouched after generation.
    pub text: String,
    /// Metadata of the document the summary was produced from.
    pub source_metadata: DocumentMetadata,
    /// Tier the summary was sized for.
    pub tier: SummaryTier,
    /// Number of chunks that fed the synthesis.
    pub chunk_count: usize,
}

impl FinalSummary {
    /// Whitespace-delimited word count of the summary text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Stages of a single summarization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Request accepted, nothing started.
    Idle,
    /// Waiting on the text extractor.
    Extracting,
    /// Splitting text into chunks.
    Segmenting,
    /// Chunk summaries in flight.
    Summarizing,
    /// Final synthesis in flight.
    Synthesizing,
    /// Finished with a summary.
    Done,
    /// Finished with an error.
    Failed,
}

impl PipelineStage {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Caller configured an impossible chunk bound.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Tagged failure reasons surfaced by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Tier name was not one of `flash`, `detailed`, `extra`.
    #[error(transparent)]
    InvalidTier(#[from] InvalidTierError),
    /// External text extractor failed.
    #[error("Failed to extract document text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Segmentation rejected its parameters.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Extracted text contained nothing to summarize.
    #[error("Document contains no extractable text")]
    EmptyDocument,
    /// Generation call for one chunk failed.
    #[error("Failed to summarize chunk {index}: {source}")]
    ChunkSummarization {
        /// Index of the failing chunk.
        index: usize,
        /// Underlying provider error.
        #[source]
        source: GenerationError,
    },
    /// Final synthesis call failed.
    #[error("Failed to synthesize final summary: {0}")]
    Synthesis(#[source] GenerationError),
}

impl PipelineError {
    /// Stage in which the failure occurred.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::InvalidTier(_) => PipelineStage::Idle,
            Self::Extraction(_) => PipelineStage::Extracting,
            Self::Chunking(_) | Self::EmptyDocument => PipelineStage::Segmenting,
            Self::ChunkSummarization { .. } => PipelineStage::Summarizing,
            Self::Synthesis(_) => PipelineStage::Synthesizing,
        }
    }

    /// Short machine-readable tag for transport layers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTier(_) => "invalid_tier",
            Self::Extraction(_) => "extraction",
            Self::Chunking(_) => "chunking",
            Self::EmptyDocument => "empty_document",
            Self::ChunkSummarization { .. } => "chunk_summarization",
            Self::Synthesis(_) => "synthesis",
        }
    }
}

/// Summary of a completed run, shaped for adapters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    /// Final summary text.
    pub summary_text: String,
    /// Tier requested by the caller.
    pub tier: SummaryTier,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Word count the model was steered toward.
    pub target_word_count: usize,
    /// Word count actually produced.
    pub word_count: usize,
    /// Metadata of the source document.
    pub metadata: DocumentMetadata,
}

impl From<FinalSummary> for SummaryOutcome {
    fn from(summary: FinalSummary) -> Self {
        let word_count = summary.word_count();
        Self {
            target_word_count: summary.tier.target_word_count(),
            tier: summary.tier,
            chunk_count: summary.chunk_count,
            word_count,
            summary_text: summary.text,
            metadata: summary.source_metadata,
        }
    }
}
