//! Document summarization pipeline: segmentation, chunk summaries, and synthesis.

pub mod chunking;
pub mod pipeline;
mod service;
pub mod summarize;
pub mod tier;
pub mod types;

pub use pipeline::{DocumentInput, PipelineOptions, PipelineReport, PipelineState, SummaryPipeline};
pub use service::{SummaryApi, SummaryService};
pub use tier::{InvalidTierError, SummaryTier, TierPlan, resolve_tier_name};
pub use types::{
    ChunkSummary, ChunkingError, DocumentMetadata, FinalSummary, PipelineError, PipelineStage,
    SourceDocument, SummaryOutcome, TextChunk,
};
