//! Map and reduce steps: one generation call per chunk, then one synthesis call.

use crate::summarization::{GenerationClient, GenerationRequest};

use super::{
    tier::TierPlan,
    types::{ChunkSummary, DocumentMetadata, FinalSummary, PipelineError, TextChunk},
};

/// Separator placed between chunk summaries in the synthesis prompt.
pub const SUMMARY_DELIMITER: &str = "\n\n---\n\n";

/// Build the prompt sent for a single chunk.
pub fn build_chunk_prompt(instruction: &str, chunk: &TextChunk) -> String {
    format!("{instruction}\n\nText to summarize:\n{}", chunk.content)
}

/// Build the synthesis prompt from summaries that are already in index order.
pub fn build_synthesis_prompt(
    plan: &TierPlan,
    metadata: &DocumentMetadata,
    summaries: &[ChunkSummary],
) -> String {
    let mut prompt = String::from(plan.synthesis_instruction);
    if let Some(title) = metadata.title.as_deref() {
        prompt.push_str(&format!("\n\nDocument title: {title}"));
    }
    if let Some(author) = metadata.author.as_deref() {
        prompt.push_str(&format!("\nAuthor: {author}"));
    }
    prompt.push_str("\n\nSummaries to synthesize:\n");
    let joined = summaries
        .iter()
        .map(|summary| summary.text.as_str())
        .collect::<Vec<_>>()
        .join(SUMMARY_DELIMITER);
    prompt.push_str(&joined);
    prompt
}

/// Summarize one chunk with exactly one generation request.
///
/// The returned summary carries the chunk's index so callers can restore document order after
/// concurrent execution.
pub async fn summarize_chunk(
    client: &dyn GenerationClient,
    chunk: &TextChunk,
    instruction: &str,
    max_tokens: u32,
) -> Result<ChunkSummary, PipelineError> {
    let prompt = build_chunk_prompt(instruction, chunk);
    tracing::debug!(
        index = chunk.index,
        chars = chunk.content.chars().count(),
        "Summarizing chunk"
    );
    let text = client
        .generate(GenerationRequest::new(prompt, max_tokens))
        .await
        .map_err(|source| PipelineError::ChunkSummarization {
            index: chunk.index,
            source,
        })?;
    tracing::debug!(index = chunk.index, words = text.split_whitespace().count(), "Chunk summarized");
    Ok(ChunkSummary {
        index: chunk.index,
        text,
    })
}

/// Merge chunk summaries into the final summary with exactly one generation request.
///
/// Summaries are sorted by index first, so the prompt is identical whatever order they arrive
/// in. The model output is returned as-is; no truncation or padding toward the target length.
pub async fn synthesize(
    client: &dyn GenerationClient,
    mut summaries: Vec<ChunkSummary>,
    plan: &TierPlan,
    metadata: &DocumentMetadata,
    max_tokens: u32,
) -> Result<FinalSummary, PipelineError> {
    summaries.sort_by_key(|summary| summary.index);
    let prompt = build_synthesis_prompt(plan, metadata, &summaries);
    let max_tokens = plan.synthesis_max_tokens(max_tokens);
    tracing::debug!(
        tier = %plan.tier,
        summaries = summaries.len(),
        prompt_chars = prompt.chars().count(),
        max_tokens,
        "Synthesizing final summary"
    );
    let text = client
        .generate(GenerationRequest::new(prompt, max_tokens))
        .await
        .map_err(PipelineError::Synthesis)?;

    Ok(FinalSummary {
        text,
        source_metadata: metadata.clone(),
        tier: plan.tier,
        chunk_count: summaries.len(),
    })
}
