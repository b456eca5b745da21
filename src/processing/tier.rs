//! Summary tiers and the prompts each one resolves to.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Tier name outside `flash`, `detailed`, `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown summary tier '{0}' (expected flash, detailed, or extra)")]
pub struct InvalidTierError(pub String);

/// User-selected summary length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryTier {
    /// About one page.
    Flash,
    /// About five pages.
    Detailed,
    /// About fifteen pages.
    Extra,
}

impl SummaryTier {
    /// Every tier, in increasing length.
    pub const ALL: [Self; 3] = [Self::Flash, Self::Detailed, Self::Extra];

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Detailed => "detailed",
            Self::Extra => "extra",
        }
    }

    /// Word count the synthesis prompt steers toward.
    pub fn target_word_count(self) -> usize {
        self.plan().target_word_count
    }

    /// Prompts and length target for this tier.
    pub fn plan(self) -> TierPlan {
        TierPlan::resolve(self)
    }
}

impl fmt::Display for SummaryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryTier {
    type Err = InvalidTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flash" => Ok(Self::Flash),
            "detailed" => Ok(Self::Detailed),
            "extra" => Ok(Self::Extra),
            _ => Err(InvalidTierError(s.to_string())),
        }
    }
}

/// Instructions and target length for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPlan {
    /// Tier this plan was resolved from.
    pub tier: SummaryTier,
    /// Instruction prepended to every chunk summarization prompt.
    pub chunk_instruction: &'static str,
    /// Instruction prepended to the synthesis prompt.
    pub synthesis_instruction: &'static str,
    /// Approximate length of the final summary, in words.
    pub target_word_count: usize,
}

impl TierPlan {
    /// Look up the plan for `tier`.
    pub fn resolve(tier: SummaryTier) -> Self {
        match tier {
            SummaryTier::Flash => Self {
                tier,
                chunk_instruction: "Write a clear and concise summary of this part of the text, \
                    keeping only the essential information.",
                synthesis_instruction: "Combine these partial summaries into one final summary of \
                    about one page (roughly 500 words). Focus on the essential points only. \
                    The summary must cover the key points, the main ideas, and the important conclusions.",
                target_word_count: 500,
            },
            SummaryTier::Detailed => Self {
                tier,
                chunk_instruction: "Write a clear summary of this part of the text, keeping the \
                    main points and the important details.",
                synthesis_instruction: "Combine these partial summaries into one final summary of \
                    about five pages (roughly 2500 words). Include the main points and the important \
                    details, organised as a structured narrative.",
                target_word_count: 2500,
            },
            SummaryTier::Extra => Self {
                tier,
                chunk_instruction: "Write a thorough summary of this part of the text, keeping \
                    every important point together with its details and nuances.",
                synthesis_instruction: "Combine these partial summaries into one final summary of \
                    about fifteen pages (roughly 7500 words). Include every important point with \
                    its details and nuances, organised as a structured narrative.",
                target_word_count: 7500,
            },
        }
    }

    /// Token ceiling for the synthesis request: room for the target length, never below `floor`.
    ///
    /// English prose runs at roughly 1.3 tokens per word; 1.5 leaves space for headings.
    pub fn synthesis_max_tokens(&self, floor: u32) -> u32 {
        let needed = self.target_word_count.saturating_mul(3) / 2;
        let needed = u32::try_from(needed).unwrap_or(u32::MAX);
        needed.max(floor)
    }
}

/// Parse and resolve a tier name in one step.
///
/// Transport layers call this before doing any I/O so an unknown name never costs a generation
/// request.
pub fn resolve_tier_name(name: &str) -> Result<TierPlan, InvalidTierError> {
    name.parse::<SummaryTier>().map(TierPlan::resolve)
}
