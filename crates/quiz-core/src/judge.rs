//! Interfaces to the generation and scoring services.
//!
//! Both services are remote and opaque. The game only needs "prompt in,
//! content out" and "target + content in, score out"; retries and model
//! selection belong to the implementations.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::RoundResult;
use crate::rounds::{ContentKind, Round};

const FALLBACK_REASONING: &str = "Failed to judge.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("judging failed: {0}")]
    Judge(String),
}

/// Score in `0..=100` plus the judge's explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub score: u32,
    pub reasoning: String,
}

impl Verdict {
    /// Normalise a raw judge response. Out-of-range scores are clamped,
    /// fractions rounded, and NaN counts as zero.
    pub fn new(raw_score: f64, reasoning: impl Into<String>) -> Self {
        let score = if raw_score.is_nan() {
            0
        } else {
            raw_score.round().clamp(0.0, 100.0) as u32
        };
        let reasoning = reasoning.into();
        let reasoning = if reasoning.trim().is_empty() {
            FALLBACK_REASONING.to_string()
        } else {
            reasoning
        };
        Self { score, reasoning }
    }
}

pub trait Generator {
    /// Produce text, or an image reference (data URL) for image rounds.
    fn generate(
        &self,
        prompt: &str,
        kind: ContentKind,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

pub trait Judge {
    fn judge(
        &self,
        target: &str,
        generated: &str,
        kind: ContentKind,
    ) -> impl Future<Output = Result<Verdict, ServiceError>> + Send;
}

/// Play one round: generate from the prompt, then score the output against
/// the round's target. No retries.
pub async fn play_round<G, J>(
    generator: &G,
    judge: &J,
    round: &Round,
    prompt: &str,
) -> Result<RoundResult, ServiceError>
where
    G: Generator,
    J: Judge,
{
    if prompt.trim().is_empty() {
        return Err(ServiceError::EmptyPrompt);
    }

    let generated = generator.generate(prompt, round.kind).await?;
    let verdict = judge
        .judge(round.target_content, &generated, round.kind)
        .await?;

    Ok(RoundResult {
        round_id: round.id,
        user_prompt: prompt.to_string(),
        generated_content: generated,
        score: verdict.score,
        reasoning: verdict.reasoning,
    })
}
