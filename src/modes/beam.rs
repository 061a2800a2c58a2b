//! Beam ranker - parallel candidate generation and scoring.
//!
//! Generates `beam_width` complete scripts for a chosen direction, each at a
//! slightly higher temperature than the last, scores an excerpt of every
//! candidate and returns them ranked best first.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{Idea, ModeCore};
use crate::error::{EngineError, EngineResult, OracleError};
use crate::oracle::{GenerateOptions, OracleRequest, ResponseHint};
use crate::parser::{unit_score, ParsedScript, ScriptStructure};
use crate::prompts::{script_prompt, script_score_prompt, ScriptBrief};

/// Speaking rate used for duration estimates.
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Characters of each candidate shown to the scorer.
pub const SCORE_EXCERPT_CHARS: usize = 500;

/// Spacing of visual-cue slots in [`BeamCandidate::to_script`].
pub const VISUAL_CUE_INTERVAL_SECS: u32 = 10;

const BASE_TEMPERATURE: f64 = 0.7;
const TEMPERATURE_STEP: f64 = 0.1;
const MAX_TEMPERATURE: f64 = 2.0;
const SCRIPT_MAX_TOKENS: u32 = 3000;
const SCORE_TEMPERATURE: f64 = 0.2;
const SCORE_MAX_TOKENS: u32 = 10;

/// Narration pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    Fast,
    Medium,
    Slow,
}

/// Vocabulary register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    Simple,
    Technical,
    Mixed,
}

/// Optional stylistic direction for generated scripts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing: Option<Pacing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vocabulary>,
}

impl StyleHints {
    /// Prose instruction rendered into the generation prompt.
    pub fn instructions(&self) -> String {
        let mut parts = Vec::new();
        if let Some(tone) = &self.tone {
            parts.push(format!("Tone: {}.", tone));
        }
        if let Some(pacing) = self.pacing {
            parts.push(
                match pacing {
                    Pacing::Fast => "Pacing: fast, with short punchy sentences.",
                    Pacing::Medium => "Pacing: balanced, mixing short and long sentences.",
                    Pacing::Slow => "Pacing: slow and deliberate, leaving room to breathe.",
                }
                .to_string(),
            );
        }
        if let Some(vocabulary) = self.vocabulary {
            parts.push(
                match vocabulary {
                    Vocabulary::Simple => "Vocabulary: simple, suitable for a general audience.",
                    Vocabulary::Technical => "Vocabulary: technical, precise domain terms.",
                    Vocabulary::Mixed => "Vocabulary: mostly plain, with terms explained as they appear.",
                }
                .to_string(),
            );
        }
        if parts.is_empty() {
            DEFAULT_STYLE.to_string()
        } else {
            parts.join(" ")
        }
    }
}

const DEFAULT_STYLE: &str = "Use a conversational, engaging tone with a fast pace.";

/// Beam ranking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    /// Candidates generated (>= 1)
    #[serde(default = "default_beam_width")]
    pub beam_width: usize,
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,
    #[serde(default = "default_max_word_count")]
    pub max_word_count: usize,
    #[serde(default = "default_target_duration_secs")]
    pub target_duration_secs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_hints: Option<StyleHints>,
}

fn default_beam_width() -> usize {
    3
}

fn default_min_word_count() -> usize {
    300
}

fn default_max_word_count() -> usize {
    2000
}

fn default_target_duration_secs() -> u32 {
    60
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            beam_width: default_beam_width(),
            min_word_count: default_min_word_count(),
            max_word_count: default_max_word_count(),
            target_duration_secs: default_target_duration_secs(),
            style_hints: None,
        }
    }
}

impl RankConfig {
    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_word_counts(mut self, min: usize, max: usize) -> Self {
        self.min_word_count = min;
        self.max_word_count = max;
        self
    }

    pub fn with_target_duration(mut self, secs: u32) -> Self {
        self.target_duration_secs = secs;
        self
    }

    pub fn with_style_hints(mut self, hints: StyleHints) -> Self {
        self.style_hints = Some(hints);
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.beam_width == 0 {
            return Err(EngineError::configuration("beam_width", "must be at least 1"));
        }
        if self.min_word_count > self.max_word_count {
            return Err(EngineError::configuration(
                "min_word_count",
                format!(
                    "must not exceed max_word_count ({} > {})",
                    self.min_word_count, self.max_word_count
                ),
            ));
        }
        Ok(())
    }

    /// Words that fill the target duration at [`WORDS_PER_SECOND`].
    pub fn target_words(&self) -> usize {
        (self.target_duration_secs as f64 * WORDS_PER_SECOND).round() as usize
    }
}

/// Sampling temperature for the candidate at `ordinal`.
pub fn candidate_temperature(ordinal: usize) -> f64 {
    (BASE_TEMPERATURE + TEMPERATURE_STEP * ordinal as f64).min(MAX_TEMPERATURE)
}

/// Seconds needed to narrate `word_count` words.
pub fn estimated_duration_secs(word_count: usize) -> f64 {
    word_count as f64 / WORDS_PER_SECOND
}

/// Facts about a generated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub word_count: usize,
    pub estimated_duration_secs: f64,
    pub structure: ScriptStructure,
    pub visual_cues: Vec<String>,
    pub generation_latency_ms: u64,
    pub generation_cost: f64,
    pub temperature: f64,
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamCandidate {
    pub id: String,
    pub content: String,
    pub score: f64,
    /// 1 is best
    pub rank: usize,
    pub metadata: CandidateMetadata,
}

/// A placeholder slot for stock footage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualCueSlot {
    pub timestamp_secs: u32,
    pub description: String,
    pub search_query: String,
    pub asset_type: String,
}

/// A candidate promoted to a production script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub content: String,
    pub word_count: usize,
    pub estimated_duration_secs: f64,
    pub structure: ScriptStructure,
    pub visual_cues: Vec<VisualCueSlot>,
    pub reasoning_path: Vec<String>,
    pub approved: bool,
}

impl BeamCandidate {
    /// Convert into a [`Script`] with a visual-cue slot every
    /// [`VISUAL_CUE_INTERVAL_SECS`] seconds of estimated runtime.
    pub fn to_script(&self, reasoning_path: Vec<String>) -> Script {
        let duration = self.metadata.estimated_duration_secs.floor() as u32;
        let visual_cues = (0..duration)
            .step_by(VISUAL_CUE_INTERVAL_SECS as usize)
            .enumerate()
            .map(|(i, timestamp_secs)| {
                let description = self
                    .metadata
                    .visual_cues
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("Scene at {}s", timestamp_secs));
                VisualCueSlot {
                    timestamp_secs,
                    search_query: description.clone(),
                    description,
                    asset_type: "stock_video".to_string(),
                }
            })
            .collect();

        Script {
            id: Uuid::new_v4().to_string(),
            content: self.content.clone(),
            word_count: self.metadata.word_count,
            estimated_duration_secs: self.metadata.estimated_duration_secs,
            structure: self.metadata.structure.clone(),
            visual_cues,
            reasoning_path,
            approved: false,
        }
    }
}

/// Outcome of one ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankResult {
    /// Best first; ranks are 1..N
    pub candidates: Vec<BeamCandidate>,
    pub top_candidate: Option<BeamCandidate>,
    /// Sum of generation costs
    pub total_cost: f64,
    pub cancelled: bool,
}

struct Scored {
    candidate: BeamCandidate,
    score_failed: bool,
}

/// Beam-search candidate ranker.
#[derive(Clone)]
pub struct BeamRanker {
    core: ModeCore,
}

impl BeamRanker {
    pub fn new(core: ModeCore) -> Self {
        Self { core }
    }

    /// Generate, score and rank `beam_width` candidates for `direction`.
    pub async fn rank(
        &self,
        idea: &Idea,
        direction: &str,
        niche: &str,
        config: &RankConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<RankResult> {
        config.validate()?;

        let span = info_span!("rank", run_id = %Uuid::new_v4(), title = %idea.title);
        self.run(idea, direction, niche, config, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        idea: &Idea,
        direction: &str,
        niche: &str,
        config: &RankConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<RankResult> {
        info!(beam_width = config.beam_width, "Starting beam ranking");

        let style = config
            .style_hints
            .as_ref()
            .map_or_else(|| DEFAULT_STYLE.to_string(), StyleHints::instructions);
        let prompt = script_prompt(&ScriptBrief {
            title: &idea.title,
            niche,
            direction,
            keywords: &idea.keywords,
            target_duration_secs: config.target_duration_secs,
            target_words: config.target_words(),
            min_words: config.min_word_count,
            max_words: config.max_word_count,
            style: &style,
        });

        let requests = (0..config.beam_width)
            .map(|ordinal| {
                OracleRequest::new(
                    prompt.clone(),
                    GenerateOptions::new(ResponseHint::Script)
                        .with_temperature(candidate_temperature(ordinal))
                        .with_max_output_tokens(SCRIPT_MAX_TOKENS),
                )
            })
            .collect();
        let replies = self.core.call_all(requests, cancel).await;

        let mut cancelled = false;
        let mut candidates = Vec::with_capacity(config.beam_width);
        for (ordinal, reply) in replies.into_iter().enumerate() {
            match reply {
                Ok(reply) => {
                    let parsed = ParsedScript::parse(&reply.text);
                    candidates.push(BeamCandidate {
                        id: format!("candidate-{}", ordinal),
                        metadata: CandidateMetadata {
                            word_count: parsed.word_count,
                            estimated_duration_secs: estimated_duration_secs(parsed.word_count),
                            structure: parsed.structure(),
                            visual_cues: parsed.visual_cues,
                            generation_latency_ms: reply.latency_ms,
                            generation_cost: reply.cost,
                            temperature: candidate_temperature(ordinal),
                        },
                        content: reply.text,
                        score: 0.0,
                        rank: 0,
                    });
                }
                Err(OracleError::Cancelled) => cancelled = true,
                Err(e) => warn!(ordinal, error = %e, "Candidate generation failed, dropping candidate"),
            }
        }

        let requests = candidates
            .iter()
            .map(|c| {
                let excerpt: String = c.content.chars().take(SCORE_EXCERPT_CHARS).collect();
                OracleRequest::new(
                    script_score_prompt(&idea.title, niche, &excerpt),
                    GenerateOptions::new(ResponseHint::ScriptScore)
                        .with_temperature(SCORE_TEMPERATURE)
                        .with_max_output_tokens(SCORE_MAX_TOKENS),
                )
            })
            .collect();
        let replies = self.core.call_all(requests, cancel).await;

        let mut scored: Vec<Scored> = candidates
            .into_iter()
            .zip(replies)
            .map(|(mut candidate, reply)| {
                let score_failed = match reply {
                    Ok(reply) => {
                        candidate.score = unit_score(&reply.text);
                        false
                    }
                    Err(e) => {
                        if matches!(e, OracleError::Cancelled) {
                            cancelled = true;
                        } else {
                            warn!(candidate = %candidate.id, error = %e, "Scoring failed, ranking candidate last");
                        }
                        true
                    }
                };
                Scored {
                    candidate,
                    score_failed,
                }
            })
            .collect();

        // Stable: equal scores keep generation order
        scored.sort_by(|a, b| {
            a.score_failed.cmp(&b.score_failed).then_with(|| {
                b.candidate
                    .score
                    .partial_cmp(&a.candidate.score)
                    .unwrap_or(Ordering::Equal)
            })
        });

        let candidates: Vec<BeamCandidate> = scored
            .into_iter()
            .enumerate()
            .map(|(i, s)| BeamCandidate {
                rank: i + 1,
                ..s.candidate
            })
            .collect();

        let total_cost = candidates.iter().map(|c| c.metadata.generation_cost).sum();
        let result = RankResult {
            top_candidate: candidates.first().cloned(),
            candidates,
            total_cost,
            cancelled,
        };

        info!(
            candidates = result.candidates.len(),
            top_score = result.top_candidate.as_ref().map(|c| c.score),
            total_cost = result.total_cost,
            cancelled,
            "Beam ranking complete"
        );

        Ok(result)
    }
}
