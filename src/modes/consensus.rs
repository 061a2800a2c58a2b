//! Consensus loop - iterative panel evaluation and revision.
//!
//! Each round every panel member scores the current artifact in parallel.
//! Unanimous approval ends the debate; otherwise the artifact is revised with
//! the pooled improvement suggestions and evaluated again, up to
//! `max_rounds` rounds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::ModeCore;
use crate::error::{EngineError, EngineResult, OracleError};
use crate::oracle::{GenerateOptions, OracleRequest, ResponseHint};
use crate::parser::{parse_evaluation, EvaluationFields};
use crate::prompts::{
    evaluation_prompt, revision_prompt, transcript_prompt, EvaluationBrief, TranscriptVoice,
};

/// Score at or above which an evaluator approves.
pub const APPROVAL_THRESHOLD: u32 = 85;

const EVALUATION_TEMPERATURE: f64 = 0.7;
const EVALUATION_MAX_TOKENS: u32 = 2000;
const REVISION_TEMPERATURE: f64 = 0.7;
const REVISION_MAX_TOKENS: u32 = 2000;
const TRANSCRIPT_TEMPERATURE: f64 = 0.8;
const TRANSCRIPT_MAX_TOKENS: u32 = 2000;

/// A persona on the review panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorProfile {
    pub id: String,
    pub name: String,
    pub background: String,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub speaking_style: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl EvaluatorProfile {
    /// The three stock reviewers: audience retention, product fit and entertainment value.
    pub fn default_panel() -> Vec<Self> {
        vec![
            EvaluatorProfile {
                id: "retention-strategist".to_string(),
                name: "Retention Strategist".to_string(),
                background: "Has audited thousands of short-form videos for watch-time and click-through performance.".to_string(),
                expertise: strings(&["audience retention", "thumbnail and title packaging", "hook design"]),
                criteria: strings(&[
                    "Does the opening earn the next ten seconds?",
                    "Is there a reason to keep watching at every beat?",
                    "Would the title and premise win the click?",
                    "Is the payoff worth the promise?",
                ]),
                personality: "Data-driven and blunt, impatient with filler".to_string(),
                speaking_style: "Short sentences, cites viewer behavior".to_string(),
            },
            EvaluatorProfile {
                id: "product-lead".to_string(),
                name: "Product Lead".to_string(),
                background: "Runs growth for a consumer platform and thinks in terms of user value and scale.".to_string(),
                expertise: strings(&["user value", "growth loops", "platform fit"]),
                criteria: strings(&[
                    "Does the content solve a real problem or itch for the viewer?",
                    "Will it travel: shares, comments, follow-on views?",
                    "Does it fit how the platform distributes content?",
                    "Can the format be repeated as a series?",
                ]),
                personality: "Analytical and calm, asks about second-order effects".to_string(),
                speaking_style: "Measured, frames feedback as experiments".to_string(),
            },
            EvaluatorProfile {
                id: "entertainment-host".to_string(),
                name: "Entertainment Host".to_string(),
                background: "Veteran live-show presenter who knows how to hold a crowd.".to_string(),
                expertise: strings(&["showmanship", "storytelling", "audience energy"]),
                criteria: strings(&[
                    "Is it fun to watch?",
                    "Does it have a memorable moment people will repeat?",
                    "Is the energy consistent from start to finish?",
                    "Does the delivery have personality?",
                ]),
                personality: "Loud, warm and encouraging, allergic to boring".to_string(),
                speaking_style: "High-energy catchphrases and exclamations".to_string(),
            },
        ]
    }
}

/// What the artifact is for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebateContext {
    pub niche: String,
    pub topic: String,
    pub purpose: String,
}

/// Debate limits and options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Rounds of evaluation (>= 1)
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Generate a panel discussion transcript each round
    #[serde(default)]
    pub transcript: bool,
}

fn default_max_rounds() -> usize {
    5
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            transcript: false,
        }
    }
}

impl DebateConfig {
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_transcript(mut self, transcript: bool) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn validate(&self, panel: &[EvaluatorProfile]) -> EngineResult<()> {
        if self.max_rounds == 0 {
            return Err(EngineError::configuration("max_rounds", "must be at least 1"));
        }
        if panel.is_empty() {
            return Err(EngineError::configuration("panel", "must have at least one evaluator"));
        }
        let mut seen = HashSet::new();
        for profile in panel {
            if !seen.insert(profile.id.as_str()) {
                return Err(EngineError::configuration(
                    "panel",
                    format!("duplicate evaluator id '{}'", profile.id),
                ));
            }
        }
        Ok(())
    }
}

/// One panel member's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub evaluator_id: String,
    /// 0-100
    pub score: u32,
    pub approved: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvements: Vec<String>,
    pub reasoning: String,
    pub quote: String,
}

impl Evaluation {
    pub fn from_fields(evaluator_id: impl Into<String>, fields: EvaluationFields) -> Self {
        let score = fields.score_or_neutral();
        Self {
            evaluator_id: evaluator_id.into(),
            score,
            approved: score >= APPROVAL_THRESHOLD,
            strengths: fields.strengths.value_or_default(),
            weaknesses: fields.weaknesses.value_or_default(),
            improvements: fields.improvements.value_or_default(),
            reasoning: fields.reasoning.value_or_default(),
            quote: fields.quote.value_or_default(),
        }
    }
}

/// One round of the debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRound {
    /// 1-based
    pub round_number: usize,
    /// The artifact evaluated this round
    pub content: String,
    /// In panel order; evaluators whose call failed are absent
    pub evaluations: Vec<Evaluation>,
    pub consensus: bool,
    pub average_score: f64,
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcript: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of a debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateResult {
    pub final_content: String,
    pub rounds: Vec<DebateRound>,
    pub consensus_achieved: bool,
    /// Average score of the last round
    pub final_score: f64,
    pub summary: String,
    pub cancelled: bool,
}

/// Panel consensus loop.
#[derive(Clone)]
pub struct ConsensusLoop {
    core: ModeCore,
}

impl ConsensusLoop {
    pub fn new(core: ModeCore) -> Self {
        Self { core }
    }

    /// Evaluate and revise `initial_content` until the panel agrees or rounds run out.
    pub async fn debate(
        &self,
        initial_content: &str,
        context: &DebateContext,
        panel: &[EvaluatorProfile],
        config: &DebateConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<DebateResult> {
        config.validate(panel)?;

        let span = info_span!("debate", run_id = %Uuid::new_v4(), topic = %context.topic);
        self.run(initial_content, context, panel, config, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        initial_content: &str,
        context: &DebateContext,
        panel: &[EvaluatorProfile],
        config: &DebateConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<DebateResult> {
        info!(
            panel = panel.len(),
            max_rounds = config.max_rounds,
            "Starting consensus loop"
        );

        let mut content = initial_content.to_string();
        let mut rounds: Vec<DebateRound> = Vec::new();
        let mut cancelled = false;

        for round_number in 1..=config.max_rounds {
            let Some(evaluations) = self.evaluate(&content, context, panel, cancel).await else {
                cancelled = true;
                break;
            };

            let consensus = evaluations.len() == panel.len() && evaluations.iter().all(|e| e.approved);
            let average_score = if evaluations.is_empty() {
                0.0
            } else {
                evaluations.iter().map(|e| e.score as f64).sum::<f64>() / evaluations.len() as f64
            };
            let improvements: Vec<String> = evaluations
                .iter()
                .flat_map(|e| e.improvements.iter().cloned())
                .collect();

            let transcript = if config.transcript && !evaluations.is_empty() {
                self.transcript(&evaluations, panel, cancel).await
            } else {
                Vec::new()
            };

            info!(
                round = round_number,
                evaluated = evaluations.len(),
                average_score,
                consensus,
                "Debate round complete"
            );

            rounds.push(DebateRound {
                round_number,
                content: content.clone(),
                evaluations,
                consensus,
                average_score,
                improvements,
                transcript,
                completed_at: Utc::now(),
            });

            if consensus || round_number == config.max_rounds {
                break;
            }

            let round = &rounds[rounds.len() - 1];
            match self.revise(&content, &round.improvements, context, cancel).await {
                Ok(Some(revised)) => content = revised,
                Ok(None) => {}
                Err(OracleError::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(e) => warn!(round = round_number, error = %e, "Revision failed, keeping current content"),
            }
        }

        let final_content = rounds
            .last()
            .map_or_else(|| initial_content.to_string(), |r| r.content.clone());
        let consensus_achieved = rounds.last().is_some_and(|r| r.consensus);
        let final_score = rounds.last().map_or(0.0, |r| r.average_score);
        let summary = debate_summary(&rounds, consensus_achieved, panel);

        info!(
            rounds = rounds.len(),
            consensus_achieved,
            final_score,
            cancelled,
            "Consensus loop complete"
        );

        Ok(DebateResult {
            final_content,
            rounds,
            consensus_achieved,
            final_score,
            summary,
            cancelled,
        })
    }

    /// Evaluations in panel order, or `None` if the round was cancelled.
    async fn evaluate(
        &self,
        content: &str,
        context: &DebateContext,
        panel: &[EvaluatorProfile],
        cancel: &CancellationToken,
    ) -> Option<Vec<Evaluation>> {
        let requests = panel
            .iter()
            .map(|profile| {
                let brief = EvaluationBrief {
                    name: &profile.name,
                    background: &profile.background,
                    expertise: &profile.expertise,
                    criteria: &profile.criteria,
                    personality: &profile.personality,
                    speaking_style: &profile.speaking_style,
                    niche: &context.niche,
                    topic: &context.topic,
                    purpose: &context.purpose,
                    approval_threshold: APPROVAL_THRESHOLD,
                };
                OracleRequest::new(
                    evaluation_prompt(&brief, content),
                    GenerateOptions::new(ResponseHint::Evaluation)
                        .with_temperature(EVALUATION_TEMPERATURE)
                        .with_max_output_tokens(EVALUATION_MAX_TOKENS),
                )
            })
            .collect();
        let replies = self.core.call_all(requests, cancel).await;

        let mut evaluations = Vec::with_capacity(panel.len());
        for (profile, reply) in panel.iter().zip(replies) {
            match reply {
                Ok(reply) => {
                    let evaluation = Evaluation::from_fields(&profile.id, parse_evaluation(&reply.text));
                    debug!(
                        evaluator = %profile.id,
                        score = evaluation.score,
                        approved = evaluation.approved,
                        "Evaluation received"
                    );
                    evaluations.push(evaluation);
                }
                Err(OracleError::Cancelled) => return None,
                Err(e) => warn!(evaluator = %profile.id, error = %e, "Evaluation failed, skipping evaluator"),
            }
        }
        Some(evaluations)
    }

    /// Revised content, or `None` when the oracle returned nothing usable.
    async fn revise(
        &self,
        content: &str,
        improvements: &[String],
        context: &DebateContext,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, OracleError> {
        let request = OracleRequest::new(
            revision_prompt(content, improvements, &context.niche, &context.topic, &context.purpose),
            GenerateOptions::new(ResponseHint::Revision)
                .with_temperature(REVISION_TEMPERATURE)
                .with_max_output_tokens(REVISION_MAX_TOKENS),
        );
        let reply = self.core.call(request, cancel).await?;
        let revised = reply.text.trim();
        if revised.is_empty() {
            warn!("Revision came back empty, keeping current content");
            Ok(None)
        } else {
            Ok(Some(revised.to_string()))
        }
    }

    async fn transcript(
        &self,
        evaluations: &[Evaluation],
        panel: &[EvaluatorProfile],
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let voices: Vec<TranscriptVoice<'_>> = evaluations
            .iter()
            .map(|e| TranscriptVoice {
                name: evaluator_name(panel, &e.evaluator_id),
                score: e.score,
                strengths: &e.strengths,
                weaknesses: &e.weaknesses,
                quote: &e.quote,
            })
            .collect();
        let request = OracleRequest::new(
            transcript_prompt(&voices),
            GenerateOptions::new(ResponseHint::Transcript)
                .with_temperature(TRANSCRIPT_TEMPERATURE)
                .with_max_output_tokens(TRANSCRIPT_MAX_TOKENS),
        );

        match self.core.call(request, cancel).await {
            Ok(reply) => transcript_lines(&reply.text),
            Err(e) => {
                debug!(error = %e, "No transcript for this round");
                Vec::new()
            }
        }
    }
}

/// Keep only `[NAME]: statement` lines.
pub fn transcript_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('['))
        .map(str::to_string)
        .collect()
}

fn evaluator_name<'a>(panel: &'a [EvaluatorProfile], id: &'a str) -> &'a str {
    panel
        .iter()
        .find(|p| p.id == id)
        .map_or(id, |p| p.name.as_str())
}

/// Plain-text report of a debate.
pub fn debate_summary(
    rounds: &[DebateRound],
    consensus_achieved: bool,
    panel: &[EvaluatorProfile],
) -> String {
    let mut summary = String::new();
    let final_score = rounds.last().map_or(0.0, |r| r.average_score);

    let _ = writeln!(summary, "DEBATE SUMMARY");
    let _ = writeln!(summary, "Total rounds: {}", rounds.len());
    let _ = writeln!(
        summary,
        "Consensus: {}",
        if consensus_achieved { "YES" } else { "NO" }
    );
    let _ = writeln!(summary, "Final score: {:.1}/100", final_score);
    let _ = writeln!(summary);
    let _ = writeln!(summary, "ROUND SCORES:");
    for round in rounds {
        let _ = writeln!(
            summary,
            "  Round {}: {:.1}{}",
            round.round_number,
            round.average_score,
            if round.consensus { " (consensus)" } else { "" }
        );
    }

    if let Some(last) = rounds.last() {
        let _ = writeln!(summary);
        let _ = writeln!(summary, "FINAL EVALUATOR SCORES:");
        for evaluation in &last.evaluations {
            let _ = writeln!(
                summary,
                "  {}: {}/100 ({})",
                evaluator_name(panel, &evaluation.evaluator_id),
                evaluation.score,
                if evaluation.approved { "approved" } else { "not approved" }
            );
        }
    }

    let _ = writeln!(summary);
    let _ = write!(
        summary,
        "STATUS: {}",
        if consensus_achieved {
            "APPROVED FOR PRODUCTION"
        } else {
            "NEEDS MORE WORK"
        }
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Completion, MockOracle};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn context() -> DebateContext {
        DebateContext {
            niche: "science".to_string(),
            topic: "deep sea".to_string(),
            purpose: "short video".to_string(),
        }
    }

    fn consensus_loop(oracle: MockOracle) -> ConsensusLoop {
        ConsensusLoop::new(ModeCore::with_max_in_flight(Arc::new(oracle), 4))
    }

    fn evaluation_text(score: u32) -> String {
        format!(
            "SCORE: {score}\n\nSTRENGTHS:\n- clear hook\n\nWEAKNESSES:\n- slow middle\n\nIMPROVEMENTS:\n- tighten pacing\n- add a twist\n\nREASONING:\nSolid.\n\nQUOTE:\n\"Ship it.\""
        )
    }

    // ============================================================================
    // Types
    // ============================================================================

    #[test]
    fn test_default_panel() {
        let panel = EvaluatorProfile::default_panel();
        assert_eq!(panel.len(), 3);
        assert!(DebateConfig::default().validate(&panel).is_ok());
        assert!(panel.iter().all(|p| !p.criteria.is_empty()));
    }

    #[test]
    fn test_debate_config_validation() {
        let panel = EvaluatorProfile::default_panel();
        assert!(DebateConfig::default().with_max_rounds(0).validate(&panel).is_err());
        assert!(DebateConfig::default().validate(&[]).is_err());

        let mut duplicated = panel.clone();
        duplicated[1].id = duplicated[0].id.clone();
        assert!(DebateConfig::default().validate(&duplicated).is_err());
    }

    #[test]
    fn test_evaluation_from_fields_threshold() {
        let approved = Evaluation::from_fields("a", parse_evaluation(&evaluation_text(85)));
        assert!(approved.approved);
        assert_eq!(approved.improvements, vec!["tighten pacing", "add a twist"]);
        assert_eq!(approved.quote, "Ship it.");

        let rejected = Evaluation::from_fields("a", parse_evaluation(&evaluation_text(84)));
        assert!(!rejected.approved);
    }

    #[test]
    fn test_evaluation_without_score_is_neutral() {
        let evaluation = Evaluation::from_fields("a", parse_evaluation("Looks fine to me."));
        assert_eq!(evaluation.score, 50);
        assert!(!evaluation.approved);
        assert!(evaluation.improvements.is_empty());
    }

    #[test]
    fn test_transcript_lines_keep_bracketed_only() {
        let lines = transcript_lines("Intro text\n[A]: hello\n  [B]: hi there\nnoise");
        assert_eq!(lines, vec!["[A]: hello", "[B]: hi there"]);
    }

    // ============================================================================
    // Debate
    // ============================================================================

    #[tokio::test]
    async fn test_debate_consensus_in_first_round() {
        let mut oracle = MockOracle::new();
        oracle
            .expect_generate()
            .times(3)
            .returning(|req| {
                assert_eq!(req.hint(), ResponseHint::Evaluation);
                Ok(Completion::new(evaluation_text(90)))
            });

        let result = consensus_loop(oracle)
            .debate("draft", &context(), &EvaluatorProfile::default_panel(), &DebateConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.consensus_achieved);
        assert_eq!(result.rounds.len(), 1);
        assert_eq!(result.final_score, 90.0);
        assert_eq!(result.final_content, "draft");
        assert_eq!(result.rounds[0].evaluations.len(), 3);
        assert_eq!(result.rounds[0].improvements.len(), 6);
        assert!(result.summary.contains("Consensus: YES"));
        assert!(result.summary.contains("APPROVED FOR PRODUCTION"));
    }

    #[tokio::test]
    async fn test_debate_exhausts_rounds_without_consensus() {
        let revisions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&revisions);
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(move |req| match req.hint() {
            ResponseHint::Evaluation => Ok(Completion::new(evaluation_text(70))),
            ResponseHint::Revision => {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Completion::new(format!("revision {n}")))
            }
            other => panic!("unexpected hint {other}"),
        });

        let result = consensus_loop(oracle)
            .debate(
                "draft",
                &context(),
                &EvaluatorProfile::default_panel(),
                &DebateConfig::default().with_max_rounds(2),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!result.consensus_achieved);
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.rounds[0].content, "draft");
        assert_eq!(result.rounds[1].content, "revision 1");
        assert_eq!(result.final_content, result.rounds[1].content);
        assert_eq!(result.final_score, 70.0);
        // No revision after the last round
        assert_eq!(revisions.load(Ordering::SeqCst), 1);
        assert!(result.summary.contains("NEEDS MORE WORK"));
    }

    #[tokio::test]
    async fn test_debate_revision_receives_pooled_improvements() {
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(|req| match req.hint() {
            ResponseHint::Evaluation if req.prompt.contains("better draft") => {
                Ok(Completion::new(evaluation_text(95)))
            }
            ResponseHint::Evaluation => Ok(Completion::new(evaluation_text(60))),
            ResponseHint::Revision => {
                assert!(req.prompt.contains("1. tighten pacing"));
                assert!(req.prompt.contains("6. add a twist"));
                Ok(Completion::new("  better draft  "))
            }
            other => panic!("unexpected hint {other}"),
        });

        let result = consensus_loop(oracle)
            .debate("draft", &context(), &EvaluatorProfile::default_panel(), &DebateConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.consensus_achieved);
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.final_content, "better draft");
        assert!(result.rounds[1].completed_at >= result.rounds[0].completed_at);
    }

    #[tokio::test]
    async fn test_debate_revises_without_improvement_suggestions() {
        let revisions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&revisions);
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(move |req| match req.hint() {
            ResponseHint::Evaluation => Ok(Completion::new("SCORE: 60\nREASONING: meh")),
            ResponseHint::Revision => {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Completion::new("reworked draft"))
            }
            other => panic!("unexpected hint {other}"),
        });

        let result = consensus_loop(oracle)
            .debate(
                "draft",
                &context(),
                &EvaluatorProfile::default_panel(),
                &DebateConfig::default().with_max_rounds(2),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(result.rounds[0].improvements.is_empty());
        assert_eq!(revisions.load(Ordering::SeqCst), 1);
        assert_eq!(result.rounds[1].content, "reworked draft");
        assert_eq!(result.final_content, "reworked draft");
    }

    #[tokio::test]
    async fn test_debate_failed_evaluator_blocks_consensus() {
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(|req| match req.hint() {
            ResponseHint::Evaluation if req.prompt.starts_with("You are Product Lead") => {
                Err(OracleError::Unavailable {
                    message: "timeout".to_string(),
                })
            }
            ResponseHint::Evaluation => Ok(Completion::new(evaluation_text(90))),
            _ => Ok(Completion::new("revised")),
        });

        let result = consensus_loop(oracle)
            .debate(
                "draft",
                &context(),
                &EvaluatorProfile::default_panel(),
                &DebateConfig::default().with_max_rounds(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let round = &result.rounds[0];
        let ids: Vec<_> = round.evaluations.iter().map(|e| e.evaluator_id.as_str()).collect();
        assert_eq!(ids, vec!["retention-strategist", "entertainment-host"]);
        assert_eq!(round.average_score, 90.0);
        assert!(!round.consensus);
        assert!(!result.consensus_achieved);
    }

    #[tokio::test]
    async fn test_debate_revision_failure_keeps_content() {
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(|req| match req.hint() {
            ResponseHint::Evaluation => Ok(Completion::new(evaluation_text(40))),
            _ => Err(OracleError::Unavailable {
                message: "down".to_string(),
            }),
        });

        let result = consensus_loop(oracle)
            .debate(
                "draft",
                &context(),
                &EvaluatorProfile::default_panel(),
                &DebateConfig::default().with_max_rounds(3),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.rounds.len(), 3);
        assert!(result.rounds.iter().all(|r| r.content == "draft"));
        assert_eq!(result.final_content, "draft");
    }

    #[tokio::test]
    async fn test_debate_with_transcript() {
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(|req| match req.hint() {
            ResponseHint::Evaluation => Ok(Completion::new(evaluation_text(88))),
            ResponseHint::Transcript => Ok(Completion::new(
                "Here is the debate:\n[Retention Strategist]: Strong hook.\n[Entertainment Host]: Love it!",
            )),
            other => panic!("unexpected hint {other}"),
        });

        let result = consensus_loop(oracle)
            .debate(
                "draft",
                &context(),
                &EvaluatorProfile::default_panel(),
                &DebateConfig::default().with_transcript(true),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.rounds[0].transcript.len(), 2);
        assert!(result.rounds[0].transcript[0].starts_with("[Retention Strategist]"));
    }

    #[tokio::test]
    async fn test_debate_invalid_config_makes_no_calls() {
        let err = consensus_loop(MockOracle::new())
            .debate("draft", &context(), &[], &DebateConfig::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration { ref field, .. } if field == "panel"));
    }

    #[tokio::test]
    async fn test_debate_cancelled_returns_completed_rounds() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let mut oracle = MockOracle::new();
        oracle.expect_generate().returning(move |req| match req.hint() {
            ResponseHint::Evaluation => Ok(Completion::new(evaluation_text(50))),
            _ => {
                trigger.cancel();
                Ok(Completion::new("revised"))
            }
        });

        let result = consensus_loop(oracle)
            .debate("draft", &context(), &EvaluatorProfile::default_panel(), &DebateConfig::default(), &token)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.rounds.len(), 1);
        assert_eq!(result.final_content, "draft");
        assert_eq!(result.final_score, 50.0);
    }
}
