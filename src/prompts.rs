//! Centralized prompt definitions for the refinement engine
//!
//! System prompts are installed on the Langbase pipes at startup; the
//! builder functions render the per-call user prompts. Keeping the wording
//! here makes it easy to version alongside the parsers that read the replies.

use std::fmt::Write as _;

/// System prompt for the creative pipe (branches, scripts, revisions, transcripts).
pub const CREATIVE_SYSTEM_PROMPT: &str = r#"You are a creative director for short-form faceless video channels.

Guidelines:
- Follow the requested output format exactly
- Favor concrete, surprising angles over generic ones
- Keep each idea distinct from the others you produce
- Never add commentary before or after the requested output"#;

/// System prompt for the analytical pipe (scoring and panel evaluation).
pub const ANALYTICAL_SYSTEM_PROMPT: &str = r#"You are a video performance analyst who judges content against explicit criteria.

Guidelines:
- Score consistently: equal quality earns equal scores
- When asked for a single number, reply with the number only
- When asked for labeled sections, use exactly the labels requested
- Ground every judgment in the content you were shown"#;

/// Pipe description for the creative pipe.
pub const CREATIVE_PIPE_DESCRIPTION: &str = "Creative generation for narrative angles, scripts and revisions";

/// Pipe description for the analytical pipe.
pub const ANALYTICAL_PIPE_DESCRIPTION: &str = "Analytical scoring for narrative angles, scripts and panel evaluations";

/// Ask for `count` narrative angles continuing `direction`.
pub fn branch_prompt(title: &str, niche: &str, direction: &str, count: usize) -> String {
    format!(
        r#"Explore narrative paths for a faceless video.

Video title: "{title}"
Niche: {niche}
Current narrative direction: "{direction}"

Propose {count} distinct creative angles or story progressions that build on the current direction.

Reply with ONLY a JSON array of strings, one angle per string.
Example: ["first angle", "second angle"]"#
    )
}

/// Ask for a 0.0-1.0 score for one narrative angle.
pub fn branch_score_prompt(title: &str, niche: &str, angle: &str) -> String {
    format!(
        r#"Video title: "{title}"
Niche: {niche}
Narrative angle: "{angle}"

Rate this angle from 0.0 to 1.0 considering:
- Engagement: will viewers stay interested?
- Retention: will they watch to the end?
- Shareability: will they pass it on?
- Originality: does it stand apart from similar videos?

Reply with ONLY a single number between 0.0 and 1.0."#
    )
}

/// Inputs for a full script generation prompt.
#[derive(Debug, Clone, Copy)]
pub struct ScriptBrief<'a> {
    pub title: &'a str,
    pub niche: &'a str,
    pub direction: &'a str,
    pub keywords: &'a [String],
    pub target_duration_secs: u32,
    pub target_words: usize,
    pub min_words: usize,
    pub max_words: usize,
    pub style: &'a str,
}

/// Ask for a complete structured script.
pub fn script_prompt(brief: &ScriptBrief<'_>) -> String {
    let keywords = if brief.keywords.is_empty() {
        "none".to_string()
    } else {
        brief.keywords.join(", ")
    };

    format!(
        r#"Write a narration script for a faceless video.

Title: "{title}"
Niche: {niche}
Narrative direction: "{direction}"
Target duration: {duration} seconds (about {target_words} words)

Requirements:
1. Mark the sections [HOOK], [MAIN CONTENT] and [CALL TO ACTION]. The hook must land in the first few seconds.
2. {style}
3. Length: {min_words}-{max_words} words of narration.
4. Add visual cues inline as [VISUAL: description of the shot].
5. Work these keywords in naturally: {keywords}

Reply with ONLY the script."#,
        title = brief.title,
        niche = brief.niche,
        direction = brief.direction,
        duration = brief.target_duration_secs,
        target_words = brief.target_words,
        style = brief.style,
        min_words = brief.min_words,
        max_words = brief.max_words,
    )
}

/// Ask for a 0.0-1.0 predicted-performance score for a script excerpt.
pub fn script_score_prompt(title: &str, niche: &str, excerpt: &str) -> String {
    format!(
        r#"Video title: "{title}"
Niche: {niche}
Script excerpt: "{excerpt}..."

Rate the script from 0.0 to 1.0 considering hook strength, retention potential, call-to-action effectiveness, natural keyword use, emotional pull and shareability.

Reply with ONLY a single number between 0.0 and 1.0."#
    )
}

/// Persona and context for one panel evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationBrief<'a> {
    pub name: &'a str,
    pub background: &'a str,
    pub expertise: &'a [String],
    pub criteria: &'a [String],
    pub personality: &'a str,
    pub speaking_style: &'a str,
    pub niche: &'a str,
    pub topic: &'a str,
    pub purpose: &'a str,
    pub approval_threshold: u32,
}

/// Ask one panel member for a labeled evaluation.
pub fn evaluation_prompt(brief: &EvaluationBrief<'_>, content: &str) -> String {
    format!(
        r#"You are {name}.

Background: {background}
Expertise: {expertise}
Personality: {personality}
Speaking style: {speaking_style}

CONTENT TO EVALUATE:
"""
{content}
"""

CONTEXT:
- Niche: {niche}
- Topic: {topic}
- Purpose: {purpose}

Judge the content against your criteria:
{criteria}

Answer in exactly this format:

SCORE: [0-100, {threshold} or above means approved]

STRENGTHS:
- [2-3 strong points]

WEAKNESSES:
- [2-3 weak points]

IMPROVEMENTS:
- [3-5 specific, actionable changes]

REASONING:
[Why you gave this score, from your point of view]

QUOTE:
[One line in your own voice summing up your take]"#,
        name = brief.name,
        background = brief.background,
        expertise = brief.expertise.join(", "),
        personality = brief.personality,
        speaking_style = brief.speaking_style,
        niche = brief.niche,
        topic = brief.topic,
        purpose = brief.purpose,
        criteria = numbered(brief.criteria),
        threshold = brief.approval_threshold,
    )
}

/// Ask for a revision that addresses every listed improvement.
pub fn revision_prompt(
    content: &str,
    improvements: &[String],
    niche: &str,
    topic: &str,
    purpose: &str,
) -> String {
    format!(
        r#"Revise this content using the expert feedback below.

CURRENT CONTENT:
"""
{content}
"""

IMPROVEMENTS REQUESTED:
{improvements}

CONTEXT:
- Niche: {niche}
- Topic: {topic}
- Purpose: {purpose}

Address all of the feedback while keeping the core message.

Reply with ONLY the revised content."#,
        improvements = numbered(improvements),
    )
}

/// One panel member's verdict as shown to the transcript writer.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptVoice<'a> {
    pub name: &'a str,
    pub score: u32,
    pub strengths: &'a [String],
    pub weaknesses: &'a [String],
    pub quote: &'a str,
}

/// Ask for a short debate between the panel members who evaluated the content.
pub fn transcript_prompt(voices: &[TranscriptVoice<'_>]) -> String {
    let names: Vec<&str> = voices.iter().map(|v| v.name).collect();
    let mut evaluations = String::new();
    for voice in voices {
        let _ = writeln!(
            evaluations,
            "{} (score {}/100):\n- Strengths: {}\n- Weaknesses: {}\n- Quote: \"{}\"\n",
            voice.name,
            voice.score,
            voice.strengths.join(", "),
            voice.weaknesses.join(", "),
            voice.quote
        );
    }

    format!(
        r#"Write a debate transcript in which {names} discuss this content.

EVALUATIONS:
{evaluations}
In the debate they argue from their own perspectives, challenge each other, propose improvements and work toward agreement.

Format every line as:
[NAME]: statement

Keep it to 6-10 exchanges."#,
        names = names.join(", "),
    )
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}
