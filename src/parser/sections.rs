//! Labeled-section extraction (`LABEL:` blocks) and panel evaluation fields.

use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use super::{preview, Extracted, DECIMAL, LIST_MARKER, NEUTRAL_PANEL_SCORE};

/// Labels of a panel evaluation response, in the order they are requested.
pub const EVALUATION_LABELS: [&str; 6] = [
    "SCORE",
    "STRENGTHS",
    "WEAKNESSES",
    "IMPROVEMENTS",
    "REASONING",
    "QUOTE",
];

/// Sections of a response keyed by label.
///
/// A section starts after `LABEL:` at the beginning of a line (optionally
/// wrapped in markdown bold) and runs to the next known label or the end of
/// the text. When a label appears twice the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledSections {
    sections: HashMap<String, String>,
}

impl LabeledSections {
    /// Split `text` on the given labels (matched case-insensitively).
    pub fn parse(text: &str, labels: &[&str]) -> Self {
        if labels.is_empty() {
            return Self::default();
        }

        let alternation = labels
            .iter()
            .map(|label| regex::escape(label))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?im)^[ \t]*(?:\*\*)?({})(?:\*\*)?[ \t]*:", alternation);
        let Ok(marker) = Regex::new(&pattern) else {
            return Self::default();
        };

        let markers: Vec<(String, usize, usize)> = marker
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?.as_str().to_uppercase();
                Some((label, whole.start(), whole.end()))
            })
            .collect();

        let mut sections = HashMap::new();
        for (i, (label, _, body_start)) in markers.iter().enumerate() {
            let body_end = markers
                .get(i + 1)
                .map(|(_, next_start, _)| *next_start)
                .unwrap_or(text.len());
            let body = text[*body_start..body_end]
                .trim_matches(|c: char| c == '*' || c.is_whitespace())
                .to_string();
            sections.entry(label.clone()).or_insert(body);
        }

        Self { sections }
    }

    /// Section body for `label`, or `Missing` when the label never appeared.
    pub fn get(&self, label: &str) -> Extracted<&str> {
        self.sections
            .get(&label.to_uppercase())
            .map_or(Extracted::Missing, |body| Extracted::Found(body.as_str()))
    }

    /// Bulleted items of a section (`-`, `*`, `•` or `1.` markers).
    pub fn bullets(&self, label: &str) -> Extracted<Vec<String>> {
        self.get(label).map(bullet_items)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Lines of `text` that carry a list marker, with the marker stripped.
pub fn bullet_items(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| LIST_MARKER.is_match(line))
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Typed view of one panel member's evaluation response.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFields {
    pub score: Extracted<u32>,
    pub strengths: Extracted<Vec<String>>,
    pub weaknesses: Extracted<Vec<String>>,
    pub improvements: Extracted<Vec<String>>,
    pub reasoning: Extracted<String>,
    pub quote: Extracted<String>,
}

impl EvaluationFields {
    /// Score on the 0-100 scale, [`NEUTRAL_PANEL_SCORE`] when absent.
    pub fn score_or_neutral(&self) -> u32 {
        match self.score {
            Extracted::Found(score) => score,
            Extracted::Missing => NEUTRAL_PANEL_SCORE,
        }
    }
}

/// Parse a labeled evaluation (`SCORE:`, `STRENGTHS:` ... `QUOTE:`).
pub fn parse_evaluation(text: &str) -> EvaluationFields {
    let sections = LabeledSections::parse(text, &EVALUATION_LABELS);

    let score = match sections.get("SCORE") {
        Extracted::Found(body) => DECIMAL
            .find(body)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map_or(Extracted::Missing, |value| {
                Extracted::Found(value.round().clamp(0.0, 100.0) as u32)
            }),
        Extracted::Missing => Extracted::Missing,
    };
    if !score.is_found() {
        warn!(
            response_preview = %preview(text),
            default = NEUTRAL_PANEL_SCORE,
            "No panel score in evaluation response, using neutral default"
        );
    }

    EvaluationFields {
        score,
        strengths: sections.bullets("STRENGTHS"),
        weaknesses: sections.bullets("WEAKNESSES"),
        improvements: sections.bullets("IMPROVEMENTS"),
        reasoning: sections.get("REASONING").map(str::to_string),
        quote: sections
            .get("QUOTE")
            .map(|q| q.trim_matches(|c: char| c == '"' || c == '“' || c == '”').to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "SCORE: 88

STRENGTHS:
- Punchy opening line
- Clear payoff

WEAKNESSES:
- Middle section drags

IMPROVEMENTS:
- Cut the second anecdote
- Add a pattern interrupt at 20s
- Tighten the call to action

REASONING:
The hook lands inside three seconds and the structure holds.

QUOTE:
\"Three seconds is all you get.\"";

    #[test]
    fn test_parse_evaluation_well_formed() {
        let fields = parse_evaluation(WELL_FORMED);
        assert_eq!(fields.score, Extracted::Found(88));
        assert_eq!(
            fields.strengths,
            Extracted::Found(vec![
                "Punchy opening line".to_string(),
                "Clear payoff".to_string()
            ])
        );
        assert_eq!(
            fields.weaknesses,
            Extracted::Found(vec!["Middle section drags".to_string()])
        );
        assert_eq!(fields.improvements.clone().value_or_default().len(), 3);
        assert_eq!(
            fields.reasoning,
            Extracted::Found(
                "The hook lands inside three seconds and the structure holds.".to_string()
            )
        );
        assert_eq!(
            fields.quote,
            Extracted::Found("Three seconds is all you get.".to_string())
        );
    }

    #[test]
    fn test_parse_evaluation_is_repeatable() {
        assert_eq!(parse_evaluation(WELL_FORMED), parse_evaluation(WELL_FORMED));
    }

    #[test]
    fn test_parse_evaluation_markdown_and_fractions() {
        let text = "**SCORE:** 91/100\n**IMPROVEMENTS:**\n1. Shorter intro\n2) Stronger close";
        let fields = parse_evaluation(text);
        assert_eq!(fields.score, Extracted::Found(91));
        assert_eq!(
            fields.improvements,
            Extracted::Found(vec!["Shorter intro".to_string(), "Stronger close".to_string()])
        );
        assert_eq!(fields.strengths, Extracted::Missing);
    }

    #[test]
    fn test_parse_evaluation_without_score_uses_neutral() {
        let fields = parse_evaluation("I loved it, no notes.");
        assert_eq!(fields.score, Extracted::Missing);
        assert_eq!(fields.score_or_neutral(), NEUTRAL_PANEL_SCORE);
        assert_eq!(fields.improvements.value_or_default(), Vec::<String>::new());
        assert_eq!(fields.reasoning, Extracted::Missing);
    }

    #[test]
    fn test_parse_evaluation_clamps_out_of_range_score() {
        assert_eq!(parse_evaluation("SCORE: 140").score, Extracted::Found(100));
        assert_eq!(parse_evaluation("score: 86.6").score, Extracted::Found(87));
    }

    #[test]
    fn test_inline_label_words_do_not_split_sections() {
        let text = "REASONING:\nMy score: would be higher with a better hook.\nQUOTE:\nok";
        let sections = LabeledSections::parse(text, &EVALUATION_LABELS);
        assert_eq!(
            sections.get("REASONING"),
            Extracted::Found("My score: would be higher with a better hook.")
        );
        assert_eq!(sections.get("SCORE"), Extracted::Missing);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let sections = LabeledSections::parse("QUOTE: first\nQUOTE: second", &["QUOTE"]);
        assert_eq!(sections.get("quote"), Extracted::Found("first"));
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_no_labels_yields_empty_sections() {
        assert!(LabeledSections::parse("SCORE: 5", &[]).is_empty());
    }

    #[test]
    fn test_bullet_items_ignores_prose() {
        let items = bullet_items("Intro line\n- one\n  • two\nnot a bullet\n-\n");
        assert_eq!(items, vec!["one", "two"]);
    }
}
