//! Script structure: opening / body / call-to-action sections and visual cues.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::Extracted;

const SECTION_NAMES: &str = "hook|opening|main content|body|call to action|cta";

static SECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?im)\[(?P<b>{names})\]|^[ \t]*#{{1,6}}[ \t]*(?P<h>{names})[ \t]*:?[ \t]*$|^[ \t]*(?P<c>{names})[ \t]*:",
        names = SECTION_NAMES
    ))
    .expect("valid section marker regex")
});

static VISUAL_CUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[VISUAL:\s*([^\]]+)\]").expect("valid visual cue regex"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid bracket regex"));

/// The three structural sections of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptSection {
    Opening,
    Body,
    CallToAction,
}

impl ScriptSection {
    fn from_marker(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "hook" | "opening" => Some(ScriptSection::Opening),
            "main content" | "body" => Some(ScriptSection::Body),
            "call to action" | "cta" => Some(ScriptSection::CallToAction),
            _ => None,
        }
    }
}

/// Resolved script sections, empty strings where a section was missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptStructure {
    pub opening: String,
    pub body: String,
    pub call_to_action: String,
}

/// A script split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScript {
    pub opening: Extracted<String>,
    pub body: Extracted<String>,
    pub call_to_action: Extracted<String>,
    /// `[VISUAL: ...]` descriptions in order of appearance.
    pub visual_cues: Vec<String>,
    /// Words outside bracketed markers and cues.
    pub word_count: usize,
}

impl ParsedScript {
    /// Parse `[HOOK]` / `[MAIN CONTENT]` / `[CALL TO ACTION]` style markers.
    ///
    /// Markdown headings (`## Hook`) and line-leading `HOOK:` labels are
    /// accepted too. Each section runs to the next section marker.
    pub fn parse(content: &str) -> Self {
        let markers: Vec<(ScriptSection, usize, usize)> = SECTION_MARKER
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps
                    .name("b")
                    .or_else(|| caps.name("h"))
                    .or_else(|| caps.name("c"))?;
                let section = ScriptSection::from_marker(name.as_str())?;
                Some((section, whole.start(), whole.end()))
            })
            .collect();

        let section_text = |wanted: ScriptSection| -> Extracted<String> {
            markers
                .iter()
                .enumerate()
                .find(|(_, (section, _, _))| *section == wanted)
                .map_or(Extracted::Missing, |(i, (_, _, body_start))| {
                    let body_end = markers
                        .get(i + 1)
                        .map(|(_, next_start, _)| *next_start)
                        .unwrap_or(content.len());
                    Extracted::Found(content[*body_start..body_end].trim().to_string())
                })
        };

        Self {
            opening: section_text(ScriptSection::Opening),
            body: section_text(ScriptSection::Body),
            call_to_action: section_text(ScriptSection::CallToAction),
            visual_cues: visual_cues(content),
            word_count: word_count(content),
        }
    }

    /// Sections with missing ones resolved to empty strings.
    pub fn structure(&self) -> ScriptStructure {
        ScriptStructure {
            opening: self.opening.clone().value_or_default(),
            body: self.body.clone().value_or_default(),
            call_to_action: self.call_to_action.clone().value_or_default(),
        }
    }
}

/// Descriptions of all `[VISUAL: ...]` cues.
pub fn visual_cues(content: &str) -> Vec<String> {
    VISUAL_CUE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|cue| !cue.is_empty())
        .collect()
}

/// Whitespace-separated words after removing every bracketed token.
pub fn word_count(content: &str) -> usize {
    BRACKETED.replace_all(content, " ").split_whitespace().count()
}
