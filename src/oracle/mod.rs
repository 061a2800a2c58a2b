//! The generation/scoring oracle consumed by every engine component.
//!
//! The engine only knows [`Oracle::generate`]: a prompt goes in, text comes
//! out. Which model or provider serves the call is the implementation's
//! concern ([`LangbaseOracle`] routes by [`ResponseHint`] to a pipe).

mod langbase;

pub use langbase::LangbaseOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleResult;

/// What kind of answer a prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseHint {
    /// A list of narrative angles for tree expansion.
    Branches,
    /// A single 0.0-1.0 score for a narrative angle.
    BranchScore,
    /// A complete structured script.
    Script,
    /// A single 0.0-1.0 score for a script excerpt.
    ScriptScore,
    /// A labeled panel evaluation with a 0-100 score.
    Evaluation,
    /// A revised artifact incorporating feedback.
    Revision,
    /// A debate transcript between panel members.
    Transcript,
}

impl ResponseHint {
    /// Get the hint name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseHint::Branches => "branches",
            ResponseHint::BranchScore => "branch_score",
            ResponseHint::Script => "script",
            ResponseHint::ScriptScore => "script_score",
            ResponseHint::Evaluation => "evaluation",
            ResponseHint::Revision => "revision",
            ResponseHint::Transcript => "transcript",
        }
    }

    /// Whether the call judges content rather than producing it.
    pub fn is_analytical(&self) -> bool {
        matches!(
            self,
            ResponseHint::BranchScore | ResponseHint::ScriptScore | ResponseHint::Evaluation
        )
    }
}

impl std::fmt::Display for ResponseHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sampling options sent with each prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub hint: ResponseHint,
}

impl GenerateOptions {
    /// Options with the default temperature (0.7) and output budget (4000 tokens).
    pub fn new(hint: ResponseHint) -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 4000,
            hint,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// One prompt to the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub prompt: String,
    pub options: GenerateOptions,
}

impl OracleRequest {
    pub fn new(prompt: impl Into<String>, options: GenerateOptions) -> Self {
        Self {
            prompt: prompt.into(),
            options,
        }
    }

    #[inline]
    pub fn hint(&self) -> ResponseHint {
        self.options.hint
    }
}

/// Text returned by the oracle, with the cost it reported (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub cost: f64,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cost: 0.0,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

/// Text generation capability.
///
/// Implementations surface every failure as
/// [`OracleError::Unavailable`](crate::error::OracleError::Unavailable).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Run one prompt and return the generated text.
    async fn generate(&self, request: OracleRequest) -> OracleResult<Completion>;
}
