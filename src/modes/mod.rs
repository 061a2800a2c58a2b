//! Refinement engine components.
//!
//! - [`TreeExplorer`]: scored tree-of-thought exploration with pruning
//! - [`BeamRanker`]: parallel candidate generation, scoring and ranking
//! - [`ConsensusLoop`]: panel evaluation and revision until approval
//!
//! All components share oracle access, fan-out bounds and cancellation via
//! [`ModeCore`] composition. [`Refinery`] bundles the three behind one handle
//! and applies the engine deadline.

mod beam;
mod consensus;
mod core;
mod tree;

pub use beam::*;
pub use consensus::*;
pub use core::*;
pub use tree::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::oracle::Oracle;

/// A seed idea to refine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Idea {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// The three engine entry points over one oracle.
#[derive(Clone)]
pub struct Refinery {
    tree: TreeExplorer,
    beam: BeamRanker,
    consensus: ConsensusLoop,
    deadline: Option<Duration>,
}

impl Refinery {
    pub fn new(oracle: Arc<dyn Oracle>, config: &EngineConfig) -> Self {
        let core = ModeCore::new(oracle, config);
        Self {
            tree: TreeExplorer::new(core.clone()),
            beam: BeamRanker::new(core.clone()),
            consensus: ConsensusLoop::new(core),
            deadline: config.deadline,
        }
    }

    /// See [`TreeExplorer::explore`].
    pub async fn explore(
        &self,
        idea: &Idea,
        niche: &str,
        config: &ExploreConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<ExploreResult> {
        let token = deadline_token(cancel, self.deadline);
        let result = self.tree.explore(idea, niche, config, &token).await;
        token.cancel();
        result
    }

    /// See [`BeamRanker::rank`].
    pub async fn rank(
        &self,
        idea: &Idea,
        direction: &str,
        niche: &str,
        config: &RankConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<RankResult> {
        let token = deadline_token(cancel, self.deadline);
        let result = self.beam.rank(idea, direction, niche, config, &token).await;
        token.cancel();
        result
    }

    /// See [`ConsensusLoop::debate`].
    pub async fn debate(
        &self,
        initial_content: &str,
        context: &DebateContext,
        panel: &[EvaluatorProfile],
        config: &DebateConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<DebateResult> {
        let token = deadline_token(cancel, self.deadline);
        let result = self
            .consensus
            .debate(initial_content, context, panel, config, &token)
            .await;
        token.cancel();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;

    #[test]
    fn test_idea_deserialize_without_keywords() {
        let idea: Idea =
            serde_json::from_str(r#"{"title": "T", "description": "D"}"#).unwrap();
        assert_eq!(idea, Idea::new("T", "D"));
    }

    #[tokio::test]
    async fn test_refinery_honors_caller_cancellation() {
        let refinery = Refinery::new(Arc::new(MockOracle::new()), &EngineConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = refinery
            .debate(
                "draft",
                &DebateContext::default(),
                &EvaluatorProfile::default_panel(),
                &DebateConfig::default(),
                &cancel,
            )
            .await
            .unwrap();

        assert!(result.cancelled);
        assert!(result.rounds.is_empty());
        assert_eq!(result.final_content, "draft");
    }
}
