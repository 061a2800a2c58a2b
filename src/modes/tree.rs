//! Tree explorer - scored tree-of-thought expansion with pruning.
//!
//! Starting from the seed idea, each surviving node asks the oracle for up to
//! `max_branches` narrative angles, scores every angle concurrently, prunes
//! those under the threshold and descends into the survivors, best first.
//! A leaf that outscores the root becomes the selected direction; otherwise
//! the root itself is kept.
//!
//! Nodes live in an arena ([`ExplorationTree`]) and are referenced by index;
//! expansion uses an explicit stack instead of recursion.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{Idea, ModeCore};
use crate::error::{EngineError, EngineResult, OracleError};
use crate::oracle::{GenerateOptions, OracleRequest, ResponseHint};
use crate::parser::{parse_string_list, preview, unit_score};
use crate::prompts::{branch_prompt, branch_score_prompt};

/// Index of a node inside an [`ExplorationTree`].
pub type NodeIndex = usize;

/// Id of the root node; children are `<parent id>-<ordinal>`.
pub const ROOT_ID: &str = "root";

/// Score carried by the root node. A leaf must exceed it to be selected.
pub const ROOT_SCORE: f64 = 1.0;

const BRANCH_TEMPERATURE: f64 = 0.9;
const BRANCH_MAX_TOKENS: u32 = 1000;
const SCORE_TEMPERATURE: f64 = 0.3;
const SCORE_MAX_TOKENS: u32 = 10;

/// Exploration limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreConfig {
    /// Angles requested per expansion (>= 1)
    #[serde(default = "default_max_branches")]
    pub max_branches: usize,
    /// Maximum node depth; the root is depth 0
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Children scoring strictly below this are pruned (0.0-1.0)
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f64,
}

fn default_max_branches() -> usize {
    5
}

fn default_max_depth() -> usize {
    3
}

fn default_prune_threshold() -> f64 {
    0.6
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            max_branches: default_max_branches(),
            max_depth: default_max_depth(),
            prune_threshold: default_prune_threshold(),
        }
    }
}

impl ExploreConfig {
    pub fn with_max_branches(mut self, max_branches: usize) -> Self {
        self.max_branches = max_branches;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_prune_threshold(mut self, prune_threshold: f64) -> Self {
        self.prune_threshold = prune_threshold;
        self
    }

    /// Reject limits that cannot produce a meaningful exploration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_branches == 0 {
            return Err(EngineError::configuration(
                "max_branches",
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.prune_threshold) {
            return Err(EngineError::configuration(
                "prune_threshold",
                format!("must be within 0.0-1.0, got {}", self.prune_threshold),
            ));
        }
        Ok(())
    }
}

/// One node of the exploration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationNode {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip)]
    pub parent: Option<NodeIndex>,
    pub content: String,
    pub score: f64,
    pub depth: usize,
    /// Surviving children, best score first
    pub children: Vec<NodeIndex>,
    /// Children removed by pruning, in generation order
    pub pruned_children: Vec<NodeIndex>,
    pub is_pruned: bool,
    pub is_selected: bool,
}

impl ExplorationNode {
    fn root(content: impl Into<String>) -> Self {
        Self {
            id: ROOT_ID.to_string(),
            parent_id: None,
            parent: None,
            content: content.into(),
            score: ROOT_SCORE,
            depth: 0,
            children: Vec::new(),
            pruned_children: Vec::new(),
            is_pruned: false,
            is_selected: false,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena holding every node created during one exploration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ArenaNodes")]
pub struct ExplorationTree {
    nodes: Vec<ExplorationNode>,
}

/// Serialized arena; parent links are rebuilt from the child lists.
#[derive(Deserialize)]
struct ArenaNodes {
    nodes: Vec<ExplorationNode>,
}

impl From<ArenaNodes> for ExplorationTree {
    fn from(arena: ArenaNodes) -> Self {
        let mut nodes = arena.nodes;
        let len = nodes.len();
        let links: Vec<(NodeIndex, NodeIndex)> = nodes
            .iter()
            .enumerate()
            .flat_map(|(parent, node)| {
                node.children
                    .iter()
                    .chain(node.pruned_children.iter())
                    .map(move |&child| (parent, child))
            })
            .filter(|&(_, child)| child < len)
            .collect();
        for (parent, child) in links {
            nodes[child].parent = Some(parent);
        }
        Self { nodes }
    }
}

impl ExplorationTree {
    fn new(root_content: impl Into<String>) -> Self {
        Self {
            nodes: vec![ExplorationNode::root(root_content)],
        }
    }

    /// Index of the root node.
    pub const ROOT: NodeIndex = 0;

    pub fn root(&self) -> &ExplorationNode {
        &self.nodes[Self::ROOT]
    }

    pub fn get(&self, index: NodeIndex) -> Option<&ExplorationNode> {
        self.nodes.get(index)
    }

    /// Look a node up by its string id.
    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn nodes(&self) -> &[ExplorationNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes removed by pruning.
    pub fn pruned_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_pruned).count()
    }

    /// Pre-order walk over the full audit tree: surviving children first,
    /// then pruned children.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            order.push(index);
            let node = &self.nodes[index];
            stack.extend(node.pruned_children.iter().rev());
            stack.extend(node.children.iter().rev());
        }
        order
    }

    /// Nodes from the root down to `index`, inclusive.
    pub fn path_to(&self, index: NodeIndex) -> Vec<&ExplorationNode> {
        let mut path = Vec::new();
        let mut cursor = self.nodes.get(index);
        while let Some(node) = cursor {
            path.push(node);
            cursor = node.parent.and_then(|p| self.nodes.get(p));
        }
        path.reverse();
        path
    }

    /// Highest-scoring leaf, first in pre-order on ties.
    ///
    /// A leaf is a node without surviving children; pruned nodes qualify.
    /// The root is returned unless some leaf strictly exceeds its score.
    pub fn best_leaf(&self) -> NodeIndex {
        let (mut best, mut best_score) = (Self::ROOT, self.root().score);
        for index in self.preorder() {
            let node = &self.nodes[index];
            if node.is_root() || !node.children.is_empty() {
                continue;
            }
            if node.score > best_score {
                best = index;
                best_score = node.score;
            }
        }
        best
    }

    /// Nested JSON rendering of the audit tree, rooted at the root node.
    pub fn to_json(&self) -> serde_json::Value {
        self.node_json(Self::ROOT)
    }

    fn node_json(&self, index: NodeIndex) -> serde_json::Value {
        let node = &self.nodes[index];
        let children: Vec<_> = node
            .children
            .iter()
            .chain(node.pruned_children.iter())
            .map(|&child| self.node_json(child))
            .collect();
        serde_json::json!({
            "id": node.id,
            "parent_id": node.parent_id,
            "content": node.content,
            "score": node.score,
            "depth": node.depth,
            "is_pruned": node.is_pruned,
            "is_selected": node.is_selected,
            "children": children,
        })
    }

    fn push_child(&mut self, parent: NodeIndex, ordinal: usize, content: String, score: f64) -> NodeIndex {
        let (parent_id, depth) = {
            let p = &self.nodes[parent];
            (p.id.clone(), p.depth + 1)
        };
        let index = self.nodes.len();
        self.nodes.push(ExplorationNode {
            id: format!("{}-{}", parent_id, ordinal),
            parent_id: Some(parent_id),
            parent: Some(parent),
            content,
            score,
            depth,
            children: Vec::new(),
            pruned_children: Vec::new(),
            is_pruned: false,
            is_selected: false,
        });
        index
    }
}

/// Outcome of one exploration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreResult {
    /// The selected best leaf
    pub selected: ExplorationNode,
    pub tree: ExplorationTree,
    /// Every node created, root included
    pub total_explored: usize,
    pub total_pruned: usize,
    /// Exploration stopped early; the tree is partial
    pub cancelled: bool,
}

impl ExploreResult {
    /// Contents from the root to the selected node.
    pub fn reasoning_path(&self) -> Vec<String> {
        self.tree
            .find(&self.selected.id)
            .map(|index| {
                self.tree
                    .path_to(index)
                    .into_iter()
                    .map(|n| n.content.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

enum Expansion {
    /// Survivors to descend into, best first
    Grown(Vec<NodeIndex>),
    DeadEnd,
    Cancelled,
}

/// Tree-of-thought explorer.
#[derive(Clone)]
pub struct TreeExplorer {
    core: ModeCore,
}

impl TreeExplorer {
    pub fn new(core: ModeCore) -> Self {
        Self { core }
    }

    /// Explore narrative directions for `idea` and select the best leaf.
    ///
    /// Oracle failures only cost the affected subtree. Cancellation stops
    /// expansion and returns what was built so far.
    pub async fn explore(
        &self,
        idea: &Idea,
        niche: &str,
        config: &ExploreConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<ExploreResult> {
        config.validate()?;

        let span = info_span!("explore", run_id = %Uuid::new_v4(), title = %idea.title);
        self.run(idea, niche, config, cancel).instrument(span).await
    }

    async fn run(
        &self,
        idea: &Idea,
        niche: &str,
        config: &ExploreConfig,
        cancel: &CancellationToken,
    ) -> EngineResult<ExploreResult> {
        info!(
            max_branches = config.max_branches,
            max_depth = config.max_depth,
            prune_threshold = config.prune_threshold,
            "Starting tree exploration"
        );

        let mut tree = ExplorationTree::new(idea.description.clone());
        let mut stack = vec![ExplorationTree::ROOT];
        let mut cancelled = false;

        while let Some(index) = stack.pop() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            if tree.nodes[index].depth >= config.max_depth {
                continue;
            }

            match self.expand(&mut tree, index, idea, niche, config, cancel).await {
                Expansion::Grown(survivors) => stack.extend(survivors.into_iter().rev()),
                Expansion::DeadEnd => {}
                Expansion::Cancelled => {
                    cancelled = true;
                    break;
                }
            }
        }

        let selected = tree.best_leaf();
        tree.nodes[selected].is_selected = true;

        let result = ExploreResult {
            selected: tree.nodes[selected].clone(),
            total_explored: tree.len(),
            total_pruned: tree.pruned_count(),
            tree,
            cancelled,
        };

        info!(
            total_explored = result.total_explored,
            total_pruned = result.total_pruned,
            selected = %result.selected.id,
            score = result.selected.score,
            cancelled,
            "Tree exploration complete"
        );

        Ok(result)
    }

    async fn expand(
        &self,
        tree: &mut ExplorationTree,
        index: NodeIndex,
        idea: &Idea,
        niche: &str,
        config: &ExploreConfig,
        cancel: &CancellationToken,
    ) -> Expansion {
        let parent_id = tree.nodes[index].id.clone();

        let request = OracleRequest::new(
            branch_prompt(&idea.title, niche, &tree.nodes[index].content, config.max_branches),
            GenerateOptions::new(ResponseHint::Branches)
                .with_temperature(BRANCH_TEMPERATURE)
                .with_max_output_tokens(BRANCH_MAX_TOKENS),
        );
        let angles = match self.core.call(request, cancel).await {
            Ok(reply) => parse_string_list(&reply.text, config.max_branches),
            Err(OracleError::Cancelled) => return Expansion::Cancelled,
            Err(e) => {
                warn!(node = %parent_id, error = %e, "Branch generation failed, node is a dead end");
                return Expansion::DeadEnd;
            }
        };
        if angles.is_empty() {
            debug!(node = %parent_id, "No angles produced, node is a dead end");
            return Expansion::DeadEnd;
        }

        let requests = angles
            .iter()
            .map(|angle| {
                OracleRequest::new(
                    branch_score_prompt(&idea.title, niche, angle),
                    GenerateOptions::new(ResponseHint::BranchScore)
                        .with_temperature(SCORE_TEMPERATURE)
                        .with_max_output_tokens(SCORE_MAX_TOKENS),
                )
            })
            .collect();
        let replies = self.core.call_all(requests, cancel).await;

        let mut survivors = Vec::new();
        let mut pruned = Vec::new();
        let mut interrupted = false;

        for (ordinal, (angle, reply)) in angles.into_iter().zip(replies).enumerate() {
            let score = match reply {
                Ok(reply) => unit_score(&reply.text),
                Err(OracleError::Cancelled) => {
                    interrupted = true;
                    continue;
                }
                Err(e) => {
                    warn!(
                        node = %parent_id,
                        angle = %preview(&angle),
                        error = %e,
                        "Scoring failed, dropping angle"
                    );
                    continue;
                }
            };

            let child = tree.push_child(index, ordinal, angle, score);
            if score < config.prune_threshold {
                tree.nodes[child].is_pruned = true;
                pruned.push(child);
            } else {
                survivors.push(child);
            }
        }

        // Stable sort keeps generation order among equal scores
        survivors.sort_by(|&a, &b| {
            tree.nodes[b]
                .score
                .partial_cmp(&tree.nodes[a].score)
                .unwrap_or(Ordering::Equal)
        });

        debug!(
            node = %parent_id,
            survivors = survivors.len(),
            pruned = pruned.len(),
            "Expanded node"
        );

        let parent = &mut tree.nodes[index];
        parent.children = survivors.clone();
        parent.pruned_children = pruned;

        if interrupted {
            Expansion::Cancelled
        } else if survivors.is_empty() {
            Expansion::DeadEnd
        } else {
            Expansion::Grown(survivors)
        }
    }
}
