//! # Idea Refinery
//!
//! An iterative scored-refinement engine that turns a seed idea into a
//! vetted artifact by driving an LLM oracle through three stages.
//!
//! ## Features
//!
//! - **Tree Exploration**: tree-of-thought expansion with scoring and pruning
//! - **Beam Ranking**: parallel candidate generation at varied temperatures, scored and ranked
//! - **Consensus Loop**: panel evaluation and revision until every evaluator approves
//! - **Text-Field Parsing**: tolerant extraction of scores, lists and labeled sections
//!
//! ## Architecture
//!
//! ```text
//! Caller → Refinery (Rust) → Oracle trait → Langbase Pipes (HTTP)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use idea_refinery::{Config, Idea, Refinery, ExploreConfig};
//! use idea_refinery::langbase::LangbaseClient;
//! use idea_refinery::oracle::LangbaseOracle;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let oracle = LangbaseOracle::new(client, config.pipes.clone(), config.pricing.clone());
//!     let refinery = Refinery::new(Arc::new(oracle), &config.engine);
//!
//!     let idea = Idea::new("Deep Sea Cities", "Hidden structures on the ocean floor");
//!     let explored = refinery
//!         .explore(&idea, "science", &ExploreConfig::default(), &CancellationToken::new())
//!         .await?;
//!     println!("{}", explored.selected.content);
//!     Ok(())
//! }
//! ```

/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// Engine components: tree explorer, beam ranker, consensus loop.
pub mod modes;
/// The generation/scoring oracle abstraction and its Langbase implementation.
pub mod oracle;
/// Tolerant extraction of structured fields from oracle text.
pub mod parser;
/// System prompts and per-call prompt builders.
pub mod prompts;

pub use config::Config;
pub use error::{AppError, AppResult, EngineError, EngineResult, OracleError};
pub use modes::{
    BeamRanker, ConsensusLoop, DebateConfig, DebateContext, DebateResult, EvaluatorProfile,
    ExploreConfig, ExploreResult, Idea, RankConfig, RankResult, Refinery, TreeExplorer,
};
pub use oracle::{Completion, Oracle, OracleRequest};
