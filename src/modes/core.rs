//! Core infrastructure shared by all engine components.
//!
//! [`ModeCore`] owns the oracle handle and the in-flight bound, and is the
//! only place oracle calls are issued: every call races the caller's
//! cancellation token and is timed, and phase fan-out preserves input order
//! so results map back to their node, candidate or evaluator by position.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{OracleError, OracleResult};
use crate::oracle::{Oracle, OracleRequest};

/// An oracle completion with the latency observed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleReply {
    pub text: String,
    pub cost: f64,
    pub latency_ms: u64,
}

/// Core infrastructure shared by the explorer, ranker and consensus loop.
///
/// # Example
///
/// ```ignore
/// let core = ModeCore::new(Arc::new(oracle), &config.engine);
/// let explorer = TreeExplorer::new(core.clone());
/// let ranker = BeamRanker::new(core);
/// ```
#[derive(Clone)]
pub struct ModeCore {
    oracle: Arc<dyn Oracle>,
    max_in_flight: usize,
}

impl ModeCore {
    /// Create a core with the engine's concurrency limit.
    pub fn new(oracle: Arc<dyn Oracle>, config: &EngineConfig) -> Self {
        Self::with_max_in_flight(oracle, config.max_in_flight)
    }

    /// Create a core allowing at most `max_in_flight` concurrent calls per phase.
    pub fn with_max_in_flight(oracle: Arc<dyn Oracle>, max_in_flight: usize) -> Self {
        Self {
            oracle,
            max_in_flight: max_in_flight.max(1),
        }
    }

    #[inline]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Issue one oracle call, abandoning it if `cancel` fires first.
    pub async fn call(
        &self,
        request: OracleRequest,
        cancel: &CancellationToken,
    ) -> OracleResult<OracleReply> {
        if cancel.is_cancelled() {
            return Err(OracleError::Cancelled);
        }

        let hint = request.hint();
        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OracleError::Cancelled),
            result = self.oracle.generate(request) => result,
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(completion) => {
                debug!(hint = %hint, latency_ms, cost = completion.cost, "Oracle call completed");
                Ok(OracleReply {
                    text: completion.text,
                    cost: completion.cost,
                    latency_ms,
                })
            }
            Err(OracleError::Cancelled) => {
                debug!(hint = %hint, latency_ms, "Oracle call abandoned on cancellation");
                Err(OracleError::Cancelled)
            }
            Err(e) => {
                warn!(hint = %hint, error = %e, latency_ms, "Oracle call failed");
                Err(e)
            }
        }
    }

    /// Issue independent calls concurrently, bounded by `max_in_flight`.
    ///
    /// The output has one entry per request, in request order, whatever the
    /// completion order was.
    pub async fn call_all(
        &self,
        requests: Vec<OracleRequest>,
        cancel: &CancellationToken,
    ) -> Vec<OracleResult<OracleReply>> {
        stream::iter(requests)
            .map(|request| self.call(request, cancel))
            .buffered(self.max_in_flight)
            .collect()
            .await
    }
}

/// Child of `parent` that is additionally cancelled once `deadline` elapses.
///
/// Must be called inside a Tokio runtime.
pub fn deadline_token(parent: &CancellationToken, deadline: Option<Duration>) -> CancellationToken {
    let child = parent.child_token();
    if let Some(deadline) = deadline {
        let timer = child.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    warn!(deadline_ms = deadline.as_millis() as u64, "Engine deadline reached, cancelling");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });
    }
    child
}
