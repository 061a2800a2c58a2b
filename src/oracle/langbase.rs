use async_trait::async_trait;
use tracing::debug;

use super::{Completion, Oracle, OracleRequest};
use crate::config::{PipeConfig, PricingConfig};
use crate::error::OracleResult;
use crate::langbase::{LangbaseClient, Message, PipeRequest};

/// [`Oracle`] backed by Langbase Pipes.
///
/// Generation prompts run on the creative pipe and judging prompts on the
/// analytical pipe; sampling options travel as pipe variables.
#[derive(Clone)]
pub struct LangbaseOracle {
    client: LangbaseClient,
    pipes: PipeConfig,
    pricing: PricingConfig,
}

impl LangbaseOracle {
    pub fn new(client: LangbaseClient, pipes: PipeConfig, pricing: PricingConfig) -> Self {
        Self {
            client,
            pipes,
            pricing,
        }
    }

    fn pipe_for(&self, request: &OracleRequest) -> &str {
        if request.hint().is_analytical() {
            &self.pipes.analytical
        } else {
            &self.pipes.creative
        }
    }
}

#[async_trait]
impl Oracle for LangbaseOracle {
    async fn generate(&self, request: OracleRequest) -> OracleResult<Completion> {
        let pipe = self.pipe_for(&request).to_string();
        let options = &request.options;
        debug!(pipe = %pipe, hint = %options.hint, "Dispatching oracle request");

        let pipe_request = PipeRequest::new(&pipe, vec![Message::user(request.prompt.as_str())])
            .with_variable("temperature", options.temperature.to_string())
            .with_variable("max_tokens", options.max_output_tokens.to_string())
            .with_variable("response_hint", options.hint.as_str());

        let run = self.client.run_pipe(pipe_request).await?;
        let cost = run.usage.cost(&self.pricing);
        Ok(Completion::new(run.completion).with_cost(cost))
    }
}
