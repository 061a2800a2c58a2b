use std::env;
use std::time::Duration;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub pricing: PricingConfig,
    pub engine: EngineConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe names.
///
/// Generation calls (branches, scripts, revisions, transcripts) go to the
/// creative pipe; scoring and panel evaluation go to the analytical pipe.
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub creative: String,
    pub analytical: String,
}

/// Token pricing used to attribute a cost to each oracle call (USD per 1M tokens)
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Engine-wide execution limits
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum oracle calls in flight within one phase.
    pub max_in_flight: usize,
    /// Optional deadline for a whole explore/rank/debate call.
    pub deadline: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS").unwrap_or(30000),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(3),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(1000),
        };

        let pipes = PipeConfig {
            creative: env::var("PIPE_CREATIVE")
                .unwrap_or_else(|_| "creative-generation-v1".to_string()),
            analytical: env::var("PIPE_ANALYTICAL")
                .unwrap_or_else(|_| "analytical-scoring-v1".to_string()),
        };

        let pricing = PricingConfig {
            input_per_mtok: parse_var("ORACLE_INPUT_COST_PER_MTOK").unwrap_or(3.0),
            output_per_mtok: parse_var("ORACLE_OUTPUT_COST_PER_MTOK").unwrap_or(15.0),
        };

        let max_in_flight: usize = parse_var("ENGINE_MAX_IN_FLIGHT").unwrap_or(4);
        if max_in_flight == 0 {
            return Err(AppError::Config {
                message: "ENGINE_MAX_IN_FLIGHT must be at least 1".to_string(),
            });
        }
        let engine = EngineConfig {
            max_in_flight,
            deadline: parse_var::<u64>("ENGINE_DEADLINE_MS").map(Duration::from_millis),
        };

        Ok(Config {
            langbase,
            logging,
            request,
            pipes,
            pricing,
            engine,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            creative: "creative-generation-v1".to_string(),
            analytical: "analytical-scoring-v1".to_string(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            input_per_mtok: 3.0,
            output_per_mtok: 15.0,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            deadline: None,
        }
    }
}
