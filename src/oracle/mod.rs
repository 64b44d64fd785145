//! The concept oracle: a language-model backend that proposes related
//! concepts and short explanations.
//!
//! Callers construct an [`LlmOracle`] from an [`OracleConfig`] once per
//! session and hold it for the app's lifetime; there is no hidden global
//! client state.

mod llm;

pub use llm::LlmOracle;

/// Shown when an explanation cannot be fetched. Clicking the node again
/// retries, since failures are never cached.
pub const EXPLANATION_UNAVAILABLE: &str =
	"No explanation is available right now. Click the node again to retry.";

/// How aggressively the oracle should relate concepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OracleMode {
	/// A broad mix of hierarchical, compositional, causal and loose relations.
	#[default]
	Default,
	/// Strictly and directly related concepts only.
	Precise,
}

/// Connection settings for the oracle backend.
///
/// Defaults target a local OpenAI-compatible endpoint (Ollama style) so the
/// app runs without credentials; `from_build_env` lets a deployment bake in
/// a hosted endpoint instead.
#[derive(Clone, Debug)]
pub struct OracleConfig {
	/// Base URL of an OpenAI-compatible API, without the trailing path.
	pub base_url: String,
	/// Bearer token, if the endpoint wants one.
	pub api_key: Option<String>,
	pub model: String,
	/// Upper bound on related concepts per request.
	pub max_items: usize,
}

impl Default for OracleConfig {
	fn default() -> Self {
		Self {
			base_url: "http://localhost:11434/v1".to_string(),
			api_key: None,
			model: "llama3.2:3b".to_string(),
			max_items: 8,
		}
	}
}

impl OracleConfig {
	/// Read overrides baked in at compile time. A browser app has no runtime
	/// environment, so deployment settings travel with the build.
	pub fn from_build_env() -> Self {
		let defaults = Self::default();
		Self {
			base_url: option_env!("ORACLE_BASE_URL")
				.map(str::to_string)
				.unwrap_or(defaults.base_url),
			api_key: option_env!("ORACLE_API_KEY").map(str::to_string),
			model: option_env!("ORACLE_MODEL")
				.map(str::to_string)
				.unwrap_or(defaults.model),
			max_items: defaults.max_items,
		}
	}
}

/// Why an oracle call failed. Internal to the search flow; the public
/// `fetch_*` surface degrades instead of propagating.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
	#[error("oracle request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("malformed oracle response: {0}")]
	Shape(&'static str),
}
