//! Chat-completions client and the defensive parsing of model output.

use log::warn;
use serde::Deserialize;

use super::{OracleConfig, OracleError, OracleMode, EXPLANATION_UNAVAILABLE};
use crate::graph::model::{GeneratedItem, RelationKind};

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct LlmOracle {
	client: reqwest::Client,
	config: OracleConfig,
}

impl LlmOracle {
	pub fn new(config: OracleConfig) -> Self {
		Self {
			client: reqwest::Client::new(),
			config,
		}
	}

	/// Related concepts for `term`, or the failure as an error. Used by the
	/// search flow, which commits all-or-nothing.
	pub async fn try_related(
		&self,
		term: &str,
		mode: OracleMode,
	) -> Result<Vec<GeneratedItem>, OracleError> {
		let content = self
			.complete(&related_prompt(term, mode, self.config.max_items))
			.await?;
		Ok(parse_items(&content, self.config.max_items))
	}

	/// Related concepts for `term`; failures degrade to an empty list, which
	/// callers treat as "no expansion occurred".
	pub async fn fetch_related(&self, term: &str, mode: OracleMode) -> Vec<GeneratedItem> {
		match self.try_related(term, mode).await {
			Ok(items) => items,
			Err(err) => {
				warn!("related-concepts request for {term:?} failed: {err}");
				Vec::new()
			}
		}
	}

	/// Prose explanation of `term`, or the failure as an error.
	pub async fn try_explanation(&self, term: &str) -> Result<String, OracleError> {
		let content = self.complete(&explanation_prompt(term)).await?;
		let text = content.trim();
		if text.is_empty() {
			return Err(OracleError::Shape("empty explanation"));
		}
		Ok(text.to_string())
	}

	/// Prose explanation of `term`; failures degrade to a fixed message.
	pub async fn fetch_explanation(&self, term: &str) -> String {
		match self.try_explanation(term).await {
			Ok(text) => text,
			Err(err) => {
				warn!("explanation request for {term:?} failed: {err}");
				EXPLANATION_UNAVAILABLE.to_string()
			}
		}
	}

	async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
		let body = serde_json::json!({
			"model": self.config.model,
			"messages": [{ "role": "user", "content": prompt }],
			"temperature": 0.7,
		});

		let url = format!(
			"{}/chat/completions",
			self.config.base_url.trim_end_matches('/')
		);
		let mut request = self.client.post(&url).json(&body);
		if let Some(key) = &self.config.api_key {
			request = request.bearer_auth(key);
		}

		let response: serde_json::Value = request
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;

		response["choices"][0]["message"]["content"]
			.as_str()
			.map(str::to_string)
			.ok_or(OracleError::Shape("missing choices[0].message.content"))
	}
}

fn related_prompt(term: &str, mode: OracleMode, limit: usize) -> String {
	let constraint = match mode {
		OracleMode::Default => {
			"Mix hierarchical, compositional, causal and loosely associated concepts."
		}
		OracleMode::Precise => {
			"Only include strictly and directly related concepts; prefer narrow technical relations over loose associations."
		}
	};
	format!(
		"You are generating a knowledge graph. List up to {limit} concepts related to \"{term}\". {constraint} \
		 Respond with only a JSON array, no prose, where each element is \
		 {{\"label\": the concept name, \"relation\": a short phrase linking \"{term}\" to the concept, \
		 \"relationType\": one of \"hierarchical\", \"compositional\", \"causal\", \"neutral\", \
		 \"explanation\": one or two sentences about the concept}}."
	)
}

fn explanation_prompt(term: &str) -> String {
	format!(
		"Explain the concept \"{term}\" in two or three plain sentences for a curious reader. \
		 Respond with only the explanation text."
	)
}

/// Wire shape of one related-concept element. Every field defaults so a
/// partially wrong element degrades instead of sinking the batch.
#[derive(Deserialize)]
struct RawItem {
	#[serde(default)]
	label: String,
	#[serde(default)]
	relation: String,
	#[serde(default, rename = "relationType", alias = "relation_type")]
	relation_type: String,
	#[serde(default)]
	explanation: String,
}

/// Extract generated items from model output. Tolerates markdown fences,
/// an `{"items": [...]}` wrapper and surrounding prose; anything beyond
/// that yields an empty batch, never an error.
fn parse_items(content: &str, limit: usize) -> Vec<GeneratedItem> {
	let Some(value) = extract_json(content) else {
		warn!("oracle returned no parsable JSON: {:.80}", content);
		return Vec::new();
	};

	let elements = match &value {
		serde_json::Value::Array(items) => items.as_slice(),
		serde_json::Value::Object(map) => match map.get("items").and_then(|v| v.as_array()) {
			Some(items) => items.as_slice(),
			None => {
				warn!("oracle JSON has no item array");
				return Vec::new();
			}
		},
		_ => return Vec::new(),
	};

	elements
		.iter()
		.filter_map(|element| {
			let raw: RawItem = serde_json::from_value(element.clone()).ok()?;
			let label = raw.label.trim();
			if label.is_empty() {
				return None;
			}
			let relation = raw.relation.trim();
			let explanation = raw.explanation.trim();
			Some(GeneratedItem {
				label: label.to_string(),
				relation: if relation.is_empty() {
					"related to".to_string()
				} else {
					relation.to_string()
				},
				kind: RelationKind::from_label(&raw.relation_type),
				explanation: (!explanation.is_empty()).then(|| explanation.to_string()),
			})
		})
		.take(limit)
		.collect()
}

fn extract_json(content: &str) -> Option<serde_json::Value> {
	let body = strip_code_fences(content);
	if let Ok(value) = serde_json::from_str(body) {
		return Some(value);
	}
	// Models sometimes wrap the array in prose; take the outermost brackets.
	let start = body.find('[')?;
	let end = body.rfind(']')?;
	if end <= start {
		return None;
	}
	serde_json::from_str(&body[start..=end]).ok()
}

fn strip_code_fences(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	// Skip the info string ("json") on the opening fence line.
	let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
	rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_plain_array() {
		let items = parse_items(
			r#"[{"label": "Cephalopod", "relation": "is a type of", "relationType": "hierarchical", "explanation": "A mollusc class."}]"#,
			8,
		);
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].label, "Cephalopod");
		assert_eq!(items[0].relation, "is a type of");
		assert_eq!(items[0].kind, RelationKind::Hierarchical);
		assert_eq!(items[0].explanation.as_deref(), Some("A mollusc class."));
	}

	#[test]
	fn parses_a_fenced_array() {
		let content = "```json\n[{\"label\": \"Ink\", \"relation\": \"produces\", \"relationType\": \"causal\"}]\n```";
		let items = parse_items(content, 8);
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].kind, RelationKind::Causal);
		assert_eq!(items[0].explanation, None);
	}

	#[test]
	fn parses_an_items_wrapper_object() {
		let items = parse_items(r#"{"items": [{"label": "Ink", "relation": "produces"}]}"#, 8);
		assert_eq!(items.len(), 1);
	}

	#[test]
	fn recovers_an_array_wrapped_in_prose() {
		let content = "Here you go:\n[{\"label\": \"Ink\", \"relation\": \"produces\"}]\nHope that helps!";
		assert_eq!(parse_items(content, 8).len(), 1);
	}

	#[test]
	fn garbage_degrades_to_an_empty_batch() {
		assert!(parse_items("I cannot answer that.", 8).is_empty());
		assert!(parse_items("", 8).is_empty());
		assert!(parse_items("{\"answer\": 42}", 8).is_empty());
	}

	#[test]
	fn unknown_relation_types_become_neutral() {
		let items = parse_items(
			r#"[{"label": "Ink", "relation": "produces", "relationType": "weird"}]"#,
			8,
		);
		assert_eq!(items[0].kind, RelationKind::Neutral);
	}

	#[test]
	fn blank_labels_and_missing_relations_degrade() {
		let items = parse_items(
			r#"[{"label": "  "}, {"label": "Ink"}]"#,
			8,
		);
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].relation, "related to");
	}

	#[test]
	fn batches_truncate_to_the_limit() {
		let content = r#"[
			{"label": "a", "relation": "r"}, {"label": "b", "relation": "r"},
			{"label": "c", "relation": "r"}, {"label": "d", "relation": "r"}
		]"#;
		assert_eq!(parse_items(content, 2).len(), 2);
	}

	#[test]
	fn related_prompts_differ_by_mode() {
		let loose = related_prompt("Octopus", OracleMode::Default, 8);
		let tight = related_prompt("Octopus", OracleMode::Precise, 8);
		assert_ne!(loose, tight);
		assert!(tight.contains("strictly"));
	}
}
