//! C2: Parameter Extractor.
//!
//! A stateless call to an LLM bound by a strict JSON contract (`LlmContract`),
//! re-validated against the canonical-form table on receipt, then merged into
//! the Master record field-by-field (last-write-wins). The `LlmPort` trait
//! mirrors `arbiter::llm_provider::LlmProvider` — one trait, an HTTP-backed
//! implementation, and a deterministic stub for tests.

mod normalize;
pub mod openai;
pub mod stub;

pub use stub::StubLlmPort;

use crate::errors::ExtractionError;
use crate::types::{ComponentKind, ConversationEntry, MasterRecord, StateId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The strict output contract an `LlmPort` must satisfy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmContract {
    #[serde(default)]
    pub updates: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub clarification_question: Option<String>,
    #[serde(default)]
    pub direct_product_mentions: HashMap<String, String>,
    #[serde(default)]
    pub confidence: HashMap<String, f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Input passed to the LLM port: the user message, current state,
/// a snapshot of the Master record, and the last N conversation entries.
#[derive(Debug, Clone)]
pub struct ExtractionInput<'a> {
    pub user_message: &'a str,
    pub current_state: StateId,
    pub master_snapshot: &'a MasterRecord,
    pub recent_log: &'a [ConversationEntry],
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn extract(&self, input: ExtractionInput<'_>, deadline: Duration) -> Result<LlmContract, ExtractionError>;

    async fn is_ready(&self) -> bool;
}

/// Validated, merge-ready output of the extractor: per-kind updates plus the
/// clarification/direct-mention/confidence side-channels.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub updates: HashMap<ComponentKind, HashMap<String, String>>,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,
    pub direct_product_mentions: HashMap<ComponentKind, String>,
    pub confidence: HashMap<ComponentKind, f64>,
}

/// Run the LLM port and validate every field against the canonical-form
/// table. Any contract or normalization violation
/// becomes `ExtractionError`, so the Orchestrator always treats it as a
/// clarification request rather than a partial mutation.
pub async fn extract(
    port: &dyn LlmPort,
    input: ExtractionInput<'_>,
    deadline: Duration,
) -> Result<ExtractionOutcome, ExtractionError> {
    let contract = port.extract(input, deadline).await?;

    if contract.needs_clarification
        && contract
            .clarification_question
            .as_ref()
            .map(|q| q.is_empty())
            .unwrap_or(true)
    {
        return Err(ExtractionError::InvalidContract(
            "needs_clarification is true but clarification_question is empty".to_string(),
        ));
    }

    let mut updates = HashMap::new();
    for (kind_key, fields) in &contract.updates {
        let kind = parse_kind(kind_key).ok_or_else(|| {
            ExtractionError::InvalidContract(format!("unknown component kind `{kind_key}`"))
        })?;
        for (attribute, value) in fields {
            if !normalize::is_canonical(attribute, value) {
                return Err(ExtractionError::NormalizationViolation {
                    attribute: attribute.clone(),
                    value: value.clone(),
                });
            }
        }
        updates.insert(kind, fields.clone());
    }

    let mut direct_product_mentions = HashMap::new();
    for (kind_key, name) in &contract.direct_product_mentions {
        let kind = parse_kind(kind_key).ok_or_else(|| {
            ExtractionError::InvalidContract(format!("unknown component kind `{kind_key}`"))
        })?;
        direct_product_mentions.insert(kind, name.clone());
    }

    let mut confidence = HashMap::new();
    for (kind_key, value) in &contract.confidence {
        if !(0.0..=1.0).contains(value) {
            return Err(ExtractionError::InvalidContract(format!(
                "confidence for `{kind_key}` out of [0,1]: {value}"
            )));
        }
        if let Some(kind) = parse_kind(kind_key) {
            confidence.insert(kind, *value);
        }
    }

    Ok(ExtractionOutcome {
        updates,
        needs_clarification: contract.needs_clarification,
        clarification_question: contract.clarification_question,
        direct_product_mentions,
        confidence,
    })
}

fn parse_kind(key: &str) -> Option<ComponentKind> {
    match key {
        "PowerSource" | "power_source" => Some(ComponentKind::PowerSource),
        "Feeder" | "feeder" => Some(ComponentKind::Feeder),
        "Cooler" | "cooler" => Some(ComponentKind::Cooler),
        "Interconnector" | "interconnector" => Some(ComponentKind::Interconnector),
        "Torch" | "torch" => Some(ComponentKind::Torch),
        "Accessory" | "accessory" => Some(ComponentKind::Accessory),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MasterRecord;

    #[tokio::test]
    async fn normalization_violation_becomes_extraction_error() {
        let mut contract = LlmContract::default();
        let mut fields = HashMap::new();
        fields.insert("current".to_string(), "500A".to_string()); // missing space
        contract.updates.insert("PowerSource".to_string(), fields);

        let port = stub::StubLlmPort::with_fixed_contract(contract);
        let master = MasterRecord::new();
        let input = ExtractionInput {
            user_message: "500 amps",
            current_state: StateId::S1PowerSource,
            master_snapshot: &master,
            recent_log: &[],
        };
        let result = extract(&port, input, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ExtractionError::NormalizationViolation { .. })));
    }

    #[tokio::test]
    async fn needs_clarification_requires_non_empty_question() {
        let mut contract = LlmContract::default();
        contract.needs_clarification = true;
        let port = stub::StubLlmPort::with_fixed_contract(contract);
        let master = MasterRecord::new();
        let input = ExtractionInput {
            user_message: "huh",
            current_state: StateId::S1PowerSource,
            master_snapshot: &master,
            recent_log: &[],
        };
        let result = extract(&port, input, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }
}
