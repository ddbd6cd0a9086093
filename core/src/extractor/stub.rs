//! Deterministic stub LLM port, following `LlmProviderType::Stub` in
//! `arbiter::llm_provider` — "deterministic responses" for tests, and a
//! small keyword-driven fallback for the demo deployment when no real LLM
//! credentials are configured.

use super::{ExtractionInput, LlmContract, LlmPort};
use crate::errors::ExtractionError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Returns a fixed contract on every call, or (with `new()`) a tiny
/// keyword-based heuristic useful for local smoke-testing without a real
/// LLM provider configured.
pub struct StubLlmPort {
    fixed: Option<Mutex<LlmContract>>,
}

impl StubLlmPort {
    pub fn new() -> Self {
        Self { fixed: None }
    }

    pub fn with_fixed_contract(contract: LlmContract) -> Self {
        Self {
            fixed: Some(Mutex::new(contract)),
        }
    }
}

impl Default for StubLlmPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmPort for StubLlmPort {
    async fn extract(
        &self,
        input: ExtractionInput<'_>,
        _deadline: Duration,
    ) -> Result<LlmContract, ExtractionError> {
        if let Some(fixed) = &self.fixed {
            return Ok(fixed.lock().unwrap().clone());
        }
        Ok(heuristic_contract(input.user_message))
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

/// A minimal heuristic so the gateway is exercisable end-to-end without a
/// real LLM credential. Real deployments use `openai::OpenAiCompatibleLlmPort`.
fn heuristic_contract(message: &str) -> LlmContract {
    let mut contract = LlmContract::default();
    let lower = message.to_lowercase();

    if let Some(amps) = extract_trailing_number(&lower, "amp") {
        insert_update(&mut contract, "PowerSource", "current", format!("{amps} A"));
    }
    if lower.contains("mig") {
        insert_update(
            &mut contract,
            "PowerSource",
            "process",
            "MIG (GMAW)".to_string(),
        );
    }
    if lower.contains("tig") {
        insert_update(
            &mut contract,
            "PowerSource",
            "process",
            "TIG (GTAW)".to_string(),
        );
    }
    if lower.contains("portable") {
        insert_update(&mut contract, "Feeder", "portability", "portable".to_string());
    }
    if lower.contains("stationary") {
        insert_update(&mut contract, "Feeder", "portability", "stationary".to_string());
    }
    if let Some(size) = extract_wire_size(&lower) {
        insert_update(&mut contract, "Feeder", "wire_size", size);
    }

    contract
}

fn insert_update(contract: &mut LlmContract, kind: &str, attribute: &str, value: String) {
    contract
        .updates
        .entry(kind.to_string())
        .or_default()
        .insert(attribute.to_string(), value);
}

fn extract_trailing_number(text: &str, unit_hint: &str) -> Option<u32> {
    if !text.contains(unit_hint) {
        return None;
    }
    text.split_whitespace()
        .find_map(|tok| tok.trim_matches(|c: char| !c.is_ascii_digit()).parse::<u32>().ok())
}

fn extract_wire_size(text: &str) -> Option<String> {
    text.split_whitespace().find_map(|tok| {
        let cleaned = tok.trim_matches(|c: char| c == ',' || c == '.');
        cleaned.parse::<f64>().ok().and_then(|v| {
            if v > 0.0 && v < 1.0 {
                Some(format!("{:.3} inch", v))
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn is_always_ready() {
        let port = StubLlmPort::new();
        assert!(port.is_ready().await);
    }

    #[test]
    fn heuristic_extracts_current_and_process() {
        let contract = heuristic_contract("I need 500 amps for MIG welding");
        assert_eq!(
            contract.updates.get("PowerSource").unwrap().get("current").unwrap(),
            "500 A"
        );
        assert_eq!(
            contract.updates.get("PowerSource").unwrap().get("process").unwrap(),
            "MIG (GMAW)"
        );
    }
}
