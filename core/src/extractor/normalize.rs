//! Canonical-form validation table. Re-checked on receipt
//! even though the prompt also enforces it — "trust but verify" the LLM
//! output, as the contract's strictness is what the rest of the system
//! depends on.

use once_cell::sync::Lazy;
use regex::Regex;

static CURRENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+ A$").unwrap());
static VOLTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+V$").unwrap());
static WIRE_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0\.\d{3} inch$").unwrap());
static CABLE_LENGTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+ ft$").unwrap());
static MATERIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());
static PROCESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z ]+ \([A-Z]+\)$").unwrap());

/// Returns `true` iff `value` is in the canonical form for `attribute`.
/// Attributes outside the fixed vocabulary are accepted unvalidated (the
/// per-kind vocabulary is enforced by the LLM contract, not here).
pub fn is_canonical(attribute: &str, value: &str) -> bool {
    match attribute {
        "current" => CURRENT.is_match(value),
        "voltage" => VOLTAGE.is_match(value),
        "phase" => value == "single-phase" || value == "3-phase",
        "process" => PROCESS.is_match(value),
        "cooling_type" => value == "water" || value == "air" || value == "none",
        "wire_size" => WIRE_SIZE.is_match(value),
        "cable_length" => CABLE_LENGTH.is_match(value),
        "portability" => value == "portable" || value == "stationary",
        "material" => MATERIAL.is_match(value),
        _ => true,
    }
}
