//! `configurator-core`: the conversational product-configurator engine.
//!
//! Modules map one-to-one onto the components of the engine: an
//! Applicability Table (C1), a Parameter Extractor (C2), a Product
//! Repository (C3), a Compatibility Engine (C4), a State Machine (C5), a
//! Session Store (C6), a Message Composer (C7), and the Orchestrator (C8)
//! that wires them together per turn.

pub mod applicability;
pub mod compatibility;
pub mod composer;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod orchestrator;
pub mod repository;
pub mod session_store;
pub mod state_machine;
pub mod telemetry;
pub mod types;

pub use config::Config;
pub use errors::OrchestratorError;
pub use orchestrator::{Orchestrator, OptionView, ReadinessReport, TurnRequest, TurnResponse};
