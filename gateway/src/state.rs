//! Wires the core's ports together into one `Orchestrator` for the
//! lifetime of the process. The catalogue and applicability table are the
//! in-process reference implementations; swapping in a graph-backed
//! `ProductRepository` means changing only this file.

use configurator_core::applicability::ApplicabilityTable;
use configurator_core::extractor::openai::{OpenAiCompatibleLlmPort, OpenAiLlmPortConfig};
use configurator_core::extractor::{LlmPort, StubLlmPort};
use configurator_core::repository::{InMemoryProductRepository, ProductRepository};
use configurator_core::session_store::{InMemoryCache, JsonlArchive, SessionStore};
use configurator_core::types::{ComponentKind, Gin, Product};
use configurator_core::{Config, Orchestrator};
use std::collections::HashMap;
use std::sync::Arc;

pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn build(config: Config) -> anyhow::Result<Self> {
        let llm: Arc<dyn LlmPort> = match &config.llm_api_key {
            Some(api_key) if !api_key.is_empty() => Arc::new(OpenAiCompatibleLlmPort::new(OpenAiLlmPortConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: api_key.clone(),
                model: config.llm_model.clone(),
            })?),
            _ => Arc::new(StubLlmPort::new()),
        };

        let repository: Arc<dyn ProductRepository> = Arc::new(demo_catalogue());

        let archive: Box<dyn configurator_core::session_store::SessionArchive> = match &config.archive_dsn {
            Some(path) if !path.is_empty() => Box::new(JsonlArchive::file(path.into())),
            _ => Box::new(JsonlArchive::in_memory()),
        };

        let store = Arc::new(SessionStore::new(
            Box::new(InMemoryCache::new()),
            archive,
            config.session_ttl,
        ));

        let orchestrator = Orchestrator::new(
            ApplicabilityTable::built_in_default(),
            llm,
            repository,
            store,
            config,
        );

        Ok(Self { orchestrator })
    }
}

/// A handful of representative products spanning the seeded power sources
/// in `ApplicabilityTable::built_in_default`, enough to exercise every
/// state transition in a demo deployment.
fn demo_catalogue() -> InMemoryProductRepository {
    let products = vec![
        product(
            "ps-multiprocess-full",
            "PowerMax 500 Multi-Process",
            ComponentKind::PowerSource,
            &[("current", "500 A"), ("process", "MIG (GMAW)"), ("phase", "3-phase")],
        ),
        product(
            "ps-engine-drive-minimal",
            "FieldRunner 300 Engine Drive",
            ComponentKind::PowerSource,
            &[("current", "300 A"), ("process", "Stick (SMAW)"), ("portability", "portable")],
        ),
        product(
            "feeder-1",
            "FeedPro 35",
            ComponentKind::Feeder,
            &[("wire_size", "0.035 inch")],
        ),
        product(
            "cooler-1",
            "CoolFlow 2",
            ComponentKind::Cooler,
            &[("cooling_type", "water")],
        ),
        product(
            "interconnect-1",
            "LinkHose 25",
            ComponentKind::Interconnector,
            &[("cable_length", "25 ft")],
        ),
        product(
            "torch-1",
            "TorchPro 400",
            ComponentKind::Torch,
            &[("current", "400 A")],
        ),
        product(
            "torch-2",
            "TorchPro 300 Air-Cooled",
            ComponentKind::Torch,
            &[("current", "300 A"), ("cooling_type", "air")],
        ),
        product(
            "acc-remote-1",
            "RemotePedal 1",
            ComponentKind::Accessory,
            &[],
        ),
    ];

    let edges: Vec<(Gin, Gin)> = vec![
        ("ps-multiprocess-full".to_string(), "feeder-1".to_string()),
        ("ps-engine-drive-minimal".to_string(), "torch-2".to_string()),
        ("feeder-1".to_string(), "cooler-1".to_string()),
        ("feeder-1".to_string(), "interconnect-1".to_string()),
        ("feeder-1".to_string(), "torch-1".to_string()),
        ("cooler-1".to_string(), "interconnect-1".to_string()),
        ("cooler-1".to_string(), "torch-1".to_string()),
        ("ps-multiprocess-full".to_string(), "acc-remote-1".to_string()),
        ("feeder-1".to_string(), "acc-remote-1".to_string()),
    ];

    InMemoryProductRepository::new(products, edges)
}

fn product(gin: &str, name: &str, kind: ComponentKind, attrs: &[(&str, &str)]) -> Product {
    let mut attributes = HashMap::new();
    for (k, v) in attrs {
        attributes.insert(k.to_string(), v.to_string());
    }
    Product {
        gin: gin.to_string(),
        name: name.to_string(),
        description: format!("{name} — {kind:?}"),
        kind,
        accessory_subkind: None,
        attributes,
        available: true,
    }
}
