//! End-to-end scenario tests driving `Orchestrator::handle_turn` over the
//! in-memory reference ports, exercising the happy path, the mandatory
//! PowerSource rule, the downstream-clear cascade, session expiry, and
//! finalization gating.

use configurator_core::applicability::ApplicabilityTable;
use configurator_core::extractor::StubLlmPort;
use configurator_core::repository::InMemoryProductRepository;
use configurator_core::session_store::{InMemoryCache, JsonlArchive, SessionStore};
use configurator_core::types::{ComponentKind, Gin, Product, StateId};
use configurator_core::{Config, Orchestrator, TurnRequest};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn product(gin: &str, name: &str, kind: ComponentKind, attrs: &[(&str, &str)]) -> Product {
    let mut attributes = HashMap::new();
    let mut description_terms = Vec::new();
    for (k, v) in attrs {
        attributes.insert(k.to_string(), v.to_string());
        description_terms.push(v.to_lowercase());
    }
    Product {
        gin: gin.to_string(),
        name: name.to_string(),
        description: format!("{name} {}", description_terms.join(" ")),
        kind,
        accessory_subkind: None,
        attributes,
        available: true,
    }
}

fn full_catalogue() -> InMemoryProductRepository {
    let products = vec![
        product(
            "ps-multiprocess-full",
            "PowerMax 500",
            ComponentKind::PowerSource,
            &[("current", "500 A"), ("process", "MIG (GMAW)")],
        ),
        product(
            "ps-engine-drive-minimal",
            "FieldRunner 300",
            ComponentKind::PowerSource,
            &[("current", "300 A"), ("process", "Stick (SMAW)")],
        ),
        product("feeder-1", "FeedPro 35", ComponentKind::Feeder, &[("wire_size", "0.035 inch")]),
        product("feeder-2", "FeedPro 45", ComponentKind::Feeder, &[("wire_size", "0.045 inch")]),
        product("cooler-1", "CoolFlow 2", ComponentKind::Cooler, &[]),
        product("interconnect-1", "LinkHose 25", ComponentKind::Interconnector, &[]),
        product("torch-1", "TorchPro 400", ComponentKind::Torch, &[]),
    ];
    let edges: Vec<(Gin, Gin)> = vec![
        ("ps-multiprocess-full".to_string(), "feeder-1".to_string()),
        ("ps-multiprocess-full".to_string(), "feeder-2".to_string()),
        ("feeder-1".to_string(), "cooler-1".to_string()),
        ("feeder-2".to_string(), "cooler-1".to_string()),
        ("cooler-1".to_string(), "interconnect-1".to_string()),
        ("cooler-1".to_string(), "torch-1".to_string()),
        ("ps-engine-drive-minimal".to_string(), "torch-1".to_string()),
    ];
    InMemoryProductRepository::new(products, edges)
}

fn orchestrator_with(config: Config) -> Orchestrator {
    let store = SessionStore::new(
        Box::new(InMemoryCache::new()),
        Box::new(JsonlArchive::in_memory()),
        Duration::from_secs(3600),
    );
    Orchestrator::new(
        ApplicabilityTable::built_in_default(),
        Arc::new(StubLlmPort::new()),
        Arc::new(full_catalogue()),
        Arc::new(store),
        config,
    )
}

fn orchestrator() -> Orchestrator {
    orchestrator_with(Config::defaults())
}

/// Scenario A: a fresh session describing PowerSource attributes receives a
/// single matching candidate and, on explicit confirmation, commits it and
/// advances past S1.
#[tokio::test]
async fn scenario_a_single_candidate_confirm_advances_state() {
    let orch = orchestrator();
    let turn1 = orch
        .handle_turn(TurnRequest {
            session_id: Some("scenario-a".to_string()),
            message: "I need 500 amps for MIG welding".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert_eq!(turn1.current_state, StateId::S1PowerSource);
    let options = turn1.options.expect("a single candidate should be presented");
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].id, "ps-multiprocess-full");

    let turn2 = orch
        .handle_turn(TurnRequest {
            session_id: Some("scenario-a".to_string()),
            message: "yes".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert!(turn2.cart.power_source.is_selected());
    assert_eq!(turn2.current_state, StateId::S2Feeder);
}

/// Scenario B: an unmistakable skip request while S1 is active is rejected
/// without mutating Master or the Cart.
#[tokio::test]
async fn scenario_b_mandatory_power_source_rejects_skip() {
    let orch = orchestrator();
    let response = orch
        .handle_turn(TurnRequest {
            session_id: Some("scenario-b".to_string()),
            message: "skip".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert_eq!(response.current_state, StateId::S1PowerSource);
    assert!(response.cart.power_source.is_unset());
    assert!(response.message.to_lowercase().contains("required"));
}

/// Scenario C: selecting an engine-drive power source marks Feeder, Cooler,
/// and Interconnector `NotApplicable` per the seeded applicability table,
/// landing directly on Torch.
#[tokio::test]
async fn scenario_c_applicability_skips_not_applicable_states() {
    let orch = orchestrator();
    orch.handle_turn(TurnRequest {
        session_id: Some("scenario-c".to_string()),
        message: "300 amps stick welding".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();

    let response = orch
        .handle_turn(TurnRequest {
            session_id: Some("scenario-c".to_string()),
            message: "yes".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();

    assert!(response.cart.power_source.is_selected());
    assert_eq!(response.current_state, StateId::S5Torch);
    use configurator_core::types::CartEntry;
    assert!(matches!(response.cart.feeder, CartEntry::NotApplicable));
    assert!(matches!(response.cart.cooler, CartEntry::NotApplicable));
    assert!(matches!(response.cart.interconnector, CartEntry::NotApplicable));
}

/// Scenario D: once PowerSource is `Selected`, the entry is locked — later
/// turns may keep refining `Master.power_source` (last-write-wins), but the
/// committed Cart entry is untouched until the user advances past S1 and
/// commits the next kind, at which point the PowerSource entry still stands.
#[tokio::test]
async fn scenario_d_selected_power_source_is_locked_against_later_mentions() {
    let orch = orchestrator();
    let session_id = "scenario-d".to_string();

    orch.handle_turn(TurnRequest {
        session_id: Some(session_id.clone()),
        message: "500 amps MIG".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();
    let committed = orch
        .handle_turn(TurnRequest {
            session_id: Some(session_id.clone()),
            message: "yes".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert_eq!(committed.current_state, StateId::S2Feeder);
    let original_gin = match &committed.cart.power_source {
        configurator_core::types::CartEntry::Selected(p) => p.gin.clone(),
        other => panic!("expected power source to be selected, got {other:?}"),
    };

    // A later turn that still mentions power-source-shaped attributes (the
    // heuristic stub always routes `current`/`process` into the
    // PowerSource bag) updates Master but must not disturb the locked Cart
    // entry, since the current state's kind is now Feeder.
    let after = orch
        .handle_turn(TurnRequest {
            session_id: Some(session_id.clone()),
            message: "300 amps stick".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();

    match &after.cart.power_source {
        configurator_core::types::CartEntry::Selected(p) => assert_eq!(p.gin, original_gin),
        other => panic!("power source entry should remain selected, got {other:?}"),
    }
    assert_eq!(after.current_state, StateId::S2Feeder);
}

/// Scenario G: explicitly replacing a selected power source with a
/// different one clears every downstream selection and reloads
/// applicability from the new product.
#[tokio::test]
async fn scenario_g_replacing_power_source_clears_downstream_selections() {
    let orch = orchestrator();
    let session_id = "scenario-g".to_string();

    orch.handle_turn(TurnRequest {
        session_id: Some(session_id.clone()),
        message: "500 amps".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();
    orch.handle_turn(TurnRequest {
        session_id: Some(session_id.clone()),
        message: "yes".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();

    orch.handle_turn(TurnRequest {
        session_id: Some(session_id.clone()),
        message: "0.035 inch wire feeder".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();
    let feeder_committed = orch
        .handle_turn(TurnRequest {
            session_id: Some(session_id.clone()),
            message: "yes".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert!(feeder_committed.cart.feeder.is_selected());
    assert_eq!(feeder_committed.current_state, StateId::S3Cooler);

    let presented = orch
        .handle_turn(TurnRequest {
            session_id: Some(session_id.clone()),
            message: "replace the power source, 300 amps".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert_eq!(
        presented.options.expect("a replacement candidate should be presented")[0].id,
        "ps-engine-drive-minimal"
    );

    let replaced = orch
        .handle_turn(TurnRequest {
            session_id: Some(session_id.clone()),
            message: "yes".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();

    match &replaced.cart.power_source {
        configurator_core::types::CartEntry::Selected(p) => assert_eq!(p.gin, "ps-engine-drive-minimal"),
        other => panic!("expected the replacement to be selected, got {other:?}"),
    }
    assert!(
        matches!(replaced.cart.feeder, configurator_core::types::CartEntry::NotApplicable),
        "downstream feeder selection should have been cleared then re-marked NotApplicable, got {:?}",
        replaced.cart.feeder
    );
    assert_eq!(replaced.current_state, StateId::S5Torch);
}

/// Scenario E: finalization refuses to complete below the configured
/// minimum real-component threshold, even with an explicit confirm.
#[tokio::test]
async fn scenario_e_threshold_not_met_blocks_finalization() {
    let mut config = Config::defaults();
    config.minimum_real_components = 3;
    let orch = orchestrator_with(config);

    orch.handle_turn(TurnRequest {
        session_id: Some("scenario-e".to_string()),
        message: "500 amps MIG".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();
    orch.handle_turn(TurnRequest {
        session_id: Some("scenario-e".to_string()),
        message: "yes".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();

    // Force straight to S7 via the done/finalize keyword path is only valid
    // from S6; drive a confirm at whatever state we land on and expect the
    // threshold prompt rather than completion.
    let response = orch
        .handle_turn(TurnRequest {
            session_id: Some("scenario-e".to_string()),
            message: "confirm".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert!(!response.completed);
}

/// Scenario F: an explicit reset clears the session and returns a fresh
/// greeting regardless of how far along the prior conversation was.
#[tokio::test]
async fn scenario_f_explicit_reset_clears_session() {
    let orch = orchestrator();
    let session_id = "scenario-f".to_string();
    orch.handle_turn(TurnRequest {
        session_id: Some(session_id.clone()),
        message: "500 amps MIG".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();
    orch.handle_turn(TurnRequest {
        session_id: Some(session_id.clone()),
        message: "yes".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();

    let after_reset = orch
        .handle_turn(TurnRequest {
            session_id: Some(session_id.clone()),
            message: "hello again".to_string(),
            language: None,
            reset: true,
        })
        .await
        .unwrap();

    assert_eq!(after_reset.current_state, StateId::S1PowerSource);
    assert!(after_reset.cart.power_source.is_unset());
}

/// A session id that was never created is treated as expired, not an
/// internal error, and starts the user over at S1.
#[tokio::test]
async fn unknown_session_id_is_treated_as_expired() {
    let orch = orchestrator();
    let response = orch
        .handle_turn(TurnRequest {
            session_id: Some("never-created".to_string()),
            message: "hi".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert_eq!(response.current_state, StateId::S1PowerSource);
    assert!(response.message.to_lowercase().contains("expired"));
}

/// Two distinct sessions never observe each other's mutations.
#[tokio::test]
async fn distinct_sessions_are_fully_independent() {
    let orch = orchestrator();
    orch.handle_turn(TurnRequest {
        session_id: Some("session-x".to_string()),
        message: "500 amps MIG".to_string(),
        language: None,
        reset: false,
    })
    .await
    .unwrap();

    let fresh = orch
        .handle_turn(TurnRequest {
            session_id: Some("session-y".to_string()),
            message: "hello".to_string(),
            language: None,
            reset: false,
        })
        .await
        .unwrap();
    assert!(fresh.cart.power_source.is_unset());
    assert_eq!(fresh.current_state, StateId::S1PowerSource);
}
