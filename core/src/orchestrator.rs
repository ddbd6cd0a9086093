//! C8: Orchestrator.
//!
//! The sole mutator of `SessionState`. Wires C1–C7 per turn and enforces the
//! S1→S7 contract, the mandatory-PowerSource rule, and the downstream-clear
//! cascade. Mutations are staged on a local clone of the session and only
//! swapped into the store once the whole turn succeeds.

use crate::applicability::ApplicabilityTable;
use crate::compatibility::{build_predicate, CompatibilityPredicate};
use crate::composer::{finalization_view, ComposerIntent, MessageComposer};
use crate::config::Config;
use crate::errors::{OrchestratorError, RepositoryError};
use crate::extractor::{self, ExtractionInput, LlmPort};
use crate::repository::ProductRepository;
use crate::session_store::SessionStore;
use crate::state_machine;
use crate::telemetry::{Metrics, TelemetryPort, TracingTelemetry};
use crate::types::{
    AccessorySubkind, Applicability, Cart, CartEntry, ComponentKind, PendingSelection, Product,
    Role, SessionState, StateId,
};
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

/// Request for one turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: Option<String>,
    pub message: String,
    pub language: Option<String>,
    pub reset: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub current_state: StateId,
    pub message: String,
    pub options: Option<Vec<OptionView>>,
    pub cart: Cart,
    pub master: crate::types::MasterRecord,
    pub completed: bool,
}

pub struct Orchestrator {
    applicability_table: ApplicabilityTable,
    llm: Arc<dyn LlmPort>,
    repository: Arc<dyn ProductRepository>,
    store: Arc<SessionStore>,
    composer: MessageComposer,
    config: Config,
    metrics: Arc<Metrics>,
    telemetry: Arc<dyn TelemetryPort>,
    session_locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl Orchestrator {
    pub fn new(
        applicability_table: ApplicabilityTable,
        llm: Arc<dyn LlmPort>,
        repository: Arc<dyn ProductRepository>,
        store: Arc<SessionStore>,
        config: Config,
    ) -> Self {
        Self {
            applicability_table,
            llm,
            repository,
            store,
            composer: MessageComposer::new(),
            config,
            metrics: Arc::new(Metrics::new()),
            telemetry: Arc::new(TracingTelemetry),
            session_locks: DashMap::new(),
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    async fn ready(&self) -> ReadinessReport {
        ReadinessReport {
            llm: self.llm.is_ready().await,
            graph: self.repository.is_ready().await,
            cache: self.store.cache_ready().await,
            archive: self.store.archive_ready().await,
        }
    }

    pub async fn health(&self) -> ReadinessReport {
        self.ready().await
    }

    fn session_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Handle one turn end-to-end. Per-session mutations are
    /// serialized by `session_lock`.
    #[tracing::instrument(skip(self, request), fields(session_id))]
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse, OrchestratorError> {
        self.metrics.record_turn();
        let deadline = self.config.turn_deadline;
        let fut = self.handle_turn_inner(request);
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::DeadlineExceeded),
        }
    }

    async fn handle_turn_inner(&self, request: TurnRequest) -> Result<TurnResponse, OrchestratorError> {
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| format!("session_{}", Uuid::new_v4().simple()));
        tracing::Span::current().record("session_id", &session_id.as_str());

        let lock = self.session_lock(&session_id);
        let _guard = lock.lock().await;

        let language = request.language.clone().unwrap_or_else(|| "en".to_string());

        // Step 4: explicit reset, bypassing extraction entirely.
        if request.reset {
            self.store.reset(&session_id).await?;
            let fresh = SessionState::new(session_id.clone(), language);
            self.store.put(&fresh).await?;
            return Ok(self.respond(&fresh, self.composer.compose(&fresh.language_tag, &ComposerIntent::Greeting)));
        }

        // Step 1: load or create session. A cache miss/expiry is a fresh
        // session, not an error.
        let existing = self.store.get(&session_id).await?;
        let (mut session, was_expired) = match existing {
            Some(s) => (s, false),
            None => (SessionState::new(session_id.clone(), language), request.session_id.is_some()),
        };

        if was_expired {
            let greeting = self.composer.compose(&session.language_tag, &ComposerIntent::SessionExpired);
            self.store.put(&session).await?;
            return Ok(self.respond(&session, greeting));
        }

        // Step 2/3: explicit keyword intents, recognized before C2.
        let keyword_intent = classify_keyword_intent(&request.message);

        if keyword_intent == Some(KeywordIntent::Reset) {
            self.store.reset(&session_id).await?;
            let fresh = SessionState::new(session_id.clone(), session.language_tag.clone());
            self.store.put(&fresh).await?;
            return Ok(self.respond(&fresh, self.composer.compose(&fresh.language_tag, &ComposerIntent::Greeting)));
        }

        if keyword_intent == Some(KeywordIntent::Skip) && session.current_state == StateId::S1PowerSource {
            session.push_log(Role::User, request.message.clone(), self.config.max_log_entries);
            let message = self.composer.compose(&session.language_tag, &ComposerIntent::RejectSkipOfPowerSource);
            session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
            self.store.put(&session).await?;
            return Ok(self.respond(&session, message));
        }

        if keyword_intent == Some(KeywordIntent::DoneFinalize) && session.current_state == StateId::S6Accessories {
            session.current_state = StateId::S7Finalize;
            session.push_log(Role::User, request.message.clone(), self.config.max_log_entries);
            let prompt = self.next_prompt(&session);
            session.push_log(Role::Assistant, prompt.clone(), self.config.max_log_entries);
            self.store.put(&session).await?;
            return Ok(self.respond(&session, prompt));
        }

        if keyword_intent == Some(KeywordIntent::Confirm) && session.current_state == StateId::S7Finalize {
            return self.finalize(session, request).await;
        }

        // An affirmative turn after a single presented option commits it,
        // regardless of current state.
        if keyword_intent == Some(KeywordIntent::Confirm) {
            if let Some(pending) = session.pending_selection.clone() {
                session.push_log(Role::User, request.message.clone(), self.config.max_log_entries);
                return self.commit_selection(session, pending, request).await;
            }
        }

        // Step 5: extraction.
        session.push_log(Role::User, request.message.clone(), self.config.max_log_entries);
        let recent_log: Vec<_> = session.last_n_log(6).to_vec();
        let input = ExtractionInput {
            user_message: &request.message,
            current_state: session.current_state,
            master_snapshot: &session.master,
            recent_log: &recent_log,
        };
        let outcome = match extractor::extract(self.llm.as_ref(), input, self.config.llm_deadline).await {
            Ok(o) => o,
            Err(_err) => {
                self.metrics.record_extraction_error();
                let message = self.composer.compose(&session.language_tag, &ComposerIntent::ExtractionFallback);
                session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
                self.store.put(&session).await?;
                return Ok(self.respond(&session, message));
            }
        };

        if outcome.needs_clarification {
            let message = outcome
                .clarification_question
                .unwrap_or_else(|| self.composer.compose(&session.language_tag, &ComposerIntent::ExtractionFallback));
            session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
            self.store.put(&session).await?;
            return Ok(self.respond(&session, message));
        }

        // Step 6: merge updates into Master, last-write-wins per field.
        for (kind, fields) in &outcome.updates {
            session.master.get_mut(*kind).merge_updates(fields);
        }

        // A mention of an already-`Selected` single-valued kind re-enters
        // that kind's search/commit instead of the current state's kind,
        // so a replacement can reach `commit_selection` at all.
        let replace_target = detect_replace_target(&request.message)
            .filter(|k| session.cart.entry(*k).is_selected());

        let Some(kind) = replace_target.or_else(|| session.current_state.component_kind()) else {
            // S7: nothing to extract toward; fall through to finalize gating.
            return self.finalize(session, request).await;
        };

        let bag = session.master.get(kind).clone();
        let direct_mention = outcome.direct_product_mentions.get(&kind).cloned();
        let accessory_subkind = (kind == ComponentKind::Accessory)
            .then(|| infer_accessory_subkind(&request.message))
            .flatten();

        // Step 7/8: direct mention lookup, else eligible search.
        let candidates: Result<Vec<Product>, OrchestratorError> = if let Some(name) = &direct_mention {
            self.with_graph_deadline(self.repository.lookup_by_name(kind, name))
                .await
                .map_err(|e| {
                    self.metrics.record_repository_error();
                    OrchestratorError::Repository(e)
                })
        } else if bag.len() >= 1 || bag.direct_product_mention.is_some() {
            let predicate = self.predicate_for(kind, accessory_subkind, &session.cart);
            let result = self
                .with_graph_deadline(self.repository.search(kind, &bag, &predicate))
                .await
                .map_err(|e| {
                    self.metrics.record_repository_error();
                    OrchestratorError::Repository(e)
                })?;
            Ok(result.products)
        } else {
            Ok(Vec::new())
        };
        let candidates = candidates?;

        // Direct-mention enrichment: fill gaps in the Master bag from the
        // looked-up product's own attributes, never overwriting a value the
        // user already supplied.
        if direct_mention.is_some() && self.config.direct_mention_enrichment {
            if let Some(first) = candidates.first() {
                let target = session.master.get_mut(kind);
                for (k, v) in &first.attributes {
                    target.attributes.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }

        // Step 9: route to Composer; single unambiguous + high confidence
        // may auto-commit.
        if candidates.len() == 1 {
            let confidence = outcome.confidence.get(&kind).copied().unwrap_or(0.0);
            if confidence >= self.config.auto_commit_confidence {
                let pending = PendingSelection {
                    kind,
                    accessory_subkind,
                    product: candidates[0].clone(),
                };
                return self.commit_selection(session, pending, request).await;
            }
            session.pending_selection = Some(PendingSelection {
                kind,
                accessory_subkind,
                product: candidates[0].clone(),
            });
            let message = self.composer.compose(
                &session.language_tag,
                &ComposerIntent::PresentOptions {
                    kind,
                    products: &candidates,
                    fallback: false,
                },
            );
            session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
            self.store.put(&session).await?;
            return Ok(self.respond(&session, message));
        }

        session.pending_selection = None;
        let message = if candidates.is_empty() {
            self.composer.compose(
                &session.language_tag,
                &ComposerIntent::PromptFor(kind),
            )
        } else {
            self.composer.compose(
                &session.language_tag,
                &ComposerIntent::PresentOptions {
                    kind,
                    products: &candidates,
                    fallback: false,
                },
            )
        };
        session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
        self.store.put(&session).await?;
        Ok(self.respond(&session, message))
    }

    fn predicate_for(
        &self,
        kind: ComponentKind,
        accessory_subkind: Option<AccessorySubkind>,
        cart: &Cart,
    ) -> CompatibilityPredicate {
        build_predicate(kind, accessory_subkind, cart)
    }

    /// Wrap a graph query in the per-call graph deadline, mapping a timeout
    /// to `RepositoryError::DeadlineExceeded`.
    async fn with_graph_deadline<T, F>(&self, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        match tokio::time::timeout(self.config.graph_deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::DeadlineExceeded),
        }
    }

    /// Commit a pending selection: apply cascade if it replaces an existing
    /// `Selected` entry, lock it in, and advance the state machine.
    async fn commit_selection(
        &self,
        mut session: SessionState,
        pending: PendingSelection,
        _request: TurnRequest,
    ) -> Result<TurnResponse, OrchestratorError> {
        let kind = pending.kind;
        let is_replacement = session.cart.entry(kind).is_selected();
        let previous_gin = match session.cart.entry(kind) {
            CartEntry::Selected(p) => Some(p.gin.clone()),
            _ => None,
        };
        let replaces_different_product = previous_gin.as_deref() != Some(pending.product.gin.as_str());
        let cascade_needed = is_replacement && replaces_different_product;

        // Accessories are multi-valued: committing one stays at S6 so the
        // user can keep adding more until an explicit done/finalize.
        if kind == ComponentKind::Accessory {
            session.cart.accessories.push(CartEntry::Selected(pending.product.clone()));
            session.pending_selection = None;
            let confirm = self.composer.compose(
                &session.language_tag,
                &ComposerIntent::Confirm {
                    kind,
                    product: &pending.product,
                },
            );
            let message = format!("{confirm} {}", self.next_prompt(&session));
            session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
            self.store.put(&session).await?;
            return Ok(self.respond(&session, message));
        }

        if cascade_needed {
            let applicability = session
                .applicability
                .clone()
                .unwrap_or_else(Applicability::all_yes);
            self.clear_downstream_of(&mut session, kind, &applicability);
        }

        session.cart.set_entry(kind, CartEntry::Selected(pending.product.clone()));
        session.pending_selection = None;

        let mut notices = Vec::new();

        if kind == ComponentKind::PowerSource {
            let applicability = self.applicability_table.lookup(&pending.product.gin);
            state_machine::apply_not_applicable(&mut session.cart, &applicability);
            let na_kinds: Vec<ComponentKind> = [
                ComponentKind::Feeder,
                ComponentKind::Cooler,
                ComponentKind::Interconnector,
                ComponentKind::Torch,
                ComponentKind::Accessory,
            ]
            .into_iter()
            .filter(|k| matches!(session.cart.entry(*k), CartEntry::NotApplicable))
            .collect();
            if !na_kinds.is_empty() {
                notices.push(self.composer.compose(
                    &session.language_tag,
                    &ComposerIntent::NotApplicableNotice(na_kinds),
                ));
            }
            session.applicability = Some(applicability);
        }

        let applicability = session
            .applicability
            .clone()
            .unwrap_or_else(Applicability::all_yes);
        session.current_state = state_machine::next_active_state(&applicability, kind_to_state(kind));

        let confirm = self.composer.compose(
            &session.language_tag,
            &ComposerIntent::Confirm {
                kind,
                product: &pending.product,
            },
        );
        notices.push(confirm);
        notices.push(self.next_prompt(&session));
        let message = notices.join(" ");
        session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
        self.store.put(&session).await?;
        Ok(self.respond(&session, message))
    }

    /// Reset every state strictly after `from` to unset and zero the
    /// corresponding Master bags. Does not move `current_state` — the
    /// caller recomputes it once, uniformly, after this returns.
    fn clear_downstream_of(&self, session: &mut SessionState, from: ComponentKind, applicability: &Applicability) {
        let from_state = kind_to_state(from);
        let states = state_machine::active_states(applicability);
        let idx = states.iter().position(|s| *s == from_state).unwrap_or(0);
        for later_state in &states[idx + 1..] {
            if let Some(k) = later_state.component_kind() {
                session.cart.clear_entry(k);
                session.master.zero(k);
            }
        }
    }

    async fn finalize(
        &self,
        mut session: SessionState,
        request: TurnRequest,
    ) -> Result<TurnResponse, OrchestratorError> {
        let count = session.cart.real_component_count();
        let required = self.config.minimum_real_components;
        let confirmed = classify_keyword_intent(&request.message) == Some(KeywordIntent::Confirm);

        if count < required || !confirmed {
            let message = self.composer.compose(
                &session.language_tag,
                &ComposerIntent::ThresholdNotMet { current: count, required },
            );
            session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
            self.store.put(&session).await?;
            return Ok(self.respond(&session, message));
        }

        session.completed = true;
        let view = finalization_view(&session.cart);
        let message = self.composer.compose(&session.language_tag, &ComposerIntent::FinalizationSummary(view));
        session.push_log(Role::Assistant, message.clone(), self.config.max_log_entries);
        self.store.put(&session).await?;
        self.store.archive(&session).await;
        self.metrics.record_session_completed();
        self.telemetry.emit("session.completed", &[("session_id", &session.session_id)]);
        Ok(self.respond(&session, message))
    }

    fn next_prompt(&self, session: &SessionState) -> String {
        match session.current_state.component_kind() {
            Some(kind) => self.composer.compose(&session.language_tag, &ComposerIntent::PromptFor(kind)),
            None => {
                let count = session.cart.real_component_count();
                let required = self.config.minimum_real_components;
                if count < required {
                    self.composer.compose(
                        &session.language_tag,
                        &ComposerIntent::ThresholdNotMet { current: count, required },
                    )
                } else {
                    "Say \"confirm\" to finalize your configuration.".to_string()
                }
            }
        }
    }

    fn respond(&self, session: &SessionState, message: String) -> TurnResponse {
        TurnResponse {
            session_id: session.session_id.clone(),
            current_state: session.current_state,
            message,
            options: session.pending_selection.as_ref().map(|p| {
                vec![OptionView {
                    rank: 1,
                    id: p.product.gin.clone(),
                    name: p.product.name.clone(),
                    description: p.product.description.clone(),
                }]
            }),
            cart: session.cart.clone(),
            master: session.master.clone(),
            completed: session.completed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub llm: bool,
    pub graph: bool,
    pub cache: bool,
    pub archive: bool,
}

fn kind_to_state(kind: ComponentKind) -> StateId {
    match kind {
        ComponentKind::PowerSource => StateId::S1PowerSource,
        ComponentKind::Feeder => StateId::S2Feeder,
        ComponentKind::Cooler => StateId::S3Cooler,
        ComponentKind::Interconnector => StateId::S4Interconnector,
        ComponentKind::Torch => StateId::S5Torch,
        ComponentKind::Accessory => StateId::S6Accessories,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordIntent {
    Skip,
    DoneFinalize,
    Confirm,
    Reset,
}

/// Unambiguous explicit keywords the Orchestrator recognizes before invoking
/// C2. Everything else is routed to the extractor.
fn classify_keyword_intent(message: &str) -> Option<KeywordIntent> {
    let lower = message.trim().to_lowercase();
    match lower.as_str() {
        "reset" => Some(KeywordIntent::Reset),
        "skip" => Some(KeywordIntent::Skip),
        "done" | "finalize" => Some(KeywordIntent::DoneFinalize),
        "yes" | "ok" | "okay" | "sure" | "confirm" | "looks good" => Some(KeywordIntent::Confirm),
        _ => None,
    }
}

/// Explicit "replace the X" / "change the X" / "different X" phrasing names
/// the kind to re-target, so a turn after that kind has already been
/// committed re-enters its search/commit path instead of merging silently
/// into Master.
fn detect_replace_target(message: &str) -> Option<ComponentKind> {
    let lower = message.to_lowercase();
    let is_replace_phrasing = ["replace", "change", "different", "switch", "instead"]
        .iter()
        .any(|kw| lower.contains(kw));
    if !is_replace_phrasing {
        return None;
    }
    if lower.contains("power source") || lower.contains("power supply") || lower.contains("powersource") {
        Some(ComponentKind::PowerSource)
    } else if lower.contains("feeder") || lower.contains("wire feeder") {
        Some(ComponentKind::Feeder)
    } else if lower.contains("cooler") {
        Some(ComponentKind::Cooler)
    } else if lower.contains("interconnector") || lower.contains("interconnect") {
        Some(ComponentKind::Interconnector)
    } else if lower.contains("torch") || lower.contains("gun") {
        Some(ComponentKind::Torch)
    } else if lower.contains("accessory") || lower.contains("accessories") {
        Some(ComponentKind::Accessory)
    } else {
        None
    }
}

/// Cheap keyword heuristic for which accessory subkind a message is about,
/// used only to pick the right anchor rows in the Compatibility Engine.
fn infer_accessory_subkind(message: &str) -> Option<AccessorySubkind> {
    let lower = message.to_lowercase();
    if lower.contains("remote") || lower.contains("pedal") {
        Some(AccessorySubkind::Remote)
    } else if lower.contains("cable") || lower.contains("hose") || lower.contains("connector") {
        Some(AccessorySubkind::ConnectivityAccessory)
    } else if lower.contains("wire") || lower.contains("spool") || lower.contains("drive roll") {
        Some(AccessorySubkind::FeederAccessory)
    } else if lower.contains("cart") || lower.contains("cover") || lower.contains("strap") {
        Some(AccessorySubkind::PowerSourceAccessory)
    } else {
        None
    }
}
