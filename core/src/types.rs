//! Core data model: component kinds, products, the Master record, and the Cart.
//!
//! See the invariants these types are built to uphold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque catalogue identifier ("global item number" in the source domain).
pub type Gin = String;

/// The closed set of component kinds a session walks through.
///
/// `Accessory` is multi-valued; every other kind is single-valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    PowerSource,
    Feeder,
    Cooler,
    Interconnector,
    Torch,
    Accessory,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::PowerSource,
        ComponentKind::Feeder,
        ComponentKind::Cooler,
        ComponentKind::Interconnector,
        ComponentKind::Torch,
        ComponentKind::Accessory,
    ];

    pub fn is_multi_valued(self) -> bool {
        matches!(self, ComponentKind::Accessory)
    }
}

/// Sub-kind of an accessory, used only by the Compatibility Engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessorySubkind {
    PowerSourceAccessory,
    FeederAccessory,
    ConnectivityAccessory,
    Remote,
}

/// Immutable catalogue entity. Never mutated by the core; owned by the
/// Product Repository port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub gin: Gin,
    pub name: String,
    pub description: String,
    pub kind: ComponentKind,
    pub accessory_subkind: Option<AccessorySubkind>,
    pub attributes: HashMap<String, String>,
    pub available: bool,
}

/// Normalized form of what the user asked for, for one component kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBag {
    pub attributes: HashMap<String, String>,
    pub direct_product_mention: Option<String>,
}

impl ParameterBag {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.direct_product_mention.is_none()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Last-write-wins field merge.
    /// A shallow merge per bag; never a deep structural merge.
    pub fn merge_updates(&mut self, updates: &HashMap<String, String>) {
        for (k, v) in updates {
            self.attributes.insert(k.clone(), v.clone());
        }
    }

    pub fn clear(&mut self) {
        self.attributes.clear();
        self.direct_product_mention = None;
    }
}

/// Mapping from component kind to `ParameterBag`. Total over `ComponentKind::ALL`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterRecord {
    bags: HashMap<&'static str, ParameterBag>,
}

impl MasterRecord {
    pub fn new() -> Self {
        let mut bags = HashMap::new();
        for kind in ComponentKind::ALL {
            bags.insert(kind_key(kind), ParameterBag::default());
        }
        Self { bags }
    }

    pub fn get(&self, kind: ComponentKind) -> &ParameterBag {
        self.bags.get(kind_key(kind)).expect("total over ComponentKind::ALL")
    }

    pub fn get_mut(&mut self, kind: ComponentKind) -> &mut ParameterBag {
        self.bags
            .entry(kind_key(kind))
            .or_insert_with(ParameterBag::default)
    }

    pub fn zero(&mut self, kind: ComponentKind) {
        self.get_mut(kind).clear();
    }
}

impl Default for MasterRecord {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_key(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::PowerSource => "power_source",
        ComponentKind::Feeder => "feeder",
        ComponentKind::Cooler => "cooler",
        ComponentKind::Interconnector => "interconnector",
        ComponentKind::Torch => "torch",
        ComponentKind::Accessory => "accessory",
    }
}

/// One cart slot. `Selected` is locked: only an explicit replace command may
/// overwrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CartEntry {
    Unset,
    Selected(Product),
    Skipped,
    NotApplicable,
}

impl CartEntry {
    pub fn is_selected(&self) -> bool {
        matches!(self, CartEntry::Selected(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, CartEntry::Unset)
    }
}

/// What the user has selected, keyed by component kind; accessories are an
/// ordered sequence of `CartEntry::Selected`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub power_source: CartEntry,
    pub feeder: CartEntry,
    pub cooler: CartEntry,
    pub interconnector: CartEntry,
    pub torch: CartEntry,
    pub accessories: Vec<CartEntry>,
}

impl Default for CartEntry {
    fn default() -> Self {
        CartEntry::Unset
    }
}

impl Cart {
    pub fn entry(&self, kind: ComponentKind) -> &CartEntry {
        match kind {
            ComponentKind::PowerSource => &self.power_source,
            ComponentKind::Feeder => &self.feeder,
            ComponentKind::Cooler => &self.cooler,
            ComponentKind::Interconnector => &self.interconnector,
            ComponentKind::Torch => &self.torch,
            ComponentKind::Accessory => {
                // Single-valued accessor is meaningless for a multi-valued kind;
                // callers should use `accessories` directly. Returning the first
                // selected entry (or Unset) keeps `entry()` total for callers
                // that only care about "is anything selected yet".
                self.accessories.first().unwrap_or(&CartEntry::Unset)
            }
        }
    }

    pub fn set_entry(&mut self, kind: ComponentKind, entry: CartEntry) {
        match kind {
            ComponentKind::PowerSource => self.power_source = entry,
            ComponentKind::Feeder => self.feeder = entry,
            ComponentKind::Cooler => self.cooler = entry,
            ComponentKind::Interconnector => self.interconnector = entry,
            ComponentKind::Torch => self.torch = entry,
            ComponentKind::Accessory => self.accessories.push(entry),
        }
    }

    pub fn clear_entry(&mut self, kind: ComponentKind) {
        match kind {
            ComponentKind::Accessory => self.accessories.clear(),
            other => self.set_entry(other, CartEntry::Unset),
        }
    }

    /// The real-component count: number of `Selected` entries, accessories
    /// counted individually.
    pub fn real_component_count(&self) -> usize {
        let singles = [
            &self.power_source,
            &self.feeder,
            &self.cooler,
            &self.interconnector,
            &self.torch,
        ];
        let single_count = singles.iter().filter(|e| e.is_selected()).count();
        let accessory_count = self.accessories.iter().filter(|e| e.is_selected()).count();
        single_count + accessory_count
    }
}

/// The seven-step sequential state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateId {
    S1PowerSource,
    S2Feeder,
    S3Cooler,
    S4Interconnector,
    S5Torch,
    S6Accessories,
    S7Finalize,
}

impl StateId {
    pub fn component_kind(self) -> Option<ComponentKind> {
        match self {
            StateId::S1PowerSource => Some(ComponentKind::PowerSource),
            StateId::S2Feeder => Some(ComponentKind::Feeder),
            StateId::S3Cooler => Some(ComponentKind::Cooler),
            StateId::S4Interconnector => Some(ComponentKind::Interconnector),
            StateId::S5Torch => Some(ComponentKind::Torch),
            StateId::S6Accessories => Some(ComponentKind::Accessory),
            StateId::S7Finalize => None,
        }
    }
}

/// `Y | N` applicability of a component kind for the selected power source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Applicable {
    Y,
    N,
}

/// Mapping from component kind (excluding `PowerSource`) to `Y | N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Applicability {
    pub feeder: Applicable,
    pub cooler: Applicable,
    pub interconnector: Applicable,
    pub torch: Applicable,
    pub accessories: Applicable,
}

impl Applicability {
    pub fn all_yes() -> Self {
        Self {
            feeder: Applicable::Y,
            cooler: Applicable::Y,
            interconnector: Applicable::Y,
            torch: Applicable::Y,
            accessories: Applicable::Y,
        }
    }

    pub fn get(&self, kind: ComponentKind) -> Applicable {
        match kind {
            ComponentKind::PowerSource => Applicable::Y,
            ComponentKind::Feeder => self.feeder,
            ComponentKind::Cooler => self.cooler,
            ComponentKind::Interconnector => self.interconnector,
            ComponentKind::Torch => self.torch,
            ComponentKind::Accessory => self.accessories,
        }
    }
}

/// One conversation turn, retained up to `Config::max_log_entries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

/// A candidate surfaced to the user on the previous turn as the sole option
/// for the current kind, awaiting an explicit "yes" before it is committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSelection {
    pub kind: ComponentKind,
    pub accessory_subkind: Option<AccessorySubkind>,
    pub product: Product,
}

/// The full per-session snapshot. Mutated only by the Orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub current_state: StateId,
    pub master: MasterRecord,
    pub cart: Cart,
    pub applicability: Option<Applicability>,
    pub conversation_log: Vec<ConversationEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub language_tag: String,
    pub completed: bool,
    pub pending_selection: Option<PendingSelection>,
}

impl SessionState {
    pub fn new(session_id: String, language_tag: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            current_state: StateId::S1PowerSource,
            master: MasterRecord::new(),
            cart: Cart::default(),
            applicability: None,
            conversation_log: Vec::new(),
            created_at: now,
            updated_at: now,
            language_tag,
            completed: false,
            pending_selection: None,
        }
    }

    pub fn push_log(&mut self, role: Role, text: String, max_entries: usize) {
        self.conversation_log.push(ConversationEntry {
            role,
            text,
            at: Utc::now(),
        });
        while self.conversation_log.len() > max_entries {
            self.conversation_log.remove(0);
        }
        self.updated_at = Utc::now();
    }

    pub fn last_n_log(&self, n: usize) -> &[ConversationEntry] {
        let start = self.conversation_log.len().saturating_sub(n);
        &self.conversation_log[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_record_is_total_over_component_kinds() {
        let master = MasterRecord::new();
        for kind in ComponentKind::ALL {
            assert!(master.get(kind).is_empty());
        }
    }

    #[test]
    fn parameter_bag_merge_is_last_write_wins() {
        let mut bag = ParameterBag::default();
        let mut first = HashMap::new();
        first.insert("current".to_string(), "500 A".to_string());
        bag.merge_updates(&first);

        let mut second = HashMap::new();
        second.insert("current".to_string(), "300 A".to_string());
        bag.merge_updates(&second);

        assert_eq!(bag.attributes.get("current").unwrap(), "300 A");
    }

    #[test]
    fn real_component_count_counts_accessories_individually() {
        let mut cart = Cart::default();
        cart.power_source = CartEntry::Selected(sample_product("ps-1", ComponentKind::PowerSource));
        cart.accessories.push(CartEntry::Selected(sample_product(
            "acc-1",
            ComponentKind::Accessory,
        )));
        cart.accessories.push(CartEntry::Selected(sample_product(
            "acc-2",
            ComponentKind::Accessory,
        )));
        assert_eq!(cart.real_component_count(), 3);
    }

    fn sample_product(gin: &str, kind: ComponentKind) -> Product {
        Product {
            gin: gin.to_string(),
            name: gin.to_string(),
            description: String::new(),
            kind,
            accessory_subkind: None,
            attributes: HashMap::new(),
            available: true,
        }
    }
}
