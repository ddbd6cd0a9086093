//! C7: Message Composer.
//!
//! Renders a small closed set of `ComposerIntent`s into user-facing text.
//! Localization is a `HashMap<&'static str, Templates>` keyed by language
//! tag with an `en` entry always present; any tag not in the map falls back
//! to `en` key-by-key. No business logic lives here — the Orchestrator
//! decides which intent to emit.

use crate::types::{Cart, CartEntry, ComponentKind, Product};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum ComposerIntent<'a> {
    PromptFor(ComponentKind),
    PresentOptions {
        kind: ComponentKind,
        products: &'a [Product],
        fallback: bool,
    },
    Confirm {
        kind: ComponentKind,
        product: &'a Product,
    },
    RejectSkipOfPowerSource,
    NotApplicableNotice(Vec<ComponentKind>),
    FinalizationSummary(FinalizationView),
    ThresholdNotMet { current: usize, required: usize },
    ExtractionFallback,
    SessionExpired,
    Greeting,
}

/// Structured finalization payload: only identifier, name,
/// description per entry, accessories listed in order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FinalizationView {
    pub entries: Vec<FinalizationEntry>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FinalizationEntry {
    pub kind: &'static str,
    pub gin: String,
    pub name: String,
    pub description: String,
}

pub fn finalization_view(cart: &Cart) -> FinalizationView {
    let mut entries = Vec::new();
    for (kind, entry) in [
        ("power_source", &cart.power_source),
        ("feeder", &cart.feeder),
        ("cooler", &cart.cooler),
        ("interconnector", &cart.interconnector),
        ("torch", &cart.torch),
    ] {
        if let CartEntry::Selected(p) = entry {
            entries.push(FinalizationEntry {
                kind,
                gin: p.gin.clone(),
                name: p.name.clone(),
                description: p.description.clone(),
            });
        }
    }
    for entry in &cart.accessories {
        if let CartEntry::Selected(p) = entry {
            entries.push(FinalizationEntry {
                kind: "accessory",
                gin: p.gin.clone(),
                name: p.name.clone(),
                description: p.description.clone(),
            });
        }
    }
    FinalizationView { entries }
}

struct Templates {
    prompt_for: fn(ComponentKind) -> String,
    reject_skip_of_power_source: &'static str,
    threshold_not_met: fn(usize, usize) -> String,
    extraction_fallback: &'static str,
    session_expired: &'static str,
    greeting: &'static str,
}

fn en_templates() -> Templates {
    Templates {
        prompt_for: |kind| format!("Tell me about the {} you need (attributes like {}).", kind_label(kind), attribute_hint(kind)),
        reject_skip_of_power_source: "A power source is required before we can continue — please tell me what you need.",
        threshold_not_met: |current, required| {
            format!("You have {current} component(s) selected; at least {required} are required to finalize.")
        },
        extraction_fallback: "Sorry, I didn't quite catch that — could you restate it?",
        session_expired: "Your previous session expired, so we're starting fresh.",
        greeting: "Hi! Let's configure your welding equipment. What power source do you need?",
    }
}

fn kind_label(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::PowerSource => "power source",
        ComponentKind::Feeder => "wire feeder",
        ComponentKind::Cooler => "cooler",
        ComponentKind::Interconnector => "interconnector",
        ComponentKind::Torch => "torch",
        ComponentKind::Accessory => "accessory",
    }
}

fn attribute_hint(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::PowerSource => "process, current, voltage, phase",
        ComponentKind::Feeder => "portability, wire_size, process",
        ComponentKind::Cooler => "cooling_type",
        ComponentKind::Interconnector => "cable_length",
        ComponentKind::Torch => "process, cooling_type",
        ComponentKind::Accessory => "material",
    }
}

/// Localized message composer. Only `en` is populated by default; other
/// tags are accepted by the `MessageComposer::new` constructor as documented
/// extension points and fall back to `en`.
pub struct MessageComposer {
    templates: HashMap<&'static str, Templates>,
}

impl MessageComposer {
    pub fn new() -> Self {
        let mut templates = HashMap::new();
        templates.insert("en", en_templates());
        Self { templates }
    }

    fn templates_for(&self, language_tag: &str) -> &Templates {
        self.templates.get(language_tag).unwrap_or_else(|| &self.templates["en"])
    }

    pub fn compose(&self, language_tag: &str, intent: &ComposerIntent<'_>) -> String {
        let t = self.templates_for(language_tag);
        match intent {
            ComposerIntent::PromptFor(kind) => (t.prompt_for)(*kind),
            ComposerIntent::PresentOptions { kind, products, fallback } => {
                present_options(*kind, products, *fallback)
            }
            ComposerIntent::Confirm { kind, product } => {
                format!("Great, I've selected {} for your {}.", product.name, kind_label(*kind))
            }
            ComposerIntent::RejectSkipOfPowerSource => t.reject_skip_of_power_source.to_string(),
            ComposerIntent::NotApplicableNotice(kinds) => not_applicable_notice(kinds),
            ComposerIntent::FinalizationSummary(view) => finalization_summary_text(view),
            ComposerIntent::ThresholdNotMet { current, required } => (t.threshold_not_met)(*current, *required),
            ComposerIntent::ExtractionFallback => t.extraction_fallback.to_string(),
            ComposerIntent::SessionExpired => t.session_expired.to_string(),
            ComposerIntent::Greeting => t.greeting.to_string(),
        }
    }
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self::new()
    }
}

fn present_options(kind: ComponentKind, products: &[Product], fallback: bool) -> String {
    let prefix = if fallback {
        format!(
            "No exact match for your {} requirements, but here are compatible options:\n",
            kind_label(kind)
        )
    } else {
        String::new()
    };
    match products.len() {
        0 => format!("No compatible {} found — could you adjust your requirements?", kind_label(kind)),
        1 => format!("{prefix}I found one match: {} — {}. Shall I select it?", products[0].name, products[0].description),
        _ => {
            let listing: Vec<String> = products
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{}. {} — {}", i + 1, p.name, p.description))
                .collect();
            format!("{prefix}{}", listing.join("\n"))
        }
    }
}

fn not_applicable_notice(kinds: &[ComponentKind]) -> String {
    let labels: Vec<&str> = kinds.iter().map(|k| kind_label(*k)).collect();
    format!(
        "Based on your power source, the following aren't applicable and were skipped: {}.",
        labels.join(", ")
    )
}

fn finalization_summary_text(view: &FinalizationView) -> String {
    let lines: Vec<String> = view
        .entries
        .iter()
        .map(|e| format!("- {} ({}): {}", e.name, e.kind, e.description))
        .collect();
    format!("Here's your final configuration:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn product(name: &str) -> Product {
        Product {
            gin: "g".to_string(),
            name: name.to_string(),
            description: "desc".to_string(),
            kind: ComponentKind::PowerSource,
            accessory_subkind: None,
            attributes: Map::new(),
            available: true,
        }
    }

    #[test]
    fn unknown_language_tag_falls_back_to_english() {
        let composer = MessageComposer::new();
        let text = composer.compose("fr", &ComposerIntent::Greeting);
        assert!(text.contains("configure your welding equipment"));
    }

    #[test]
    fn present_options_with_one_result_asks_for_confirmation() {
        let composer = MessageComposer::new();
        let products = vec![product("PowerMax 500")];
        let text = composer.compose(
            "en",
            &ComposerIntent::PresentOptions {
                kind: ComponentKind::PowerSource,
                products: &products,
                fallback: false,
            },
        );
        assert!(text.contains("Shall I select it?"));
    }

    #[test]
    fn present_options_with_zero_results_asks_to_adjust() {
        let composer = MessageComposer::new();
        let products: Vec<Product> = vec![];
        let text = composer.compose(
            "en",
            &ComposerIntent::PresentOptions {
                kind: ComponentKind::Feeder,
                products: &products,
                fallback: false,
            },
        );
        assert!(text.contains("could you adjust"));
    }

    #[test]
    fn finalization_summary_lists_only_identifier_name_description() {
        let mut cart = Cart::default();
        cart.power_source = CartEntry::Selected(product("PowerMax 500"));
        let view = finalization_view(&cart);
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].name, "PowerMax 500");
    }
}
