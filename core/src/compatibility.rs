//! C4: Compatibility Engine.
//!
//! Builds a predicate from the current Cart's anchors; the predicate is
//! consumed by the Product Repository (C3) and never retroactively applied
//! to prior selections — re-validation happens only when a new search runs.

use crate::types::{AccessorySubkind, Cart, ComponentKind, Gin};

/// An opaque predicate produced by the engine and consumed by C3: the set of
/// `Gin`s a candidate must be `COMPATIBLE_WITH` to be admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibilityPredicate {
    pub anchors: Vec<Gin>,
}

impl CompatibilityPredicate {
    pub fn is_satisfied_by(&self, candidate: &Gin, compatible_with: &dyn Fn(&Gin, &Gin) -> bool) -> bool {
        self.anchors
            .iter()
            .all(|anchor| compatible_with(candidate, anchor))
    }
}

/// Build the compatibility predicate for `kind` given the current Cart.
pub fn build_predicate(
    kind: ComponentKind,
    accessory_subkind: Option<AccessorySubkind>,
    cart: &Cart,
) -> CompatibilityPredicate {
    let mut anchors = Vec::new();
    let ps = selected_gin(cart.entry(ComponentKind::PowerSource));
    let feeder = selected_gin(&cart.feeder);
    let cooler = selected_gin(&cart.cooler);

    match kind {
        ComponentKind::PowerSource => {}
        ComponentKind::Feeder => push(&mut anchors, ps),
        ComponentKind::Cooler => {
            push(&mut anchors, ps);
            push(&mut anchors, feeder);
        }
        ComponentKind::Interconnector => {
            push(&mut anchors, ps);
            push(&mut anchors, feeder);
            push(&mut anchors, cooler);
        }
        ComponentKind::Torch => {
            if feeder.is_some() {
                push(&mut anchors, feeder);
            } else {
                push(&mut anchors, ps);
            }
            push(&mut anchors, cooler);
        }
        ComponentKind::Accessory => match accessory_subkind {
            Some(AccessorySubkind::PowerSourceAccessory) => push(&mut anchors, ps),
            Some(AccessorySubkind::FeederAccessory) => push(&mut anchors, feeder),
            Some(AccessorySubkind::ConnectivityAccessory) | Some(AccessorySubkind::Remote) => {
                push(&mut anchors, ps);
                push(&mut anchors, feeder);
            }
            None => push(&mut anchors, ps),
        },
    }

    CompatibilityPredicate { anchors }
}

fn selected_gin(entry: &crate::types::CartEntry) -> Option<Gin> {
    match entry {
        crate::types::CartEntry::Selected(p) => Some(p.gin.clone()),
        _ => None,
    }
}

fn push(anchors: &mut Vec<Gin>, gin: Option<Gin>) {
    if let Some(g) = gin {
        anchors.push(g);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartEntry, Product};
    use std::collections::HashMap;

    fn product(gin: &str, kind: ComponentKind) -> Product {
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

    #[test]
    fn power_source_has_no_anchors() {
        let cart = Cart::default();
        let pred = build_predicate(ComponentKind::PowerSource, None, &cart);
        assert!(pred.anchors.is_empty());
    }

    #[test]
    fn feeder_anchors_on_power_source_only() {
        let mut cart = Cart::default();
        cart.power_source = CartEntry::Selected(product("ps-1", ComponentKind::PowerSource));
        let pred = build_predicate(ComponentKind::Feeder, None, &cart);
        assert_eq!(pred.anchors, vec!["ps-1".to_string()]);
    }

    #[test]
    fn torch_anchors_on_feeder_when_selected_else_power_source() {
        let mut cart = Cart::default();
        cart.power_source = CartEntry::Selected(product("ps-1", ComponentKind::PowerSource));
        let pred_no_feeder = build_predicate(ComponentKind::Torch, None, &cart);
        assert_eq!(pred_no_feeder.anchors, vec!["ps-1".to_string()]);

        cart.feeder = CartEntry::Selected(product("feeder-1", ComponentKind::Feeder));
        let pred_with_feeder = build_predicate(ComponentKind::Torch, None, &cart);
        assert_eq!(pred_with_feeder.anchors, vec!["feeder-1".to_string()]);
    }

    #[test]
    fn skipped_and_not_applicable_entries_contribute_no_anchor() {
        let mut cart = Cart::default();
        cart.power_source = CartEntry::Selected(product("ps-1", ComponentKind::PowerSource));
        cart.feeder = CartEntry::Skipped;
        let pred = build_predicate(ComponentKind::Cooler, None, &cart);
        assert_eq!(pred.anchors, vec!["ps-1".to_string()]);
    }

    #[test]
    fn accessory_connectivity_anchors_on_power_source_and_feeder() {
        let mut cart = Cart::default();
        cart.power_source = CartEntry::Selected(product("ps-1", ComponentKind::PowerSource));
        cart.feeder = CartEntry::Selected(product("feeder-1", ComponentKind::Feeder));
        let pred = build_predicate(
            ComponentKind::Accessory,
            Some(AccessorySubkind::ConnectivityAccessory),
            &cart,
        );
        assert_eq!(pred.anchors, vec!["ps-1".to_string(), "feeder-1".to_string()]);
    }
}
