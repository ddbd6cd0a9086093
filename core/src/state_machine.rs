//! C5: State Machine.
//!
//! Enumerates active states from the Applicability table and the current
//! Cart, and computes the next active state after any successful turn or
//! after a downstream-clear cascade.

use crate::types::{Applicability, Cart, ComponentKind, StateId};

/// `active = [S1] + [S_k for applicable k] + [S7]`. Before a
/// PowerSource is selected (no `Applicability` loaded yet), only `[S1]` is
/// well-defined and the caller should not consult this.
pub fn active_states(applicability: &Applicability) -> Vec<StateId> {
    let mut states = vec![StateId::S1PowerSource];
    if applicability.feeder == crate::types::Applicable::Y {
        states.push(StateId::S2Feeder);
    }
    if applicability.cooler == crate::types::Applicable::Y {
        states.push(StateId::S3Cooler);
    }
    if applicability.interconnector == crate::types::Applicable::Y {
        states.push(StateId::S4Interconnector);
    }
    if applicability.torch == crate::types::Applicable::Y {
        states.push(StateId::S5Torch);
    }
    if applicability.accessories == crate::types::Applicable::Y {
        states.push(StateId::S6Accessories);
    }
    states.push(StateId::S7Finalize);
    states
}

/// The state immediately following `current` in the active-states list.
pub fn next_active_state(applicability: &Applicability, current: StateId) -> StateId {
    let states = active_states(applicability);
    let idx = states.iter().position(|s| *s == current).unwrap_or(0);
    states.get(idx + 1).copied().unwrap_or(StateId::S7Finalize)
}

/// For every component kind the PowerSource's Applicability marks `N`, the
/// Cart entry must become `NotApplicable`.
pub fn apply_not_applicable(cart: &mut Cart, applicability: &Applicability) {
    for kind in [
        ComponentKind::Feeder,
        ComponentKind::Cooler,
        ComponentKind::Interconnector,
        ComponentKind::Torch,
        ComponentKind::Accessory,
    ] {
        if applicability.get(kind) == crate::types::Applicable::N {
            cart.clear_entry(kind);
            cart.set_entry(kind, crate::types::CartEntry::NotApplicable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Applicable;

    #[test]
    fn active_states_skip_not_applicable_kinds() {
        let applicability = Applicability {
            feeder: Applicable::N,
            cooler: Applicable::N,
            interconnector: Applicable::N,
            torch: Applicable::Y,
            accessories: Applicable::Y,
        };
        let states = active_states(&applicability);
        assert_eq!(
            states,
            vec![
                StateId::S1PowerSource,
                StateId::S5Torch,
                StateId::S6Accessories,
                StateId::S7Finalize,
            ]
        );
    }

    #[test]
    fn next_active_state_skips_gaps() {
        let applicability = Applicability {
            feeder: Applicable::N,
            cooler: Applicable::N,
            interconnector: Applicable::N,
            torch: Applicable::Y,
            accessories: Applicable::Y,
        };
        assert_eq!(
            next_active_state(&applicability, StateId::S1PowerSource),
            StateId::S5Torch
        );
    }

    #[test]
    fn apply_not_applicable_marks_every_n_kind() {
        let applicability = Applicability {
            feeder: Applicable::N,
            cooler: Applicable::Y,
            interconnector: Applicable::N,
            torch: Applicable::Y,
            accessories: Applicable::Y,
        };
        let mut cart = Cart::default();
        apply_not_applicable(&mut cart, &applicability);
        assert_eq!(cart.feeder, crate::types::CartEntry::NotApplicable);
        assert_eq!(cart.interconnector, crate::types::CartEntry::NotApplicable);
        assert_eq!(cart.cooler, crate::types::CartEntry::Unset);
    }
}
