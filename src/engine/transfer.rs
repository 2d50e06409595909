//! Transfer planning: turns a UI intent into concrete slot writes.
//!
//! Planning never touches the store. It validates the intent against the current
//! state and the catalog, picks the operation and returns the writes the controller
//! applies optimistically.

use crate::engine::catalog::{ItemCatalog, ItemDefinition};
use crate::engine::derive;
use crate::engine::errors::InventoryError;
use crate::engine::store::InventoryStore;
use crate::engine::types::{
    Action, Inventory, InventoryKey, InventoryKind, OperationKind, Quantity, Slot, SlotItem, SlotRef,
    TransferIntent, AUTO_SLOT,
};

/// One planned slot replacement.
pub type SlotWrite = (InventoryKey, Slot);

/// A validated operation ready for optimistic application.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPlan {
    pub kind: OperationKind,
    pub action: Action,
    pub from: SlotRef,
    /// Resolved target (automatic slots already picked).
    pub to: Option<SlotRef>,
    pub count: u32,
    /// Empty for actions the authority alone carries out.
    pub writes: Vec<SlotWrite>,
}

// ============================================================================
// Slot algorithms
// ============================================================================

/// Splits `count` units off `item`. Returns `(remaining, moved)`; the remaining part is
/// `None` when the whole stack moves. Weight is conserved across the two parts.
fn split(item: &SlotItem, count: u32) -> (Option<SlotItem>, SlotItem) {
    let moved_weight = derive::weight_for(item.weight, item.count, count);
    let moved = SlotItem {
        count,
        weight: moved_weight,
        ..item.clone()
    };
    let remaining = (count < item.count).then(|| SlotItem {
        count: item.count - count,
        weight: item.weight.saturating_sub(moved_weight),
        ..item.clone()
    });
    (remaining, moved)
}

fn reduced(source: &Slot, item: &SlotItem, count: u32, template: bool) -> Slot {
    if template {
        return source.clone();
    }
    match split(item, count).0 {
        Some(rest) => Slot::occupied(source.slot, rest),
        None => Slot::empty(source.slot),
    }
}

/// Move `count` units from `source` into the empty slot `target_index`.
///
/// Returns `(source_after, target_after)`. A template source is left as is.
pub fn move_slot(source: &Slot, target_index: u32, count: u32, template: bool) -> (Slot, Slot) {
    let Some(item) = source.item() else {
        return (source.clone(), Slot::empty(target_index));
    };
    let count = count.min(item.count);
    let (_, moved) = split(item, count);
    (
        reduced(source, item, count, template),
        Slot::occupied(target_index, moved),
    )
}

/// Merge `count` units from `source` onto the compatible stack in `target`.
///
/// The combined weight keeps the target's per-unit weight. Fails when the combined
/// count does not fit a slot.
pub fn stack_slot(
    source: &Slot,
    target: &Slot,
    count: u32,
    template: bool,
) -> Result<(Slot, Slot), InventoryError> {
    let (Some(item), Some(existing)) = (source.item(), target.item()) else {
        return Ok((source.clone(), target.clone()));
    };
    let count = count.min(item.count);
    let combined = existing
        .count
        .checked_add(count)
        .ok_or_else(|| InventoryError::CountOverflow {
            name: existing.name.clone(),
            existing: existing.count,
            added: count,
        })?;
    let merged = SlotItem {
        count: combined,
        weight: derive::weight_for(existing.weight, existing.count, combined),
        ..existing.clone()
    };
    Ok((
        reduced(source, item, count, template),
        Slot::occupied(target.slot, merged),
    ))
}

/// Exchange full contents; each slot keeps its own index.
pub fn swap_slots(source: &Slot, target: &Slot) -> (Slot, Slot) {
    (target.relocated(source.slot), source.relocated(target.slot))
}

/// Same item with identical instance metadata.
pub fn can_stack(a: &SlotItem, b: &SlotItem) -> bool {
    a.name == b.name && a.metadata == b.metadata
}

/// First stack-compatible slot for stackable items, else the first empty slot.
pub fn find_available_slot(
    item: &SlotItem,
    definition: &ItemDefinition,
    inventory: &Inventory,
    exclude: Option<u32>,
) -> Option<u32> {
    let candidates = || inventory.items.iter().filter(|s| Some(s.slot) != exclude);
    if definition.stack {
        let compatible = candidates().find(|s| s.item().map(|t| can_stack(item, t)).unwrap_or(false));
        if let Some(slot) = compatible {
            return Some(slot.slot);
        }
    }
    candidates().find(|s| s.is_empty()).map(|s| s.slot)
}

// ============================================================================
// Planning
// ============================================================================

struct Source<'a> {
    at: SlotRef,
    inventory: &'a Inventory,
    slot: &'a Slot,
    item: &'a SlotItem,
}

fn resolve_inventory<'a>(
    store: &'a InventoryStore,
    key: &InventoryKey,
) -> Result<&'a Inventory, InventoryError> {
    store
        .inventory(key)
        .ok_or_else(|| InventoryError::UnknownInventory(key.clone()))
}

fn resolve_slot<'a>(inventory: &'a Inventory, at: &SlotRef) -> Result<&'a Slot, InventoryError> {
    inventory.slot(at.slot).ok_or_else(|| InventoryError::SlotOutOfRange {
        key: at.inventory.clone(),
        slot: at.slot,
        slots: inventory.slot_count(),
    })
}

fn resolve_source<'a>(store: &'a InventoryStore, at: &SlotRef) -> Result<Source<'a>, InventoryError> {
    let inventory = resolve_inventory(store, &at.inventory)?;
    let slot = resolve_slot(inventory, at)?;
    let item = slot.item().ok_or_else(|| InventoryError::EmptySource {
        key: at.inventory.clone(),
        slot: at.slot,
    })?;
    Ok(Source {
        at: at.clone(),
        inventory,
        slot,
        item,
    })
}

/// Count for drag-style actions: the whole stack by default, clamped for `UpTo`,
/// rejected when an exact amount exceeds the stack.
fn resolve_count(quantity: Quantity, available: u32) -> Result<u32, InventoryError> {
    match quantity {
        Quantity::Stack => Ok(available),
        Quantity::UpTo(n) => Ok(n.min(available)),
        Quantity::Exact(n) if n > available => Err(InventoryError::ExceedsAvailable {
            requested: n,
            available,
        }),
        Quantity::Exact(n) => Ok(n),
    }
}

/// Count for consumption requests: one unit unless an amount was chosen.
fn resolve_units(quantity: Quantity, available: u32) -> Result<u32, InventoryError> {
    match quantity {
        Quantity::Stack => Ok(1),
        other => resolve_count(other, available),
    }
}

fn require_target(intent: &TransferIntent, kind: OperationKind) -> Result<SlotRef, InventoryError> {
    intent.to.clone().ok_or(InventoryError::MissingTarget(kind))
}

fn require_kind(source: &Source<'_>, expected: InventoryKind) -> Result<(), InventoryError> {
    if source.inventory.kind == expected {
        Ok(())
    } else {
        Err(InventoryError::WrongSourceKind {
            expected,
            found: source.inventory.kind.clone(),
        })
    }
}

fn reject_template(source: &Source<'_>) -> Result<(), InventoryError> {
    if source.inventory.kind.is_template() {
        Err(InventoryError::TemplateSource(source.inventory.kind.clone()))
    } else {
        Ok(())
    }
}

/// Resolve `AUTO_SLOT` against `inventory` and range-check the result.
fn resolve_target(
    to: SlotRef,
    inventory: &Inventory,
    item: &SlotItem,
    definition: &ItemDefinition,
    exclude: Option<u32>,
) -> Result<SlotRef, InventoryError> {
    let to = if to.slot == AUTO_SLOT {
        let slot = find_available_slot(item, definition, inventory, exclude)
            .ok_or_else(|| InventoryError::NoAvailableSlot(to.inventory.clone()))?;
        SlotRef::new(to.inventory, slot)
    } else {
        to
    };
    resolve_slot(inventory, &to)?;
    Ok(to)
}

/// Validate `intent` and compute the optimistic writes for it.
///
/// Fails without side effects other than a catalog fetch request for unknown items.
pub fn plan_transfer(
    store: &InventoryStore,
    catalog: &mut ItemCatalog,
    intent: &TransferIntent,
) -> Result<TransferPlan, InventoryError> {
    if let Some(to) = &intent.to {
        if to.inventory == intent.from.inventory && to.slot == intent.from.slot {
            return Err(InventoryError::NoOpTarget {
                key: to.inventory.clone(),
                slot: to.slot,
            });
        }
    }
    if let Quantity::UpTo(0) | Quantity::Exact(0) = intent.quantity {
        return Err(InventoryError::InvalidQuantity(0));
    }

    let source = resolve_source(store, &intent.from)?;
    let definition = catalog.lookup(&source.item.name)?.clone();

    let plan = match &intent.action {
        Action::Transfer => plan_drag(store, &source, &definition, intent)?,
        Action::Craft => {
            require_kind(&source, InventoryKind::Crafting)?;
            let to = require_target(intent, OperationKind::Craft)?;
            let target = resolve_inventory(store, &to.inventory)?;
            let to = resolve_target(to, target, source.item, &definition, None)?;
            authority_only(&source, intent, OperationKind::Craft, Some(to), resolve_units(intent.quantity, source.item.count)?)
        }
        Action::Buy => {
            require_kind(&source, InventoryKind::Shop)?;
            let to = require_target(intent, OperationKind::Buy)?;
            let target = resolve_inventory(store, &to.inventory)?;
            let to = resolve_target(to, target, source.item, &definition, None)?;
            if let Some(existing) = resolve_slot(target, &to)?.item() {
                if !(definition.stack && can_stack(source.item, existing)) {
                    return Err(InventoryError::TargetOccupied(to));
                }
            }
            authority_only(&source, intent, OperationKind::Buy, Some(to), resolve_units(intent.quantity, source.item.count)?)
        }
        Action::Give => {
            reject_template(&source)?;
            authority_only(&source, intent, OperationKind::Give, None, resolve_count(intent.quantity, source.item.count)?)
        }
        Action::Use => {
            if !definition.usable {
                return Err(InventoryError::NotUsable(definition.name.clone()));
            }
            authority_only(&source, intent, OperationKind::Use, None, 1)
        }
        Action::Drop => {
            reject_template(&source)?;
            let count = resolve_count(intent.quantity, source.item.count)?;
            TransferPlan {
                kind: OperationKind::Drop,
                action: intent.action.clone(),
                from: source.at.clone(),
                to: None,
                count,
                writes: vec![(
                    source.at.inventory.clone(),
                    reduced(source.slot, source.item, count, false),
                )],
            }
        }
        Action::RemoveComponent(component) => {
            if !source.item.components().contains(&component.as_str()) {
                return Err(InventoryError::MissingComponent(component.clone()));
            }
            authority_only(&source, intent, OperationKind::RemoveComponent, None, 1)
        }
        Action::RemoveAmmo => {
            if source.item.ammo() == 0 {
                return Err(InventoryError::NoAmmo);
            }
            authority_only(&source, intent, OperationKind::RemoveAmmo, None, 1)
        }
        Action::Button(index) => {
            if *index >= definition.buttons.len() {
                return Err(InventoryError::MissingButton {
                    name: definition.name.clone(),
                    index: *index,
                });
            }
            authority_only(&source, intent, OperationKind::Button, None, 1)
        }
    };

    log::debug!(
        "Planned {} of {} x{} from {}{} ({} writes)",
        plan.kind,
        source.item.name,
        plan.count,
        plan.from,
        plan.to.as_ref().map(|to| format!(" to {}", to)).unwrap_or_default(),
        plan.writes.len()
    );
    Ok(plan)
}

fn authority_only(
    source: &Source<'_>,
    intent: &TransferIntent,
    kind: OperationKind,
    to: Option<SlotRef>,
    count: u32,
) -> TransferPlan {
    TransferPlan {
        kind,
        action: intent.action.clone(),
        from: source.at.clone(),
        to,
        count,
        writes: Vec::new(),
    }
}

/// Drag and drop: move into an empty slot, stack onto a compatible one, or swap.
///
/// A drag out of a shop is a purchase and a drag out of a crafting inventory is a
/// craft; both keep the template source intact.
fn plan_drag(
    store: &InventoryStore,
    source: &Source<'_>,
    definition: &ItemDefinition,
    intent: &TransferIntent,
) -> Result<TransferPlan, InventoryError> {
    let to = require_target(intent, OperationKind::Move)?;
    let target_inventory = resolve_inventory(store, &to.inventory)?;
    if target_inventory.kind.is_template() {
        return Err(InventoryError::TargetNotWritable(target_inventory.kind.clone()));
    }
    let exclude = (to.inventory == source.at.inventory).then_some(source.at.slot);
    let to = resolve_target(to, target_inventory, source.item, definition, exclude)?;
    let target = resolve_slot(target_inventory, &to)?;

    let template = source.inventory.kind.is_template();
    if source.inventory.kind == InventoryKind::Crafting {
        // The product arrives with the host's refresh.
        let count = resolve_units(intent.quantity, source.item.count)?;
        return Ok(authority_only(source, intent, OperationKind::Craft, Some(to), count));
    }
    let count = if template {
        resolve_units(intent.quantity, source.item.count)?
    } else {
        resolve_count(intent.quantity, source.item.count)?
    };
    let placed = |kind: OperationKind| if template { OperationKind::Buy } else { kind };

    let (kind, source_after, target_after, count) = match target.item() {
        None => {
            let (s, t) = move_slot(source.slot, to.slot, count, template);
            (placed(OperationKind::Move), s, t, count)
        }
        Some(existing) if definition.stack && can_stack(source.item, existing) => {
            let (s, t) = stack_slot(source.slot, target, count, template)?;
            (placed(OperationKind::Stack), s, t, count)
        }
        Some(_) => {
            if template {
                return Err(InventoryError::TemplateSource(source.inventory.kind.clone()));
            }
            let (s, t) = swap_slots(source.slot, target);
            (OperationKind::Swap, s, t, source.item.count)
        }
    };

    Ok(TransferPlan {
        kind,
        action: intent.action.clone(),
        from: source.at.clone(),
        to: Some(to.clone()),
        count,
        writes: vec![
            (source.at.inventory.clone(), source_after),
            (to.inventory, target_after),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::ItemDefinition;
    use crate::engine::store::SetupPayload;
    use serde_json::json;

    fn catalog() -> ItemCatalog {
        ItemCatalog::with_items([
            ItemDefinition::new("water", "Water", true, true),
            ItemDefinition::new("burger", "Burger", false, true),
            ItemDefinition::new("backwoods", "Backwoods", false, false)
                .with_button("Open pack", None),
            ItemDefinition::new("pistol", "Pistol", false, false),
        ])
    }

    fn store() -> InventoryStore {
        let mut store = InventoryStore::default();
        let setup: SetupPayload = serde_json::from_value(json!({
            "leftInventory": {
                "id": "player1", "type": "player", "slots": 6,
                "items": [
                    {"slot": 1, "name": "water", "count": 5, "weight": 2500},
                    {"slot": 2, "name": "burger", "count": 1, "weight": 220},
                    {"slot": 3, "name": "backwoods", "count": 2, "weight": 40},
                    {"slot": 4, "name": "water", "count": 1, "weight": 500},
                    {"slot": 5, "name": "pistol", "count": 1, "weight": 1200,
                     "metadata": {"ammo": 0, "components": ["suppressor"]}}
                ]
            },
            "rightInventory": {
                "id": "shop1", "type": "shop", "slots": 3,
                "items": [{"slot": 1, "name": "water", "count": 50, "weight": 25000}]
            }
        }))
        .expect("setup");
        store.setup(setup, &mut ItemCatalog::new());
        store
    }

    fn left(slot: u32) -> SlotRef {
        SlotRef::new(InventoryKey::Primary, slot)
    }

    fn write_for(plan: &TransferPlan, key: &InventoryKey, slot: u32) -> Slot {
        plan.writes
            .iter()
            .find(|(k, s)| k == key && s.slot == slot)
            .map(|(_, s)| s.clone())
            .expect("write")
    }

    #[test]
    fn split_move_conserves_count_and_weight() {
        let plan = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::transfer(left(1), left(6), Quantity::Exact(3)),
        )
        .expect("plan");
        assert_eq!(plan.kind, OperationKind::Move);
        let source = write_for(&plan, &InventoryKey::Primary, 1);
        let target = write_for(&plan, &InventoryKey::Primary, 6);
        assert_eq!((source.count(), source.weight()), (2, 1000));
        assert_eq!((target.count(), target.weight()), (3, 1500));
    }

    #[test]
    fn whole_stack_move_clears_source() {
        let (source, target) = move_slot(
            &Slot::occupied(1, SlotItem::new("water", 5, 2500)),
            6,
            5,
            false,
        );
        assert!(source.is_empty());
        assert_eq!(source.slot, 1);
        assert_eq!(target.count(), 5);
    }

    #[test]
    fn template_source_is_not_depleted() {
        let (source, target) = move_slot(
            &Slot::occupied(1, SlotItem::new("water", 50, 25000)),
            3,
            2,
            true,
        );
        assert_eq!(source.count(), 50);
        assert_eq!((target.count(), target.weight()), (2, 1000));
    }

    #[test]
    fn compatible_stacks_merge_with_target_unit_weight() {
        let plan = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::transfer(left(4), left(1), Quantity::Stack),
        )
        .expect("plan");
        assert_eq!(plan.kind, OperationKind::Stack);
        assert!(write_for(&plan, &InventoryKey::Primary, 4).is_empty());
        let merged = write_for(&plan, &InventoryKey::Primary, 1);
        assert_eq!((merged.count(), merged.weight()), (6, 3000));
    }

    #[test]
    fn different_items_swap_whole_slots() {
        let plan = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::transfer(left(2), left(3), Quantity::Exact(1)),
        )
        .expect("plan");
        assert_eq!(plan.kind, OperationKind::Swap);
        let at2 = write_for(&plan, &InventoryKey::Primary, 2);
        let at3 = write_for(&plan, &InventoryKey::Primary, 3);
        assert_eq!((at2.name(), at2.count()), (Some("backwoods"), 2));
        assert_eq!((at3.name(), at3.count()), (Some("burger"), 1));
    }

    #[test]
    fn metadata_mismatch_prevents_stacking() {
        let a = SlotItem::new("water", 1, 500);
        let b = SlotItem::new("water", 1, 500).with_metadata("durability", json!(40));
        assert!(can_stack(&a, &a.clone()));
        assert!(!can_stack(&a, &b));
    }

    #[test]
    fn same_slot_is_rejected() {
        let err = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::transfer(left(1), left(1), Quantity::Stack),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::NoOpTarget { slot: 1, .. }));
    }

    #[test]
    fn zero_and_excess_quantities_are_rejected() {
        let mut catalog = catalog();
        let store = store();
        let zero = plan_transfer(&store, &mut catalog, &TransferIntent::transfer(left(1), left(6), Quantity::UpTo(0)));
        assert!(matches!(zero, Err(InventoryError::InvalidQuantity(0))));
        let excess = plan_transfer(&store, &mut catalog, &TransferIntent::transfer(left(1), left(6), Quantity::Exact(9)));
        assert!(matches!(excess, Err(InventoryError::ExceedsAvailable { requested: 9, available: 5 })));
        let clamped = plan_transfer(&store, &mut catalog, &TransferIntent::transfer(left(1), left(6), Quantity::UpTo(9)))
            .expect("plan");
        assert_eq!(clamped.count, 5);
    }

    #[test]
    fn unknown_item_requests_definition() {
        let mut catalog = ItemCatalog::new();
        let err = plan_transfer(
            &store(),
            &mut catalog,
            &TransferIntent::transfer(left(1), left(6), Quantity::Stack),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::UnknownItem(ref name) if name == "water"));
        assert!(catalog.is_requested("water"));
    }

    #[test]
    fn automatic_target_prefers_compatible_stack() {
        let store = store();
        let inventory = store.primary();
        let water = SlotItem::new("water", 1, 500);
        let def = ItemDefinition::new("water", "Water", true, true);
        assert_eq!(find_available_slot(&water, &def, inventory, Some(1)), Some(4));
        let burger = SlotItem::new("burger", 1, 220);
        let def = ItemDefinition::new("burger", "Burger", false, true);
        assert_eq!(find_available_slot(&burger, &def, inventory, None), Some(6));
    }

    #[test]
    fn drag_into_shop_is_rejected() {
        let err = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::transfer(left(2), SlotRef::new(InventoryKey::Secondary, 2), Quantity::Stack),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::TargetNotWritable(InventoryKind::Shop)));
    }

    #[test]
    fn buy_defaults_to_one_unit_without_local_writes() {
        let plan = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::buy(SlotRef::new(InventoryKey::Secondary, 1), left(6), Quantity::Stack),
        )
        .expect("plan");
        assert_eq!(plan.kind, OperationKind::Buy);
        assert_eq!(plan.count, 1);
        assert!(plan.writes.is_empty());
    }

    #[test]
    fn buy_into_incompatible_slot_is_rejected() {
        let err = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::buy(SlotRef::new(InventoryKey::Secondary, 1), left(2), Quantity::Stack),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::TargetOccupied(_)));
    }

    #[test]
    fn craft_requires_crafting_source() {
        let err = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::craft(left(1), left(6), Quantity::Stack),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::WrongSourceKind {
                expected: InventoryKind::Crafting,
                ..
            }
        ));
    }

    #[test]
    fn drop_reduces_source_optimistically() {
        let plan = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::on_slot(Action::Drop, left(1), Quantity::Exact(2)),
        )
        .expect("plan");
        assert_eq!(plan.writes.len(), 1);
        assert_eq!(write_for(&plan, &InventoryKey::Primary, 1).count(), 3);
    }

    #[test]
    fn context_actions_check_item_state() {
        let mut catalog = catalog();
        let store = store();
        let use_pistol = plan_transfer(&store, &mut catalog, &TransferIntent::on_slot(Action::Use, left(5), Quantity::Stack));
        assert!(matches!(use_pistol, Err(InventoryError::NotUsable(_))));
        let ammo = plan_transfer(&store, &mut catalog, &TransferIntent::on_slot(Action::RemoveAmmo, left(5), Quantity::Stack));
        assert!(matches!(ammo, Err(InventoryError::NoAmmo)));
        let component = plan_transfer(
            &store,
            &mut catalog,
            &TransferIntent::on_slot(Action::RemoveComponent("suppressor".into()), left(5), Quantity::Stack),
        )
        .expect("plan");
        assert!(component.writes.is_empty());
        let button = plan_transfer(&store, &mut catalog, &TransferIntent::on_slot(Action::Button(1), left(3), Quantity::Stack));
        assert!(matches!(button, Err(InventoryError::MissingButton { index: 1, .. })));
    }

    #[test]
    fn shop_drag_is_a_purchase_that_keeps_stock() {
        let plan = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::transfer(SlotRef::new(InventoryKey::Secondary, 1), left(6), Quantity::Exact(2)),
        )
        .expect("plan");
        assert_eq!(plan.kind, OperationKind::Buy);
        assert_eq!(plan.kind.endpoint(), "buyItem");
        assert_eq!(write_for(&plan, &InventoryKey::Secondary, 1).count(), 50);
        assert_eq!(write_for(&plan, &InventoryKey::Primary, 6).count(), 2);

        let onto_stack = plan_transfer(
            &store(),
            &mut catalog(),
            &TransferIntent::transfer(SlotRef::new(InventoryKey::Secondary, 1), left(4), Quantity::Stack),
        )
        .expect("plan");
        assert_eq!(onto_stack.kind, OperationKind::Buy);
        assert_eq!(onto_stack.count, 1);
        assert_eq!(write_for(&onto_stack, &InventoryKey::Primary, 4).count(), 2);
    }

    #[test]
    fn crafting_drag_is_a_craft_without_local_writes() {
        let mut store = store();
        let bench: SetupPayload = serde_json::from_value(json!({
            "rightInventory": {
                "id": "bench1", "type": "crafting", "slots": 2,
                "items": [{"slot": 1, "name": "burger", "count": 1, "weight": 220}]
            }
        }))
        .expect("bench");
        store.setup(bench, &mut ItemCatalog::new());

        let plan = plan_transfer(
            &store,
            &mut catalog(),
            &TransferIntent::transfer(SlotRef::new(InventoryKey::Secondary, 1), left(6), Quantity::Stack),
        )
        .expect("plan");
        assert_eq!(plan.kind, OperationKind::Craft);
        assert_eq!(plan.kind.endpoint(), "craftItem");
        assert_eq!(plan.to, Some(left(6)));
        assert_eq!(plan.count, 1);
        assert!(plan.writes.is_empty());
    }

    #[test]
    fn stacking_past_the_count_limit_is_refused() {
        let full = Slot::occupied(6, SlotItem::new("water", u32::MAX, 1000));
        let err = stack_slot(&Slot::occupied(1, SlotItem::new("water", 5, 2500)), &full, 5, false).unwrap_err();
        assert!(matches!(err, InventoryError::CountOverflow { existing: u32::MAX, added: 5, .. }));

        let mut store = store();
        store.refresh(
            crate::engine::refresh::RefreshPayload::slot(InventoryKey::Primary, full),
            &mut ItemCatalog::new(),
        );
        let err = plan_transfer(
            &store,
            &mut catalog(),
            &TransferIntent::transfer(left(1), left(6), Quantity::Stack),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::CountOverflow { .. }));
    }
}
