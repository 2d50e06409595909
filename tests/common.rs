//! Shared fixtures: a seeded controller plus direct access to the bridge receiver so
//! each test plays the authority itself.

use std::time::Duration;

use gridstash::engine::{
    BridgeRequest, HostBridge, InventoryKey, InventoryStore, ItemCatalog, ItemDefinition,
    ReconciliationController, SetupPayload, SlotRef,
};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn catalog() -> ItemCatalog {
    ItemCatalog::with_items([
        ItemDefinition::new("water", "Water", true, true),
        ItemDefinition::new("burger", "Burger", false, true),
        ItemDefinition::new("backwoods", "Backwoods Cigar", false, false),
        ItemDefinition::new("lockpick", "Lockpick", true, true),
        ItemDefinition::new("bandage", "Bandage", true, true),
        ItemDefinition::new("paperbag", "Paper Bag", false, false),
        ItemDefinition::new("radio", "Radio", false, true)
            .with_button("Turn on", Some("Power"))
            .with_button("Turn off", Some("Power")),
    ])
}

/// Player with water x5 (1), burger (2), backwoods x2 (3), paper bag (4), radio (5),
/// three empty slots; a shop selling water and lockpicks; an empty backpack.
pub fn setup() -> SetupPayload {
    serde_json::from_value(json!({
        "leftInventory": {
            "id": "player1", "type": "player", "slots": 8, "maxWeight": 30000,
            "items": [
                {"slot": 1, "name": "water", "count": 5, "weight": 2500},
                {"slot": 2, "name": "burger", "count": 1, "weight": 220},
                {"slot": 3, "name": "backwoods", "count": 2, "weight": 60},
                {"slot": 4, "name": "paperbag", "count": 1, "weight": 300,
                 "metadata": {"container": "bag42"}},
                {"slot": 5, "name": "radio", "count": 1, "weight": 900}
            ]
        },
        "rightInventory": {
            "id": "shop1", "type": "shop", "slots": 4,
            "items": [
                {"slot": 1, "name": "water", "count": 100, "weight": 50000},
                {"slot": 2, "name": "lockpick", "count": 10, "weight": 1600}
            ]
        },
        "backpackInventory": {"id": "backpack1", "type": "backpack", "slots": 4, "maxWeight": 8000}
    }))
    .expect("setup payload")
}

pub async fn harness_with_timeout(
    timeout: Duration,
) -> (ReconciliationController, UnboundedReceiver<BridgeRequest>) {
    let (bridge, rx) = HostBridge::channel(timeout);
    let controller = ReconciliationController::new(InventoryStore::default(), catalog(), bridge);
    controller.setup(setup()).await;
    (controller, rx)
}

pub async fn harness() -> (ReconciliationController, UnboundedReceiver<BridgeRequest>) {
    harness_with_timeout(Duration::from_secs(2)).await
}

pub fn player(slot: u32) -> SlotRef {
    SlotRef::new(InventoryKey::Primary, slot)
}

#[allow(dead_code)]
pub fn shop(slot: u32) -> SlotRef {
    SlotRef::new(InventoryKey::Secondary, slot)
}

#[allow(dead_code)]
pub fn backpack(slot: u32) -> SlotRef {
    SlotRef::new(InventoryKey::Auxiliary, slot)
}

/// `(name, count, weight)` of a slot, `None` when empty.
#[allow(dead_code)]
pub async fn contents(controller: &ReconciliationController, at: &SlotRef) -> Option<(String, u32, u32)> {
    let store = controller.store();
    let store = store.lock().await;
    store
        .slot(at)
        .and_then(|slot| slot.item().map(|item| (item.name.clone(), item.count, item.weight)))
}

/// Approve every request and record `(endpoint, count)` for each.
#[allow(dead_code)]
pub fn approve_all(
    mut rx: UnboundedReceiver<BridgeRequest>,
) -> tokio::task::JoinHandle<Vec<(&'static str, u32)>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(request) = rx.recv().await {
            seen.push((request.endpoint, request.payload.count));
            request.respond(gridstash::engine::BridgeReply::accept());
        }
        seen
    })
}
