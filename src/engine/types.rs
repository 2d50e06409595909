//! Core data model: slots, inventories, keys and transfer intents.
//!
//! Host payloads use the camelCase JSON shapes the game client already speaks
//! (`SlotPayload`, `InventoryPayload`); the engine converts them into types that
//! uphold the slot invariants on construction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::derive;
use crate::engine::registry::{InventoryView, Position};

/// Free-form per-instance item metadata (serial, ammo, components, durability basis...).
pub type Metadata = serde_json::Map<String, Value>;

// ============================================================================
// Inventory kinds and keys
// ============================================================================

/// What an inventory represents. Unknown host kinds are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InventoryKind {
    Player,
    Shop,
    Container,
    Backpack,
    Crafting,
    Other(String),
}

impl InventoryKind {
    /// Shop stock and crafting recipes are offers: moving out of them never depletes them.
    pub fn is_template(&self) -> bool {
        matches!(self, InventoryKind::Shop | InventoryKind::Crafting)
    }

    pub fn as_str(&self) -> &str {
        match self {
            InventoryKind::Player => "player",
            InventoryKind::Shop => "shop",
            InventoryKind::Container => "container",
            InventoryKind::Backpack => "backpack",
            InventoryKind::Crafting => "crafting",
            InventoryKind::Other(kind) => kind,
        }
    }
}

impl From<String> for InventoryKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "player" => InventoryKind::Player,
            "shop" => InventoryKind::Shop,
            "container" => InventoryKind::Container,
            "backpack" => InventoryKind::Backpack,
            "crafting" => InventoryKind::Crafting,
            _ => InventoryKind::Other(value),
        }
    }
}

impl From<InventoryKind> for String {
    fn from(kind: InventoryKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses one of the three built-in inventories or a registry entry by id.
///
/// On the wire the built-ins keep the host's historical names
/// (`leftInventory`, `rightInventory`, `backpackInventory`); anything else is a
/// dynamic inventory id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InventoryKey {
    Primary,
    Secondary,
    Auxiliary,
    Dynamic(String),
}

impl InventoryKey {
    pub fn as_str(&self) -> &str {
        match self {
            InventoryKey::Primary => "leftInventory",
            InventoryKey::Secondary => "rightInventory",
            InventoryKey::Auxiliary => "backpackInventory",
            InventoryKey::Dynamic(id) => id,
        }
    }
}

impl From<String> for InventoryKey {
    fn from(value: String) -> Self {
        match value.as_str() {
            "leftInventory" => InventoryKey::Primary,
            "rightInventory" => InventoryKey::Secondary,
            "backpackInventory" => InventoryKey::Auxiliary,
            _ => InventoryKey::Dynamic(value),
        }
    }
}

impl From<&str> for InventoryKey {
    fn from(value: &str) -> Self {
        InventoryKey::from(value.to_string())
    }
}

impl From<InventoryKey> for String {
    fn from(key: InventoryKey) -> Self {
        key.as_str().to_string()
    }
}

impl fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Slots
// ============================================================================

/// Contents of an occupied slot. `count` is always > 0.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotItem {
    pub name: String,
    pub count: u32,
    /// Total weight of the stack in grams.
    pub weight: u32,
    pub metadata: Metadata,
}

impl SlotItem {
    pub fn new(name: impl Into<String>, count: u32, weight: u32) -> Self {
        Self {
            name: name.into(),
            count,
            weight,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    /// Weight of a single piece as fixed at the last write.
    pub fn unit_weight(&self) -> f64 {
        derive::unit_weight(self.weight, self.count)
    }

    /// Durability percentage at `now` (unix seconds), `None` when the item does not decay.
    pub fn durability(&self, now: i64) -> Option<f64> {
        derive::durability(&self.metadata, now)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Custom label set on the instance, if any.
    pub fn custom_label(&self) -> Option<&str> {
        self.metadata_str("label")
    }

    pub fn serial(&self) -> Option<&str> {
        self.metadata_str("serial")
    }

    pub fn ammo(&self) -> u64 {
        self.metadata.get("ammo").and_then(Value::as_u64).unwrap_or(0)
    }

    /// Attached component item names.
    pub fn components(&self) -> Vec<&str> {
        self.metadata
            .get("components")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// One fixed, 1-based position in an inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SlotPayload", into = "SlotPayload")]
pub struct Slot {
    pub slot: u32,
    pub item: Option<SlotItem>,
}

impl Slot {
    pub fn empty(slot: u32) -> Self {
        Self { slot, item: None }
    }

    /// Builds an occupied slot; a zero count collapses to an empty slot.
    pub fn occupied(slot: u32, item: SlotItem) -> Self {
        if item.count == 0 {
            return Self::empty(slot);
        }
        Self {
            slot,
            item: Some(item),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }

    pub fn item(&self) -> Option<&SlotItem> {
        self.item.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.item.as_ref().map(|item| item.name.as_str())
    }

    pub fn count(&self) -> u32 {
        self.item.as_ref().map(|item| item.count).unwrap_or(0)
    }

    pub fn weight(&self) -> u32 {
        self.item.as_ref().map(|item| item.weight).unwrap_or(0)
    }

    /// Same contents placed at another index.
    pub fn relocated(&self, slot: u32) -> Self {
        Self {
            slot,
            item: self.item.clone(),
        }
    }
}

/// Host wire shape for a slot: `{ slot, name?, count?, weight?, metadata? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotPayload {
    pub slot: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl From<SlotPayload> for Slot {
    fn from(payload: SlotPayload) -> Self {
        match payload.name {
            Some(name) if !name.is_empty() && payload.count.unwrap_or(0) > 0 => {
                let weight = payload.weight.unwrap_or(0.0).max(0.0).round() as u32;
                Slot::occupied(
                    payload.slot,
                    SlotItem {
                        name,
                        count: payload.count.unwrap_or(0),
                        weight,
                        metadata: payload.metadata.unwrap_or_default(),
                    },
                )
            }
            _ => Slot::empty(payload.slot),
        }
    }
}

impl From<Slot> for SlotPayload {
    fn from(slot: Slot) -> Self {
        match slot.item {
            Some(item) => SlotPayload {
                slot: slot.slot,
                name: Some(item.name),
                count: Some(item.count),
                weight: Some(f64::from(item.weight)),
                metadata: (!item.metadata.is_empty()).then_some(item.metadata),
            },
            None => SlotPayload {
                slot: slot.slot,
                ..SlotPayload::default()
            },
        }
    }
}

// ============================================================================
// Inventories
// ============================================================================

/// Largest slot array the engine will build; host lengths above it are capped.
pub const MAX_SLOTS: u32 = 1024;

fn capped_slots(id: &str, slots: u32) -> u32 {
    if slots > MAX_SLOTS {
        log::warn!("{} asks for {} slots; capping at {}", id, slots, MAX_SLOTS);
        MAX_SLOTS
    } else {
        slots
    }
}

/// A fixed-length slot array. `items[i].slot == i + 1` for every index.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    pub id: String,
    pub kind: InventoryKind,
    pub label: Option<String>,
    pub items: Vec<Slot>,
    pub max_weight: Option<u32>,
    /// Named capacity buckets (e.g. weapon categories) with their max counts.
    pub groups: BTreeMap<String, u32>,
    /// Screen state; only set for registry inventories.
    pub view: Option<InventoryView>,
}

impl Inventory {
    pub fn new(id: impl Into<String>, kind: InventoryKind, slots: u32) -> Self {
        let id = id.into();
        let slots = capped_slots(&id, slots);
        Self {
            id,
            kind,
            label: None,
            items: (1..=slots).map(Slot::empty).collect(),
            max_weight: None,
            groups: BTreeMap::new(),
            view: None,
        }
    }

    /// Builds the dense slot array from a host payload. Payload entries outside
    /// `1..=slots` are dropped; missing indices default to empty.
    pub fn from_payload(payload: InventoryPayload) -> Self {
        let mut inventory = Inventory::new(payload.id, payload.kind, payload.slots);
        inventory.label = payload.label;
        inventory.max_weight = payload.max_weight;
        inventory.groups = payload.groups.unwrap_or_default();
        if payload.position.is_some() || payload.visible.is_some() || payload.z_index.is_some() {
            inventory.view = Some(InventoryView {
                position: payload.position.unwrap_or_default(),
                visible: payload.visible.unwrap_or(true),
                z_index: payload.z_index.unwrap_or(0),
            });
        }
        for slot in payload.items {
            if slot.slot >= 1 && slot.slot <= inventory.slot_count() {
                let index = (slot.slot - 1) as usize;
                inventory.items[index] = slot;
            } else {
                log::warn!(
                    "Dropping slot {} outside 1..={} in setup of {}",
                    slot.slot,
                    inventory.slot_count(),
                    inventory.id
                );
            }
        }
        inventory
    }

    pub fn slot_count(&self) -> u32 {
        self.items.len() as u32
    }

    pub fn slot(&self, slot: u32) -> Option<&Slot> {
        slot.checked_sub(1).and_then(|i| self.items.get(i as usize))
    }

    /// Replaces the slot at `slot.slot`. Returns false when the index is out of range.
    pub fn put(&mut self, slot: Slot) -> bool {
        match slot.slot.checked_sub(1).and_then(|i| self.items.get_mut(i as usize)) {
            Some(existing) => {
                *existing = slot;
                true
            }
            None => false,
        }
    }

    /// Rebuilds the slot array at `slots` length (capped at [`MAX_SLOTS`]), keeping
    /// contents at surviving indices.
    pub fn resize(&mut self, slots: u32) {
        let slots = capped_slots(&self.id, slots);
        let mut rebuilt: Vec<Slot> = (1..=slots).map(Slot::empty).collect();
        for slot in self.items.drain(..) {
            if slot.slot >= 1 && slot.slot <= slots {
                let index = (slot.slot - 1) as usize;
                rebuilt[index] = slot;
            }
        }
        self.items = rebuilt;
    }

    pub fn occupied(&self) -> impl Iterator<Item = (&Slot, &SlotItem)> {
        self.items
            .iter()
            .filter_map(|slot| slot.item.as_ref().map(|item| (slot, item)))
    }

    pub fn total_weight(&self) -> u64 {
        self.occupied().map(|(_, item)| u64::from(item.weight)).sum()
    }
}

/// Host wire shape for a full inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InventoryKind,
    pub slots: u32,
    #[serde(default)]
    pub items: Vec<Slot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<BTreeMap<String, u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

// ============================================================================
// Transfer intents
// ============================================================================

/// Target slot index meaning "first stack-compatible or empty slot".
pub const AUTO_SLOT: u32 = 0;

/// Inventory key plus 1-based slot index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub inventory: InventoryKey,
    pub slot: u32,
}

impl SlotRef {
    pub fn new(inventory: impl Into<InventoryKey>, slot: u32) -> Self {
        Self {
            inventory: inventory.into(),
            slot,
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.inventory, self.slot)
    }
}

/// How many units the gesture asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Quantity {
    /// No amount selected: the whole stack for transfers, one unit for craft/buy/use.
    #[default]
    Stack,
    /// Up to `n` units; clamped to what the source holds.
    UpTo(u32),
    /// Exactly `n` units; rejected when the source holds fewer.
    Exact(u32),
}

/// The user-level action behind an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Drag and drop; resolved to move, stack or swap against the target slot.
    Transfer,
    Craft,
    Buy,
    Give,
    Use,
    Drop,
    RemoveComponent(String),
    RemoveAmmo,
    Button(usize),
}

/// Ephemeral request created by a UI gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub action: Action,
    pub from: SlotRef,
    /// Target slot; `None` lets transfers pick the first available slot.
    #[serde(default)]
    pub to: Option<SlotRef>,
    #[serde(default)]
    pub quantity: Quantity,
}

impl TransferIntent {
    pub fn transfer(from: SlotRef, to: SlotRef, quantity: Quantity) -> Self {
        Self {
            action: Action::Transfer,
            from,
            to: Some(to),
            quantity,
        }
    }

    /// Transfer into whichever slot of `inventory` fits first.
    pub fn transfer_into(from: SlotRef, inventory: InventoryKey, quantity: Quantity) -> Self {
        Self {
            action: Action::Transfer,
            from,
            to: Some(SlotRef {
                inventory,
                slot: AUTO_SLOT,
            }),
            quantity,
        }
    }

    pub fn craft(from: SlotRef, to: SlotRef, quantity: Quantity) -> Self {
        Self {
            action: Action::Craft,
            from,
            to: Some(to),
            quantity,
        }
    }

    pub fn buy(from: SlotRef, to: SlotRef, quantity: Quantity) -> Self {
        Self {
            action: Action::Buy,
            from,
            to: Some(to),
            quantity,
        }
    }

    pub fn on_slot(action: Action, from: SlotRef, quantity: Quantity) -> Self {
        Self {
            action,
            from,
            to: None,
            quantity,
        }
    }
}

/// The concrete operation an intent resolved to; names the authority endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Move,
    Stack,
    Swap,
    Craft,
    Buy,
    Give,
    Use,
    Drop,
    RemoveComponent,
    RemoveAmmo,
    Button,
}

impl OperationKind {
    /// Host endpoint that validates this operation.
    pub fn endpoint(self) -> &'static str {
        match self {
            OperationKind::Move | OperationKind::Stack | OperationKind::Swap => "swapItems",
            OperationKind::Craft => "craftItem",
            OperationKind::Buy => "buyItem",
            OperationKind::Give => "giveItem",
            OperationKind::Use => "useItem",
            OperationKind::Drop => "dropItem",
            OperationKind::RemoveComponent => "removeComponent",
            OperationKind::RemoveAmmo => "removeAmmo",
            OperationKind::Button => "useButton",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Move => "move",
            OperationKind::Stack => "stack",
            OperationKind::Swap => "swap",
            OperationKind::Craft => "craft",
            OperationKind::Buy => "buy",
            OperationKind::Give => "give",
            OperationKind::Use => "use",
            OperationKind::Drop => "drop",
            OperationKind::RemoveComponent => "removeComponent",
            OperationKind::RemoveAmmo => "removeAmmo",
            OperationKind::Button => "button",
        };
        f.write_str(name)
    }
}
