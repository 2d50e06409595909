//! Canonical in-memory inventory state.
//!
//! The store owns the three built-in inventories and the dynamic registry. Writes
//! come from two places only: the reconciliation controller (optimistic slot writes,
//! commit side effects, rollback) and the host's bulk pushes (setup, refresh,
//! open/close).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::catalog::ItemCatalog;
use crate::engine::errors::InventoryError;
use crate::engine::refresh::RefreshPayload;
use crate::engine::registry::{InventoryRegistry, Position};
use crate::engine::types::{
    Inventory, InventoryKey, InventoryKind, InventoryPayload, OperationKind, Slot, SlotRef,
    MAX_SLOTS,
};

/// `setupInventory` push: any subset of the built-ins, fully replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPayload {
    #[serde(default)]
    pub left_inventory: Option<InventoryPayload>,
    #[serde(default)]
    pub right_inventory: Option<InventoryPayload>,
    #[serde(default)]
    pub backpack_inventory: Option<InventoryPayload>,
}

/// Extra metadata key the host wants shown in tooltips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub metadata: String,
    pub value: String,
}

/// Deep copy of every inventory, taken right before an optimistic write.
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySnapshot {
    primary: Inventory,
    secondary: Inventory,
    auxiliary: Inventory,
    registry: InventoryRegistry,
}

/// A host push recorded while an operation is pending.
#[derive(Debug, Clone)]
enum HostUpdate {
    Setup(SetupPayload),
    Refresh(RefreshPayload),
    Open {
        payload: InventoryPayload,
        position: Option<Position>,
        z_index: i32,
    },
    Close(String),
}

/// The operation currently awaiting the authority.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub id: Uuid,
    pub kind: OperationKind,
    /// Host pushes applied while pending; replayed on top of a rollback.
    deferred: Vec<HostUpdate>,
}

/// Single owner of all inventory state for a session.
#[derive(Debug, Clone)]
pub struct InventoryStore {
    primary: Inventory,
    secondary: Inventory,
    auxiliary: Inventory,
    registry: InventoryRegistry,
    display_metadata: Vec<DisplayMetadata>,
    pending: Option<PendingOperation>,
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new("player1", "shop1", "backpack1")
    }
}

impl InventoryStore {
    /// Empty built-ins with the given ids; the host fills them through setup.
    pub fn new(primary_id: &str, secondary_id: &str, auxiliary_id: &str) -> Self {
        Self {
            primary: Inventory::new(primary_id, InventoryKind::Player, 0),
            secondary: Inventory::new(secondary_id, InventoryKind::Shop, 0),
            auxiliary: Inventory::new(auxiliary_id, InventoryKind::Backpack, 0),
            registry: InventoryRegistry::new(),
            display_metadata: Vec::new(),
            pending: None,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn primary(&self) -> &Inventory {
        &self.primary
    }

    pub fn secondary(&self) -> &Inventory {
        &self.secondary
    }

    pub fn auxiliary(&self) -> &Inventory {
        &self.auxiliary
    }

    pub fn registry(&self) -> &InventoryRegistry {
        &self.registry
    }

    /// Resolve a key to its inventory. Dynamic keys look up the registry.
    pub fn inventory(&self, key: &InventoryKey) -> Option<&Inventory> {
        match key {
            InventoryKey::Primary => Some(&self.primary),
            InventoryKey::Secondary => Some(&self.secondary),
            InventoryKey::Auxiliary => Some(&self.auxiliary),
            InventoryKey::Dynamic(id) => self.registry.get(id),
        }
    }

    fn inventory_mut(&mut self, key: &InventoryKey) -> Option<&mut Inventory> {
        match key {
            InventoryKey::Primary => Some(&mut self.primary),
            InventoryKey::Secondary => Some(&mut self.secondary),
            InventoryKey::Auxiliary => Some(&mut self.auxiliary),
            InventoryKey::Dynamic(id) => self.registry.get_mut(id),
        }
    }

    /// Key of the inventory with id `id`, built-ins first.
    pub fn key_for_id(&self, id: &str) -> Option<InventoryKey> {
        if self.primary.id == id {
            Some(InventoryKey::Primary)
        } else if self.secondary.id == id {
            Some(InventoryKey::Secondary)
        } else if self.auxiliary.id == id {
            Some(InventoryKey::Auxiliary)
        } else if self.registry.contains(id) {
            Some(InventoryKey::Dynamic(id.to_string()))
        } else {
            None
        }
    }

    pub fn slot(&self, at: &SlotRef) -> Option<&Slot> {
        self.inventory(&at.inventory).and_then(|inv| inv.slot(at.slot))
    }

    pub fn display_metadata(&self) -> &[DisplayMetadata] {
        &self.display_metadata
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    // ------------------------------------------------------------------
    // Host pushes
    // ------------------------------------------------------------------

    /// Replace the built-ins named in `payload`, rebuilding each dense slot array and
    /// requesting any unknown item definitions.
    pub fn setup(&mut self, payload: SetupPayload, catalog: &mut ItemCatalog) {
        self.record(|| HostUpdate::Setup(payload.clone()));
        for key in self.apply_setup(payload) {
            if let Some(inventory) = self.inventory(&key) {
                request_unknown(inventory, catalog);
            }
        }
    }

    fn apply_setup(&mut self, payload: SetupPayload) -> Vec<InventoryKey> {
        let mut replaced = Vec::new();
        let targets = [
            (InventoryKey::Primary, payload.left_inventory),
            (InventoryKey::Secondary, payload.right_inventory),
            (InventoryKey::Auxiliary, payload.backpack_inventory),
        ];
        for (key, inventory) in targets {
            let Some(inventory) = inventory else { continue };
            let inventory = Inventory::from_payload(inventory);
            log::info!(
                "Setup {} as {} ({} slots, {} occupied)",
                key,
                inventory.id,
                inventory.slot_count(),
                inventory.occupied().count()
            );
            if let Some(slot) = self.inventory_mut(&key) {
                *slot = inventory;
            }
            replaced.push(key);
        }
        replaced
    }

    /// Register a dynamic inventory opened by the host.
    pub fn open_inventory(
        &mut self,
        payload: InventoryPayload,
        position: Option<Position>,
        catalog: &mut ItemCatalog,
    ) -> InventoryKey {
        let recorded = self.pending.is_some().then(|| payload.clone());
        let inventory = self.registry.open(payload, position);
        request_unknown(inventory, catalog);
        let id = inventory.id.clone();
        let z_index = inventory.view.map(|v| v.z_index).unwrap_or(0);
        if let Some(payload) = recorded {
            self.record(|| HostUpdate::Open {
                payload,
                position,
                z_index,
            });
        }
        InventoryKey::Dynamic(id)
    }

    pub fn close_inventory(&mut self, id: &str) -> bool {
        self.record(|| HostUpdate::Close(id.to_string()));
        self.registry.close(id).is_some()
    }

    pub fn registry_mut(&mut self) -> &mut InventoryRegistry {
        &mut self.registry
    }

    /// Apply a `refreshSlots` push to the live state.
    ///
    /// While an operation is pending the inventory part is also recorded so it
    /// survives a rollback of that operation. Catalog count deltas are applied once.
    pub fn refresh(&mut self, payload: RefreshPayload, catalog: &mut ItemCatalog) {
        if let Some(counts) = &payload.item_count {
            for (name, delta) in counts {
                if !catalog.adjust_count(name, *delta) {
                    log::debug!("Ignoring count delta for unknown item {}", name);
                }
            }
        }

        self.record(|| HostUpdate::Refresh(payload.inventory_part()));
        for key in self.apply_refresh(&payload) {
            if let Some(inventory) = self.inventory(&key) {
                request_unknown(inventory, catalog);
            }
        }
    }

    fn record(&mut self, update: impl FnOnce() -> HostUpdate) {
        if let Some(pending) = self.pending.as_mut() {
            pending.deferred.push(update());
        }
    }

    /// Slot, weight and capacity updates. Returns the keys whose slots changed.
    fn apply_refresh(&mut self, payload: &RefreshPayload) -> Vec<InventoryKey> {
        let mut touched = Vec::new();

        for record in &payload.items {
            let key = record.target_key();
            let index = record.item.slot;
            let Some(inventory) = self.inventory_mut(&key) else {
                log::warn!("Refresh for unknown inventory {} ignored", key);
                continue;
            };
            if index == 0 || index > MAX_SLOTS {
                log::error!("Refresh for {} carries slot {}; ignored", key, index);
                continue;
            }
            if index > inventory.slot_count() {
                log::warn!(
                    "Refresh for {} slot {} exceeds {} slots; resizing",
                    inventory.id,
                    index,
                    inventory.slot_count()
                );
                inventory.resize(index);
            }
            inventory.put(record.item.clone());
            if !touched.contains(&key) {
                touched.push(key);
            }
        }

        if let Some(update) = &payload.weight_data {
            if !self.set_max_weight(&update.inventory_id, update.max_weight) {
                log::debug!("maxWeight for unknown inventory {} ignored", update.inventory_id);
            }
        }

        if let Some(update) = &payload.slots_data {
            match self.key_for_id(&update.inventory_id) {
                Some(key) => {
                    self.set_slot_count(&key, update.slots);
                    if !touched.contains(&key) {
                        touched.push(key);
                    }
                }
                None => log::debug!("slot count for unknown inventory {} ignored", update.inventory_id),
            }
        }

        touched
    }

    /// Returns false when no inventory has that id.
    pub fn set_max_weight(&mut self, inventory_id: &str, max_weight: u32) -> bool {
        let Some(key) = self.key_for_id(inventory_id) else {
            return false;
        };
        match self.inventory_mut(&key) {
            Some(inventory) => {
                inventory.max_weight = Some(max_weight);
                true
            }
            None => false,
        }
    }

    /// Rebuild an inventory's slot array at a new length.
    pub fn set_slot_count(&mut self, key: &InventoryKey, slots: u32) -> bool {
        if slots > MAX_SLOTS {
            log::error!("Slot count {} for {} ignored", slots, key);
            return false;
        }
        match self.inventory_mut(key) {
            Some(inventory) => {
                log::info!("Resizing {} from {} to {} slots", inventory.id, inventory.slot_count(), slots);
                inventory.resize(slots);
                true
            }
            None => false,
        }
    }

    /// Append host display-metadata entries whose `value` is not listed yet.
    pub fn add_display_metadata(&mut self, entries: Vec<DisplayMetadata>) {
        for entry in entries {
            if !self.display_metadata.iter().any(|e| e.value == entry.value) {
                self.display_metadata.push(entry);
            }
        }
    }

    /// Set the weight of the primary slot holding the bag whose contents are the
    /// secondary inventory. Returns false when no such slot exists.
    pub fn set_container_weight(&mut self, weight: u32) -> bool {
        let container_id = self.secondary.id.clone();
        let bag = self.primary.items.iter_mut().find_map(|slot| {
            slot.item
                .as_mut()
                .filter(|item| item.metadata_str("container") == Some(container_id.as_str()))
        });
        match bag {
            Some(item) => {
                item.weight = weight;
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Optimistic operation lifecycle
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
            auxiliary: self.auxiliary.clone(),
            registry: self.registry.clone(),
        }
    }

    /// Write planned slots. Every target is checked before anything is written.
    pub fn apply_writes(&mut self, writes: &[(InventoryKey, Slot)]) -> Result<(), InventoryError> {
        for (key, slot) in writes {
            let inventory = self
                .inventory(key)
                .ok_or_else(|| InventoryError::UnknownInventory(key.clone()))?;
            if slot.slot == 0 || slot.slot > inventory.slot_count() {
                return Err(InventoryError::SlotOutOfRange {
                    key: key.clone(),
                    slot: slot.slot,
                    slots: inventory.slot_count(),
                });
            }
        }
        for (key, slot) in writes {
            if let Some(inventory) = self.inventory_mut(key) {
                inventory.put(slot.clone());
            }
        }
        Ok(())
    }

    /// Mark an operation pending. Fails when one already is.
    pub fn begin(&mut self, id: Uuid, kind: OperationKind) -> Result<(), InventoryError> {
        if self.pending.is_some() {
            return Err(InventoryError::Busy);
        }
        self.pending = Some(PendingOperation {
            id,
            kind,
            deferred: Vec::new(),
        });
        Ok(())
    }

    /// Keep the optimistic state and clear the busy flag.
    pub fn commit(&mut self, id: Uuid) {
        match self.pending.take() {
            Some(pending) if pending.id == id => {}
            other => {
                log::warn!("Commit for {} does not match pending operation", id);
                self.pending = other;
            }
        }
    }

    /// Install `snapshot` wholesale, then replay host pushes that arrived while pending.
    pub fn rollback(&mut self, id: Uuid, snapshot: InventorySnapshot) {
        let deferred = match self.pending.take() {
            Some(pending) if pending.id == id => pending.deferred,
            other => {
                log::warn!("Rollback for {} does not match pending operation", id);
                self.pending = other;
                return;
            }
        };
        self.primary = snapshot.primary;
        self.secondary = snapshot.secondary;
        self.auxiliary = snapshot.auxiliary;
        self.registry = snapshot.registry;
        let replayed = deferred.len();
        for update in deferred {
            match update {
                HostUpdate::Setup(payload) => {
                    self.apply_setup(payload);
                }
                HostUpdate::Refresh(payload) => {
                    self.apply_refresh(&payload);
                }
                HostUpdate::Open {
                    payload,
                    position,
                    z_index,
                } => {
                    self.registry.open_at(payload, position, z_index);
                }
                HostUpdate::Close(id) => {
                    self.registry.close(&id);
                }
            }
        }
        if replayed > 0 {
            log::debug!("Replayed {} host updates after rollback of {}", replayed, id);
        }
    }

    /// True when the live inventories equal `snapshot`.
    pub fn matches(&self, snapshot: &InventorySnapshot) -> bool {
        self.primary == snapshot.primary
            && self.secondary == snapshot.secondary
            && self.auxiliary == snapshot.auxiliary
            && self.registry == snapshot.registry
    }
}

fn request_unknown(inventory: &Inventory, catalog: &mut ItemCatalog) {
    for (_, item) in inventory.occupied() {
        if catalog.get(&item.name).is_none() {
            catalog.request(&item.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::ItemDefinition;
    use crate::engine::types::SlotItem;
    use serde_json::json;

    fn seeded() -> (InventoryStore, ItemCatalog) {
        let mut catalog = ItemCatalog::with_items([ItemDefinition::new("water", "Water", true, true)]);
        let mut store = InventoryStore::default();
        let setup: SetupPayload = serde_json::from_value(json!({
            "leftInventory": {
                "id": "player1", "type": "player", "slots": 5, "maxWeight": 30000,
                "items": [
                    {"slot": 1, "name": "water", "count": 5, "weight": 2500},
                    {"slot": 2, "name": "bag", "count": 1, "weight": 900, "metadata": {"container": "bag42"}}
                ]
            },
            "rightInventory": {"id": "bag42", "type": "container", "slots": 4}
        }))
        .expect("setup");
        store.setup(setup, &mut catalog);
        (store, catalog)
    }

    #[test]
    fn setup_fills_every_index_and_requests_unknown() {
        let (store, catalog) = seeded();
        assert_eq!(store.primary().slot_count(), 5);
        assert_eq!(store.secondary().kind, InventoryKind::Container);
        assert_eq!(store.auxiliary().slot_count(), 0);
        assert!(catalog.is_requested("bag"));
        assert!(!catalog.is_requested("water"));
    }

    #[test]
    fn refresh_beyond_capacity_resizes() {
        let (mut store, mut catalog) = seeded();
        let payload = RefreshPayload::slot(
            InventoryKey::Secondary,
            Slot::occupied(7, SlotItem::new("water", 1, 500)),
        );
        store.refresh(payload, &mut catalog);
        assert_eq!(store.secondary().slot_count(), 7);
        assert_eq!(store.secondary().slot(7).map(Slot::count), Some(1));
        assert!(store.secondary().items.iter().enumerate().all(|(i, s)| s.slot == i as u32 + 1));
    }

    #[test]
    fn absurd_slot_indices_are_ignored() {
        let (mut store, mut catalog) = seeded();
        let before = store.snapshot();
        let payload = RefreshPayload::slot(
            InventoryKey::Secondary,
            Slot::occupied(4_000_000_000, SlotItem::new("water", 1, 500)),
        );
        store.refresh(payload, &mut catalog);
        store.refresh(RefreshPayload::slot_count("player1", u32::MAX), &mut catalog);
        assert!(store.matches(&before));
    }

    #[test]
    fn max_weight_for_unknown_id_is_ignored() {
        let (mut store, mut catalog) = seeded();
        let before = store.snapshot();
        store.refresh(RefreshPayload::max_weight("nobody", 10), &mut catalog);
        assert!(store.matches(&before));
    }

    #[test]
    fn slot_count_update_resizes_by_id() {
        let (mut store, mut catalog) = seeded();
        store.refresh(RefreshPayload::slot_count("player1", 8), &mut catalog);
        assert_eq!(store.primary().slot_count(), 8);
        assert_eq!(store.primary().slot(1).map(Slot::count), Some(5));
    }

    #[test]
    fn container_weight_targets_bag_slot() {
        let (mut store, _) = seeded();
        assert!(store.set_container_weight(4200));
        assert_eq!(store.primary().slot(2).map(Slot::weight), Some(4200));
    }

    #[test]
    fn display_metadata_deduplicates_by_value() {
        let mut store = InventoryStore::default();
        let entry = |m: &str, v: &str| DisplayMetadata {
            metadata: m.to_string(),
            value: v.to_string(),
        };
        store.add_display_metadata(vec![entry("plate", "Plate"), entry("plate2", "Plate")]);
        store.add_display_metadata(vec![entry("vin", "VIN")]);
        assert_eq!(store.display_metadata().len(), 2);
    }

    #[test]
    fn rollback_replays_refreshes_seen_while_pending() {
        let (mut store, mut catalog) = seeded();
        let snapshot = store.snapshot();
        let id = Uuid::new_v4();
        store.begin(id, OperationKind::Move).expect("begin");
        store
            .apply_writes(&[(InventoryKey::Primary, Slot::empty(1))])
            .expect("write");
        store.refresh(
            RefreshPayload::slot(InventoryKey::Primary, Slot::occupied(4, SlotItem::new("water", 2, 1000))),
            &mut catalog,
        );
        assert!(store.begin(Uuid::new_v4(), OperationKind::Swap).is_err());

        store.rollback(id, snapshot);
        assert!(!store.is_busy());
        assert_eq!(store.primary().slot(1).map(Slot::count), Some(5));
        assert_eq!(store.primary().slot(4).map(Slot::count), Some(2));
    }

    #[test]
    fn inventory_opened_while_pending_survives_rollback() {
        let (mut store, mut catalog) = seeded();
        let snapshot = store.snapshot();
        let id = Uuid::new_v4();
        store.begin(id, OperationKind::Drop).expect("begin");
        let trunk: InventoryPayload = serde_json::from_value(json!({
            "id": "trunk:7", "type": "trunk", "slots": 3
        }))
        .expect("trunk");
        store.open_inventory(trunk, None, &mut catalog);
        store.rollback(id, snapshot);
        assert!(store.registry().contains("trunk:7"));
        assert_eq!(store.key_for_id("trunk:7"), Some(InventoryKey::Dynamic("trunk:7".into())));
    }

    #[test]
    fn replayed_open_keeps_its_z_order() {
        let (mut store, mut catalog) = seeded();
        let window = |id: &str| -> InventoryPayload {
            serde_json::from_value(json!({"id": id, "type": "stash", "slots": 2})).expect("stash")
        };
        let z_of = |store: &InventoryStore, id: &str| {
            store.registry().get(id).and_then(|inv| inv.view).map(|v| v.z_index)
        };
        store.open_inventory(window("stash:a"), None, &mut catalog);
        let snapshot = store.snapshot();
        let id = Uuid::new_v4();
        store.begin(id, OperationKind::Move).expect("begin");
        store.registry_mut().bring_to_front("stash:a");
        store.open_inventory(window("stash:b"), None, &mut catalog);
        let live = z_of(&store, "stash:b");
        assert_eq!(live, Some(3));

        store.rollback(id, snapshot);
        assert_eq!(z_of(&store, "stash:b"), live);
        assert_eq!(z_of(&store, "stash:a"), Some(1));
    }

    #[test]
    fn apply_writes_is_all_or_nothing() {
        let (mut store, _) = seeded();
        let before = store.snapshot();
        let result = store.apply_writes(&[
            (InventoryKey::Primary, Slot::empty(1)),
            (InventoryKey::Primary, Slot::empty(99)),
        ]);
        assert!(matches!(result, Err(InventoryError::SlotOutOfRange { .. })));
        assert!(store.matches(&before));
    }
}
