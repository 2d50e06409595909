//! Dynamically opened inventories (trunks, stashes, drops...) beyond the three built-ins.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::types::{Inventory, InventoryPayload};

/// Screen rectangle of a floating inventory window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl Position {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }
}

/// UI state carried alongside a registry inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InventoryView {
    pub position: Position,
    pub visible: bool,
    pub z_index: i32,
}

/// Registry of open dynamic inventories keyed by id.
///
/// `active` lists visible ids in the order they became visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryRegistry {
    entries: BTreeMap<String, Inventory>,
    active: Vec<String>,
}

impl InventoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) an inventory opened by the host. It becomes visible and
    /// is raised above every other window.
    pub fn open(&mut self, payload: InventoryPayload, position: Option<Position>) -> &Inventory {
        let z_index = self.top_z() + 1;
        self.open_at(payload, position, z_index)
    }

    /// Like [`open`](Self::open) with an explicit z-order.
    pub fn open_at(
        &mut self,
        payload: InventoryPayload,
        position: Option<Position>,
        z_index: i32,
    ) -> &Inventory {
        let id = payload.id.clone();
        let mut inventory = Inventory::from_payload(payload);
        let base = inventory.view.unwrap_or_default();
        inventory.view = Some(InventoryView {
            position: position.unwrap_or(base.position),
            visible: true,
            z_index,
        });
        log::debug!(
            "Opened dynamic inventory {} ({}, {} slots)",
            id,
            inventory.kind,
            inventory.slot_count()
        );
        if !self.active.contains(&id) {
            self.active.push(id.clone());
        }
        match self.entries.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(inventory);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(inventory),
        }
    }

    /// Removes an inventory. Unknown ids are ignored.
    pub fn close(&mut self, id: &str) -> Option<Inventory> {
        self.active.retain(|active| active != id);
        let removed = self.entries.remove(id);
        if removed.is_some() {
            log::debug!("Closed dynamic inventory {}", id);
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Inventory> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Inventory> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Inventory> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Inventory> {
        self.entries.values_mut()
    }

    pub fn active_ids(&self) -> &[String] {
        &self.active
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> bool {
        let Some(inventory) = self.entries.get_mut(id) else {
            return false;
        };
        inventory.view.get_or_insert_with(InventoryView::default).visible = visible;
        if visible {
            if !self.active.iter().any(|active| active == id) {
                self.active.push(id.to_string());
            }
        } else {
            self.active.retain(|active| active != id);
        }
        true
    }

    pub fn set_position(&mut self, id: &str, position: Position) -> bool {
        match self.entries.get_mut(id) {
            Some(inventory) => {
                inventory.view.get_or_insert_with(InventoryView::default).position = position;
                true
            }
            None => false,
        }
    }

    /// Raises the window above all others.
    pub fn bring_to_front(&mut self, id: &str) -> bool {
        let z_index = self.top_z() + 1;
        match self.entries.get_mut(id) {
            Some(inventory) => {
                inventory.view.get_or_insert_with(InventoryView::default).z_index = z_index;
                true
            }
            None => false,
        }
    }

    /// Visible inventories, back to front.
    pub fn visible_inventories(&self) -> Vec<&Inventory> {
        let mut visible: Vec<&Inventory> = self
            .entries
            .values()
            .filter(|inv| inv.view.map(|v| v.visible).unwrap_or(false))
            .collect();
        visible.sort_by(|a, b| {
            let za = a.view.map(|v| v.z_index).unwrap_or(0);
            let zb = b.view.map(|v| v.z_index).unwrap_or(0);
            za.cmp(&zb).then_with(|| a.id.cmp(&b.id))
        });
        visible
    }

    fn top_z(&self) -> i32 {
        self.entries
            .values()
            .filter_map(|inv| inv.view.map(|v| v.z_index))
            .max()
            .unwrap_or(0)
    }
}
