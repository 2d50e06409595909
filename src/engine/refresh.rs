//! Unsolicited authority pushes: slot replacements and capacity changes.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::types::{InventoryKey, InventoryKind, Slot};

/// One slot replacement. The target is chosen by explicit key when present, otherwise
/// by inventory kind (player → primary, backpack → auxiliary, anything else →
/// secondary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshItem {
    pub item: Slot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_inventory_key: Option<InventoryKey>,
}

impl RefreshItem {
    pub fn target_key(&self) -> InventoryKey {
        if let Some(key) = &self.target_inventory_key {
            return key.clone();
        }
        match self.inventory {
            Some(InventoryKind::Player) => InventoryKey::Primary,
            Some(InventoryKind::Backpack) => InventoryKey::Auxiliary,
            _ => InventoryKey::Secondary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightUpdate {
    pub inventory_id: String,
    pub max_weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsUpdate {
    pub inventory_id: String,
    pub slots: u32,
}

/// A `refreshSlots` push. `items` accepts a single record or an array (nulls skipped).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    #[serde(default, deserialize_with = "one_or_many")]
    pub items: Vec<RefreshItem>,
    /// Aggregate owned-count deltas per item name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<HashMap<String, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_data: Option<WeightUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots_data: Option<SlotsUpdate>,
}

impl RefreshPayload {
    pub fn slot(key: InventoryKey, slot: Slot) -> Self {
        Self {
            items: vec![RefreshItem {
                item: slot,
                inventory: None,
                target_inventory_key: Some(key),
            }],
            ..Self::default()
        }
    }

    pub fn max_weight(inventory_id: &str, max_weight: u32) -> Self {
        Self {
            weight_data: Some(WeightUpdate {
                inventory_id: inventory_id.to_string(),
                max_weight,
            }),
            ..Self::default()
        }
    }

    pub fn slot_count(inventory_id: &str, slots: u32) -> Self {
        Self {
            slots_data: Some(SlotsUpdate {
                inventory_id: inventory_id.to_string(),
                slots,
            }),
            ..Self::default()
        }
    }

    /// The parts of the payload that touch inventory state (everything except the
    /// catalog count deltas).
    pub fn inventory_part(&self) -> Self {
        Self {
            item_count: None,
            ..self.clone()
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<RefreshItem>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(RefreshItem),
        Many(Vec<Option<RefreshItem>>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items.into_iter().flatten().collect(),
    })
}
