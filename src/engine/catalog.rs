//! Item catalog: static item definitions looked up by name.
//!
//! A miss is never fatal. The catalog records the name and, when a fetch channel is
//! attached, asks the host for the definition once; the slot keeps rendering with its
//! raw name until [`ItemCatalog::insert`] populates it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::errors::InventoryError;

/// A custom context-menu action declared by an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemButton {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Buttons sharing a group name, or a single ungrouped button (`name == None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonGroup {
    pub name: Option<String>,
    /// `(index into the definition's buttons, label)`
    pub buttons: Vec<(usize, String)>,
}

/// Immutable definition of an item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub stack: bool,
    #[serde(default)]
    pub usable: bool,
    /// Close the inventory UI after use.
    #[serde(default)]
    pub close: bool,
    /// Aggregate count the player owns, adjusted by refresh `itemCount` deltas.
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub buttons: Vec<ItemButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ItemDefinition {
    pub fn new(name: &str, label: &str, stack: bool, usable: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            stack,
            usable,
            close: false,
            count: 0,
            buttons: Vec::new(),
            description: None,
        }
    }

    pub fn with_button(mut self, label: &str, group: Option<&str>) -> Self {
        self.buttons.push(ItemButton {
            label: label.to_string(),
            group: group.map(str::to_string),
        });
        self
    }

    /// Groups buttons by group name in first-seen order. Ungrouped buttons each form
    /// their own group. Indices always refer to the flat `buttons` list.
    pub fn grouped_buttons(&self) -> Vec<ButtonGroup> {
        let mut groups: Vec<ButtonGroup> = Vec::new();
        for (index, button) in self.buttons.iter().enumerate() {
            let entry = (index, button.label.clone());
            match &button.group {
                Some(group) => {
                    if let Some(existing) = groups
                        .iter_mut()
                        .find(|g| g.name.as_deref() == Some(group.as_str()))
                    {
                        existing.buttons.push(entry);
                    } else {
                        groups.push(ButtonGroup {
                            name: Some(group.clone()),
                            buttons: vec![entry],
                        });
                    }
                }
                None => groups.push(ButtonGroup {
                    name: None,
                    buttons: vec![entry],
                }),
            }
        }
        groups
    }
}

/// Lookup table of item definitions.
#[derive(Debug, Default)]
pub struct ItemCatalog {
    items: HashMap<String, ItemDefinition>,
    requested: HashSet<String>,
    fetch_tx: Option<mpsc::UnboundedSender<String>>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = ItemDefinition>) -> Self {
        let mut catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    /// Attach the channel used to ask the host for missing definitions.
    pub fn attach_fetcher(&mut self, fetch_tx: mpsc::UnboundedSender<String>) {
        self.fetch_tx = Some(fetch_tx);
    }

    pub fn insert(&mut self, item: ItemDefinition) {
        self.requested.remove(&item.name);
        self.items.insert(item.name.clone(), item);
    }

    pub fn get(&self, name: &str) -> Option<&ItemDefinition> {
        self.items.get(name)
    }

    /// Looks up `name`, requesting the definition from the host on a miss.
    pub fn lookup(&mut self, name: &str) -> Result<&ItemDefinition, InventoryError> {
        if !self.items.contains_key(name) {
            self.request(name);
            return Err(InventoryError::UnknownItem(name.to_string()));
        }
        self.items
            .get(name)
            .ok_or_else(|| InventoryError::UnknownItem(name.to_string()))
    }

    /// Queue a fetch for `name` unless it is known or already requested.
    pub fn request(&mut self, name: &str) {
        if self.items.contains_key(name) || !self.requested.insert(name.to_string()) {
            return;
        }
        log::warn!("Item definition for {} missing; requesting from host", name);
        if let Some(tx) = &self.fetch_tx {
            if tx.send(name.to_string()).is_err() {
                log::debug!("Catalog fetch channel closed; {} stays unresolved", name);
            }
        }
    }

    pub fn is_requested(&self, name: &str) -> bool {
        self.requested.contains(name)
    }

    /// Display label with nameless fallback to the raw item name.
    pub fn label_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.items
            .get(name)
            .map(|item| item.label.as_str())
            .unwrap_or(name)
    }

    /// Apply an aggregate count delta. Unknown names are ignored.
    pub fn adjust_count(&mut self, name: &str, delta: i64) -> bool {
        match self.items.get_mut(name) {
            Some(item) => {
                item.count = item.count.saturating_add(delta);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Definitions sorted by name.
    pub fn definitions(&self) -> Vec<&ItemDefinition> {
        let mut defs: Vec<&ItemDefinition> = self.items.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

/// Load item definitions from a JSON array file.
pub fn load_items_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<ItemDefinition>, InventoryError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let items: Vec<ItemDefinition> = serde_json::from_str(&contents)?;
    log::debug!("Loaded {} item definitions from {}", items.len(), path.display());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> ItemDefinition {
        ItemDefinition::new("water", "Water", true, true)
    }

    #[test]
    fn lookup_hit_returns_definition() {
        let mut catalog = ItemCatalog::with_items([water()]);
        let def = catalog.lookup("water").expect("water");
        assert!(def.stack);
        assert_eq!(catalog.label_for("water"), "Water");
    }

    #[test]
    fn miss_requests_fetch_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut catalog = ItemCatalog::new();
        catalog.attach_fetcher(tx);

        assert!(matches!(catalog.lookup("lockpick"), Err(InventoryError::UnknownItem(_))));
        assert!(catalog.lookup("lockpick").is_err());
        assert_eq!(rx.try_recv().ok().as_deref(), Some("lockpick"));
        assert!(rx.try_recv().is_err());
        assert!(catalog.is_requested("lockpick"));
        assert_eq!(catalog.label_for("lockpick"), "lockpick");

        catalog.insert(ItemDefinition::new("lockpick", "Lockpick", true, true));
        assert!(!catalog.is_requested("lockpick"));
        assert!(catalog.lookup("lockpick").is_ok());
    }

    #[test]
    fn adjust_count_ignores_unknown() {
        let mut catalog = ItemCatalog::with_items([water()]);
        assert!(catalog.adjust_count("water", 3));
        assert!(catalog.adjust_count("water", -1));
        assert!(!catalog.adjust_count("ghost", 1));
        assert_eq!(catalog.get("water").map(|d| d.count), Some(2));
    }

    #[test]
    fn buttons_group_in_first_seen_order() {
        let def = ItemDefinition::new("radio", "Radio", false, true)
            .with_button("Tune", Some("Channel"))
            .with_button("Toggle", None)
            .with_button("Scan", Some("Channel"));
        let groups = def.grouped_buttons();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name.as_deref(), Some("Channel"));
        assert_eq!(
            groups[0].buttons,
            vec![(0, "Tune".to_string()), (2, "Scan".to_string())]
        );
        assert_eq!(groups[1].name, None);
        assert_eq!(groups[1].buttons, vec![(1, "Toggle".to_string())]);
    }

    #[test]
    fn loads_definitions_from_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("items.json");
        std::fs::write(
            &path,
            r#"[{"name":"water","label":"Water","stack":true,"usable":true},
                {"name":"burger","label":"Burger"}]"#,
        )
        .expect("write");
        let items = load_items_from_json(&path).expect("load");
        assert_eq!(items.len(), 2);
        assert!(!items[1].stack);
    }

    #[test]
    fn malformed_seed_is_a_json_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("items.json");
        std::fs::write(&path, r#"[{"name":"water"}"#).expect("write");
        assert!(matches!(load_items_from_json(&path), Err(InventoryError::Json(_))));
        assert!(matches!(
            load_items_from_json(dir.path().join("missing.json")),
            Err(InventoryError::Io(_))
        ));
    }
}
