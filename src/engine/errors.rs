use thiserror::Error;

use crate::engine::types::{InventoryKey, InventoryKind, OperationKind, SlotRef};

/// Errors raised by the inventory engine.
///
/// Everything except the transport variants is a local precondition failure: it is
/// reported before any mutation or bridge call and leaves the store untouched.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Source and target address the same slot of the same inventory.
    #[error("source and target are the same slot ({key} #{slot})")]
    NoOpTarget { key: InventoryKey, slot: u32 },

    /// Zero quantities are never transferred.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// An exact amount was requested that the source cannot cover.
    #[error("requested {requested} but only {available} available")]
    ExceedsAvailable { requested: u32, available: u32 },

    /// The key does not resolve to a built-in or registered inventory.
    #[error("unknown inventory: {0}")]
    UnknownInventory(InventoryKey),

    /// Slot index is outside `1..=slots` for the inventory.
    #[error("slot {slot} out of range for {key} ({slots} slots)")]
    SlotOutOfRange { key: InventoryKey, slot: u32, slots: u32 },

    /// The source slot holds no item.
    #[error("slot {slot} of {key} is empty")]
    EmptySource { key: InventoryKey, slot: u32 },

    /// No catalog definition for the item; a fetch has been requested.
    #[error("item definition missing: {0}")]
    UnknownItem(String),

    /// The action needs a target slot and none was given.
    #[error("{0} needs a target slot")]
    MissingTarget(OperationKind),

    /// The target slot holds an item the source cannot merge into.
    #[error("target slot {0} is occupied")]
    TargetOccupied(SlotRef),

    /// No free or stack-compatible slot in the target inventory.
    #[error("no available slot in {0}")]
    NoAvailableSlot(InventoryKey),

    /// Another operation is still awaiting the authority.
    #[error("an operation is already pending")]
    Busy,

    /// Shop and crafting inventories hold offers, not stock that can be swapped,
    /// given, used or dropped.
    #[error("cannot take items out of a {0} inventory this way")]
    TemplateSource(InventoryKind),

    /// Shop and crafting inventories do not accept dropped items.
    #[error("cannot place items into a {0} inventory")]
    TargetNotWritable(InventoryKind),

    /// The operation requires a specific source inventory kind.
    #[error("expected a {expected} source inventory, found {found}")]
    WrongSourceKind {
        expected: InventoryKind,
        found: InventoryKind,
    },

    #[error("item {0} cannot be used")]
    NotUsable(String),

    #[error("item has no component {0}")]
    MissingComponent(String),

    #[error("item has no ammo loaded")]
    NoAmmo,

    #[error("item {name} has no action button {index}")]
    MissingButton { name: String, index: usize },

    /// Merging would push a stack past the largest representable count.
    #[error("stacking {added} onto {existing} {name} overflows the slot count")]
    CountOverflow { name: String, existing: u32, added: u32 },

    /// The host bridge receiver is gone.
    #[error("host bridge closed")]
    BridgeClosed,

    /// The host dropped the reply channel without answering.
    #[error("host dropped the reply")]
    ReplyDropped,

    /// No reply arrived within the bridge timeout.
    #[error("host did not reply within {0} ms")]
    Timeout(u64),

    /// The task awaiting the authority ended without an outcome.
    #[error("operation task failed: {0}")]
    TaskFailed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
