//! Optimistic grid-inventory engine.
//!
//! Slot arrays live in the [`store`]; [`transfer`] plans moves, stacks and swaps;
//! the [`reconcile`] controller applies them speculatively, asks the host through the
//! [`bridge`] and commits or rolls back on the verdict.

pub mod bridge;
pub mod catalog;
pub mod derive;
pub mod errors;
pub mod reconcile;
pub mod refresh;
pub mod registry;
pub mod store;
pub mod transfer;
pub mod types;

pub use bridge::{BridgeReply, BridgeRequest, HostBridge, RequestPayload};
pub use catalog::{load_items_from_json, ButtonGroup, ItemButton, ItemCatalog, ItemDefinition};
pub use errors::InventoryError;
pub use reconcile::{OperationOutcome, OperationState, ReconciliationController, RollbackCause};
pub use refresh::{RefreshItem, RefreshPayload, SlotsUpdate, WeightUpdate};
pub use registry::{InventoryRegistry, InventoryView, Position};
pub use store::{DisplayMetadata, InventorySnapshot, InventoryStore, SetupPayload};
pub use transfer::{
    can_stack, find_available_slot, move_slot, plan_transfer, stack_slot, swap_slots, SlotWrite,
    TransferPlan,
};
pub use types::{
    Action, Inventory, InventoryKey, InventoryKind, InventoryPayload, Metadata, OperationKind,
    Quantity, Slot, SlotItem, SlotPayload, SlotRef, TransferIntent, AUTO_SLOT, MAX_SLOTS,
};
