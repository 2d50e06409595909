//! # Gridstash - Optimistic Grid Inventory Engine
//!
//! Gridstash keeps a client-side copy of slot-based inventories in step with an
//! authoritative host. Drag-and-drop moves, stack merges and swaps are applied
//! locally at once, sent to the host for validation, and then either kept or undone
//! from a whole-state snapshot.
//!
//! ## Features
//!
//! - **Slot Model**: Fixed-length, 1-based slot arrays for player, secondary and backpack inventories plus any number of dynamically opened ones.
//! - **Transfer Planning**: Move, stack and swap with weight conservation, automatic target slots, and shop/crafting sources that are never depleted.
//! - **Reconciliation**: One pending operation at a time; authority rejection, dropped replies and timeouts all roll back exactly.
//! - **Host Pushes**: Slot refreshes, capacity changes and catalog count deltas, kept across rollbacks.
//! - **Derived Values**: Per-unit weight and time-decayed durability computed on read.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use gridstash::engine::{
//!     HostBridge, InventoryKey, InventoryStore, ItemCatalog, Quantity, ReconciliationController, SlotRef,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (bridge, mut requests) = HostBridge::channel(Duration::from_secs(5));
//!     tokio::spawn(async move {
//!         while let Some(request) = requests.recv().await {
//!             request.respond(gridstash::engine::BridgeReply::accept());
//!         }
//!     });
//!
//!     let controller = ReconciliationController::new(InventoryStore::default(), ItemCatalog::new(), bridge);
//!     let outcome = controller
//!         .transfer(
//!             SlotRef::new(InventoryKey::Primary, 1),
//!             SlotRef::new(InventoryKey::Primary, 2),
//!             Quantity::Stack,
//!         )
//!         .await;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Data model, store, transfer planning, host bridge and reconciliation
//! - [`config`] - Configuration loading and validation
//! - [`simulate`] - Scripted sessions against a simulated authority

pub mod config;
pub mod engine;
pub mod simulate;
