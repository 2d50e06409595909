//! Optimistic apply, await the authority, then commit or roll back.
//!
//! Every mutating action goes through [`ReconciliationController::submit`]:
//!
//! 1. under the store lock: refuse if busy, plan, snapshot, mark pending, write;
//! 2. release the lock and await the host bridge on a spawned task;
//! 3. re-lock and either keep the optimistic state (merging any side-channel data)
//!    or install the snapshot.
//!
//! Host pushes may land between 1 and 3; the store records them so a rollback
//! keeps them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::engine::bridge::{HostBridge, RequestPayload};
use crate::engine::catalog::{ItemCatalog, ItemDefinition};
use crate::engine::errors::InventoryError;
use crate::engine::refresh::RefreshPayload;
use crate::engine::registry::Position;
use crate::engine::store::{DisplayMetadata, InventorySnapshot, InventoryStore, SetupPayload};
use crate::engine::transfer::{plan_transfer, TransferPlan};
use crate::engine::types::{
    Action, InventoryKey, InventoryPayload, OperationKind, Quantity, SlotRef, TransferIntent,
};

/// Lifecycle of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationState {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RollbackCause {
    /// The authority answered with a failure.
    Rejected,
    /// The request failed in transit or timed out.
    Transport(String),
}

/// Terminal result of a submitted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationOutcome {
    Committed {
        id: Uuid,
        kind: OperationKind,
        container_weight: Option<u32>,
    },
    RolledBack {
        id: Uuid,
        kind: OperationKind,
        cause: RollbackCause,
    },
}

impl OperationOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            OperationOutcome::Committed { id, .. } | OperationOutcome::RolledBack { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            OperationOutcome::Committed { kind, .. } | OperationOutcome::RolledBack { kind, .. } => {
                *kind
            }
        }
    }

    pub fn state(&self) -> OperationState {
        match self {
            OperationOutcome::Committed { .. } => OperationState::Committed,
            OperationOutcome::RolledBack { .. } => OperationState::RolledBack,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, OperationOutcome::Committed { .. })
    }
}

/// Drives operations against the shared store and the host bridge.
///
/// Lock order is always store, then catalog.
#[derive(Debug, Clone)]
pub struct ReconciliationController {
    store: Arc<Mutex<InventoryStore>>,
    catalog: Arc<Mutex<ItemCatalog>>,
    bridge: HostBridge,
}

impl ReconciliationController {
    pub fn new(store: InventoryStore, catalog: ItemCatalog, bridge: HostBridge) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            catalog: Arc::new(Mutex::new(catalog)),
            bridge,
        }
    }

    pub fn store(&self) -> Arc<Mutex<InventoryStore>> {
        Arc::clone(&self.store)
    }

    pub fn catalog(&self) -> Arc<Mutex<ItemCatalog>> {
        Arc::clone(&self.catalog)
    }

    /// `Pending` while an operation awaits the authority, otherwise `Idle`.
    pub async fn state(&self) -> OperationState {
        if self.store.lock().await.is_busy() {
            OperationState::Pending
        } else {
            OperationState::Idle
        }
    }

    /// Run one intent through the full optimistic cycle.
    ///
    /// Local precondition failures return `Err` with the store untouched. Authority
    /// rejections and transport failures return `Ok(RolledBack)`. Once the optimistic
    /// write lands the rest runs on its own task, so dropping this future still ends
    /// in a commit or a rollback.
    pub async fn submit(&self, intent: TransferIntent) -> Result<OperationOutcome, InventoryError> {
        let id = Uuid::new_v4();
        let (plan, snapshot) = {
            let mut store = self.store.lock().await;
            if store.is_busy() {
                return Err(InventoryError::Busy);
            }
            let plan = {
                let mut catalog = self.catalog.lock().await;
                plan_transfer(&store, &mut catalog, &intent)?
            };
            let snapshot = store.snapshot();
            store.begin(id, plan.kind)?;
            if let Err(e) = store.apply_writes(&plan.writes) {
                store.rollback(id, snapshot);
                return Err(e);
            }
            (plan, snapshot)
        };

        let controller = self.clone();
        tokio::spawn(async move { controller.settle(id, plan, snapshot).await })
            .await
            .map_err(|e| InventoryError::TaskFailed(e.to_string()))
    }

    /// Await the authority for a pending operation, then commit or roll back.
    async fn settle(&self, id: Uuid, plan: TransferPlan, snapshot: InventorySnapshot) -> OperationOutcome {
        let kind = plan.kind;
        let result = self
            .bridge
            .request(id, kind.endpoint(), RequestPayload::from(&plan))
            .await;

        let mut store = self.store.lock().await;
        match result {
            Ok(reply) if reply.is_success() => {
                let container_weight = reply.container_weight();
                if let Some(weight) = container_weight {
                    if !store.set_container_weight(weight) {
                        log::debug!("No container slot for weight {} after {}", weight, id);
                    }
                }
                store.commit(id);
                log::info!("Committed {} {} (x{})", kind, id, plan.count);
                OperationOutcome::Committed {
                    id,
                    kind,
                    container_weight,
                }
            }
            Ok(_) => {
                store.rollback(id, snapshot);
                log::warn!("Authority rejected {} {}; rolled back", kind, id);
                OperationOutcome::RolledBack {
                    id,
                    kind,
                    cause: RollbackCause::Rejected,
                }
            }
            Err(e) => {
                store.rollback(id, snapshot);
                log::warn!("{} {} failed in transit ({}); rolled back", kind, id, e);
                OperationOutcome::RolledBack {
                    id,
                    kind,
                    cause: RollbackCause::Transport(e.to_string()),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Gesture helpers
    // ------------------------------------------------------------------

    pub async fn transfer(
        &self,
        from: SlotRef,
        to: SlotRef,
        quantity: Quantity,
    ) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::transfer(from, to, quantity)).await
    }

    /// Transfer into the first fitting slot of `inventory`.
    pub async fn transfer_into(
        &self,
        from: SlotRef,
        inventory: InventoryKey,
        quantity: Quantity,
    ) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::transfer_into(from, inventory, quantity)).await
    }

    pub async fn craft(
        &self,
        from: SlotRef,
        to: SlotRef,
        quantity: Quantity,
    ) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::craft(from, to, quantity)).await
    }

    pub async fn buy(
        &self,
        from: SlotRef,
        to: SlotRef,
        quantity: Quantity,
    ) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::buy(from, to, quantity)).await
    }

    pub async fn give(&self, from: SlotRef, quantity: Quantity) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::on_slot(Action::Give, from, quantity)).await
    }

    pub async fn use_item(&self, from: SlotRef) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::on_slot(Action::Use, from, Quantity::Stack)).await
    }

    pub async fn drop_item(&self, from: SlotRef, quantity: Quantity) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::on_slot(Action::Drop, from, quantity)).await
    }

    pub async fn remove_component(
        &self,
        from: SlotRef,
        component: &str,
    ) -> Result<OperationOutcome, InventoryError> {
        let action = Action::RemoveComponent(component.to_string());
        self.submit(TransferIntent::on_slot(action, from, Quantity::Stack)).await
    }

    pub async fn remove_ammo(&self, from: SlotRef) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::on_slot(Action::RemoveAmmo, from, Quantity::Stack)).await
    }

    /// Trigger custom action `index` (0-based into the definition's buttons).
    pub async fn use_button(&self, from: SlotRef, index: usize) -> Result<OperationOutcome, InventoryError> {
        self.submit(TransferIntent::on_slot(Action::Button(index), from, Quantity::Stack)).await
    }

    // ------------------------------------------------------------------
    // Host pushes
    // ------------------------------------------------------------------

    pub async fn setup(&self, payload: SetupPayload) {
        let mut store = self.store.lock().await;
        let mut catalog = self.catalog.lock().await;
        store.setup(payload, &mut catalog);
    }

    pub async fn refresh(&self, payload: RefreshPayload) {
        let mut store = self.store.lock().await;
        let mut catalog = self.catalog.lock().await;
        store.refresh(payload, &mut catalog);
    }

    pub async fn open_inventory(&self, payload: InventoryPayload, position: Option<Position>) -> InventoryKey {
        let mut store = self.store.lock().await;
        let mut catalog = self.catalog.lock().await;
        store.open_inventory(payload, position, &mut catalog)
    }

    pub async fn close_inventory(&self, id: &str) -> bool {
        self.store.lock().await.close_inventory(id)
    }

    pub async fn add_display_metadata(&self, entries: Vec<DisplayMetadata>) {
        self.store.lock().await.add_display_metadata(entries);
    }

    /// Install a definition the host sent in response to a catalog miss.
    pub async fn define_item(&self, definition: ItemDefinition) {
        self.catalog.lock().await.insert(definition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bridge::BridgeReply;
    use serde_json::json;
    use std::time::Duration;

    async fn controller() -> (ReconciliationController, tokio::sync::mpsc::UnboundedReceiver<crate::engine::bridge::BridgeRequest>) {
        let (bridge, rx) = HostBridge::channel(Duration::from_millis(200));
        let catalog = ItemCatalog::with_items([ItemDefinition::new("water", "Water", true, true)]);
        let controller = ReconciliationController::new(InventoryStore::default(), catalog, bridge);
        let setup: SetupPayload = serde_json::from_value(json!({
            "leftInventory": {
                "id": "player1", "type": "player", "slots": 4,
                "items": [{"slot": 1, "name": "water", "count": 5, "weight": 2500}]
            }
        }))
        .expect("setup");
        controller.setup(setup).await;
        (controller, rx)
    }

    #[tokio::test]
    async fn busy_while_pending_then_idle_after_commit() {
        let (controller, mut rx) = controller().await;
        let worker = controller.clone();
        let op = tokio::spawn(async move {
            worker
                .transfer(SlotRef::new(InventoryKey::Primary, 1), SlotRef::new(InventoryKey::Primary, 2), Quantity::Exact(2))
                .await
        });

        let request = rx.recv().await.expect("request");
        assert_eq!(controller.state().await, OperationState::Pending);
        let second = controller
            .use_item(SlotRef::new(InventoryKey::Primary, 1))
            .await;
        assert!(matches!(second, Err(InventoryError::Busy)));

        request.respond(BridgeReply::accept());
        let outcome = op.await.expect("join").expect("outcome");
        assert_eq!(outcome.state(), OperationState::Committed);
        assert_eq!(controller.state().await, OperationState::Idle);
    }

    #[tokio::test]
    async fn local_failure_never_reaches_bridge() {
        let (controller, mut rx) = controller().await;
        let err = controller
            .transfer(SlotRef::new(InventoryKey::Primary, 3), SlotRef::new(InventoryKey::Primary, 2), Quantity::Stack)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::EmptySource { slot: 3, .. }));
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.state().await, OperationState::Idle);
    }
}
