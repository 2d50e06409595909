//! Request/reply channel to the authoritative host process.
//!
//! The engine sends a [`BridgeRequest`] over an unbounded channel and awaits the
//! host's answer on the request's oneshot sender, bounded by a timeout. Whoever owns
//! the receiver (the game client glue, the simulator, a test responder) is the
//! authority.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::engine::errors::InventoryError;
use crate::engine::transfer::TransferPlan;
use crate::engine::types::{Action, InventoryKey, OperationKind};

/// Logical request body: `{ operationKind, fromSlot, fromInventoryKey, toSlot?,
/// toInventoryKey?, count, ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub operation_kind: OperationKind,
    pub from_slot: u32,
    pub from_inventory_key: InventoryKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_slot: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_inventory_key: Option<InventoryKey>,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// 1-based custom button id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_id: Option<usize>,
}

impl From<&TransferPlan> for RequestPayload {
    fn from(plan: &TransferPlan) -> Self {
        let (component, button_id) = match &plan.action {
            Action::RemoveComponent(component) => (Some(component.clone()), None),
            Action::Button(index) => (None, Some(index + 1)),
            _ => (None, None),
        };
        Self {
            operation_kind: plan.kind,
            from_slot: plan.from.slot,
            from_inventory_key: plan.from.inventory.clone(),
            to_slot: plan.to.as_ref().map(|to| to.slot),
            to_inventory_key: plan.to.as_ref().map(|to| to.inventory.clone()),
            count: plan.count,
            component,
            button_id,
        }
    }
}

/// The authority's verdict: a bare flag or a structured result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeReply {
    Flag(bool),
    #[serde(rename_all = "camelCase")]
    Detailed {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        container_weight: Option<u32>,
    },
}

impl BridgeReply {
    pub fn accept() -> Self {
        BridgeReply::Flag(true)
    }

    pub fn reject() -> Self {
        BridgeReply::Flag(false)
    }

    pub fn is_success(&self) -> bool {
        match self {
            BridgeReply::Flag(ok) => *ok,
            BridgeReply::Detailed { success, .. } => *success,
        }
    }

    pub fn container_weight(&self) -> Option<u32> {
        match self {
            BridgeReply::Flag(_) => None,
            BridgeReply::Detailed {
                container_weight, ..
            } => *container_weight,
        }
    }
}

/// One in-flight request as seen by the authority.
#[derive(Debug)]
pub struct BridgeRequest {
    pub id: Uuid,
    pub endpoint: &'static str,
    pub payload: RequestPayload,
    pub reply_tx: oneshot::Sender<BridgeReply>,
}

impl BridgeRequest {
    /// Answer the request. A host that already went away is ignored.
    pub fn respond(self, reply: BridgeReply) {
        if self.reply_tx.send(reply).is_err() {
            log::debug!("Reply for {} discarded; requester gone", self.id);
        }
    }
}

/// Engine-side handle of the bridge.
#[derive(Debug, Clone)]
pub struct HostBridge {
    tx: mpsc::UnboundedSender<BridgeRequest>,
    timeout: Duration,
}

impl HostBridge {
    /// Create a bridge and the receiver the authority reads requests from.
    pub fn channel(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<BridgeRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, timeout }, rx)
    }

    /// Send one request and wait for the verdict.
    pub async fn request(
        &self,
        id: Uuid,
        endpoint: &'static str,
        payload: RequestPayload,
    ) -> Result<BridgeReply, InventoryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        log::debug!("-> {} {} {:?}", endpoint, id, payload);
        self.tx
            .send(BridgeRequest {
                id,
                endpoint,
                payload,
                reply_tx,
            })
            .map_err(|_| InventoryError::BridgeClosed)?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(reply)) => {
                log::debug!("<- {} {} {:?}", endpoint, id, reply);
                Ok(reply)
            }
            Ok(Err(_)) => Err(InventoryError::ReplyDropped),
            Err(_) => Err(InventoryError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
