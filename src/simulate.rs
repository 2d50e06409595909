//! Scripted sessions against an in-process simulated authority.
//!
//! A session file is JSON: a setup push, an optional library of definitions the host
//! can serve on catalog misses, and an ordered list of steps. Every gesture step goes
//! through the [`ReconciliationController`] exactly as a UI would drive it; the
//! authority task answers bridge requests by forced verdict or by random draw.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{Config, SimulationConfig};
use crate::engine::{
    BridgeReply, BridgeRequest, DisplayMetadata, HostBridge, Inventory, InventoryKey,
    InventoryPayload, InventoryStore, ItemCatalog, ItemDefinition, OperationOutcome, Position,
    Quantity, RefreshPayload, ReconciliationController, SetupPayload, SlotRef,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub setup: SetupPayload,
    /// Definitions the host hands out when the catalog asks for them.
    #[serde(default)]
    pub library: Vec<ItemDefinition>,
    pub steps: Vec<Step>,
}

impl Session {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read session file {}: {}", path, e))?;
        serde_json::from_str(&content).map_err(|e| anyhow!("Failed to parse session file {}: {}", path, e))
    }
}

/// One scripted action. Gestures carry slot references as
/// `{"inventory": "leftInventory", "slot": 1}`; slot 0 in a transfer target means
/// "first fitting slot".
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Transfer {
        from: SlotRef,
        to: SlotRef,
        #[serde(default)]
        quantity: Quantity,
    },
    Craft {
        from: SlotRef,
        to: SlotRef,
        #[serde(default)]
        quantity: Quantity,
    },
    Buy {
        from: SlotRef,
        to: SlotRef,
        #[serde(default)]
        quantity: Quantity,
    },
    Give {
        from: SlotRef,
        #[serde(default)]
        quantity: Quantity,
    },
    Use {
        from: SlotRef,
    },
    Drop {
        from: SlotRef,
        #[serde(default)]
        quantity: Quantity,
    },
    RemoveComponent {
        from: SlotRef,
        component: String,
    },
    RemoveAmmo {
        from: SlotRef,
    },
    Button {
        from: SlotRef,
        index: usize,
    },
    Refresh {
        payload: RefreshPayload,
    },
    Open {
        inventory: InventoryPayload,
        #[serde(default)]
        position: Option<Position>,
    },
    Close {
        id: String,
    },
    DisplayMetadata {
        entries: Vec<DisplayMetadata>,
    },
    /// Queue verdicts the authority returns before falling back to random draws.
    Verdicts {
        approve: Vec<bool>,
    },
}

impl Step {
    pub fn describe(&self) -> String {
        match self {
            Step::Transfer { from, to, quantity } => format!("transfer {} -> {} {:?}", from, to, quantity),
            Step::Craft { from, to, quantity } => format!("craft {} -> {} {:?}", from, to, quantity),
            Step::Buy { from, to, quantity } => format!("buy {} -> {} {:?}", from, to, quantity),
            Step::Give { from, quantity } => format!("give {} {:?}", from, quantity),
            Step::Use { from } => format!("use {}", from),
            Step::Drop { from, quantity } => format!("drop {} {:?}", from, quantity),
            Step::RemoveComponent { from, component } => format!("remove {} from {}", component, from),
            Step::RemoveAmmo { from } => format!("unload {}", from),
            Step::Button { from, index } => format!("button {} on {}", index, from),
            Step::Refresh { payload } => format!("refresh ({} slots)", payload.items.len()),
            Step::Open { inventory, .. } => format!("open {}", inventory.id),
            Step::Close { id } => format!("close {}", id),
            Step::DisplayMetadata { entries } => format!("display metadata ({})", entries.len()),
            Step::Verdicts { approve } => format!("verdicts {:?}", approve),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// Host push or script control applied directly.
    Applied,
    Outcome(OperationOutcome),
    /// Local precondition failure; nothing changed.
    Refused(String),
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub index: usize,
    pub description: String,
    pub result: StepResult,
}

// ============================================================================
// Simulated authority
// ============================================================================

struct Verdicts {
    approve_ratio: f64,
    rng: StdRng,
    forced: Arc<Mutex<VecDeque<bool>>>,
}

impl Verdicts {
    fn next(&mut self) -> bool {
        let forced = self.forced.lock().ok().and_then(|mut queue| queue.pop_front());
        match forced {
            Some(approve) => approve,
            None => self.rng.gen_bool(self.approve_ratio.clamp(0.0, 1.0)),
        }
    }
}

fn spawn_authority(
    config: &SimulationConfig,
    mut rx: mpsc::UnboundedReceiver<BridgeRequest>,
    forced: Arc<Mutex<VecDeque<bool>>>,
) -> JoinHandle<()> {
    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut verdicts = Verdicts {
        approve_ratio: config.approve_ratio,
        rng,
        forced,
    };
    let delay = Duration::from_millis(config.reply_delay_ms);

    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let approve = verdicts.next();
            log::debug!(
                "Authority {} {} (x{}) -> {}",
                request.endpoint,
                request.id,
                request.payload.count,
                if approve { "accept" } else { "reject" }
            );
            request.respond(if approve {
                BridgeReply::accept()
            } else {
                BridgeReply::reject()
            });
        }
        log::debug!("Authority stopped; bridge closed");
    })
}

// ============================================================================
// Runner
// ============================================================================

pub struct Simulation {
    controller: ReconciliationController,
    authority: JoinHandle<()>,
    forced: Arc<Mutex<VecDeque<bool>>>,
    fetch_rx: mpsc::UnboundedReceiver<String>,
    library: HashMap<String, ItemDefinition>,
}

impl Simulation {
    pub fn new(config: &Config, definitions: Vec<ItemDefinition>) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let mut catalog = ItemCatalog::with_items(definitions);
        catalog.attach_fetcher(fetch_tx);

        let store = InventoryStore::new(
            &config.engine.primary_id,
            &config.engine.secondary_id,
            &config.engine.auxiliary_id,
        );
        let (bridge, rx) = HostBridge::channel(config.engine.bridge_timeout());
        let forced = Arc::new(Mutex::new(VecDeque::new()));
        let authority = spawn_authority(&config.simulation, rx, Arc::clone(&forced));

        Self {
            controller: ReconciliationController::new(store, catalog, bridge),
            authority,
            forced,
            fetch_rx,
            library: HashMap::new(),
        }
    }

    pub fn controller(&self) -> &ReconciliationController {
        &self.controller
    }

    /// Apply the session's setup, then every step in order.
    pub async fn run(&mut self, session: Session) -> Vec<StepReport> {
        for definition in session.library {
            self.library.insert(definition.name.clone(), definition);
        }
        self.controller.setup(session.setup).await;
        self.serve_definitions().await;

        let mut reports = Vec::with_capacity(session.steps.len());
        for (index, step) in session.steps.into_iter().enumerate() {
            let description = step.describe();
            let result = self.step(step).await;
            self.serve_definitions().await;
            log::info!("Step {}: {} => {:?}", index + 1, description, result);
            reports.push(StepReport {
                index: index + 1,
                description,
                result,
            });
        }
        reports
    }

    pub async fn step(&self, step: Step) -> StepResult {
        let c = &self.controller;
        let outcome = match step {
            Step::Transfer { from, to, quantity } => c.transfer(from, to, quantity).await,
            Step::Craft { from, to, quantity } => c.craft(from, to, quantity).await,
            Step::Buy { from, to, quantity } => c.buy(from, to, quantity).await,
            Step::Give { from, quantity } => c.give(from, quantity).await,
            Step::Use { from } => c.use_item(from).await,
            Step::Drop { from, quantity } => c.drop_item(from, quantity).await,
            Step::RemoveComponent { from, component } => c.remove_component(from, &component).await,
            Step::RemoveAmmo { from } => c.remove_ammo(from).await,
            Step::Button { from, index } => c.use_button(from, index).await,
            Step::Refresh { payload } => {
                c.refresh(payload).await;
                return StepResult::Applied;
            }
            Step::Open { inventory, position } => {
                c.open_inventory(inventory, position).await;
                return StepResult::Applied;
            }
            Step::Close { id } => {
                c.close_inventory(&id).await;
                return StepResult::Applied;
            }
            Step::DisplayMetadata { entries } => {
                c.add_display_metadata(entries).await;
                return StepResult::Applied;
            }
            Step::Verdicts { approve } => {
                if let Ok(mut queue) = self.forced.lock() {
                    queue.extend(approve);
                }
                return StepResult::Applied;
            }
        };
        match outcome {
            Ok(outcome) => StepResult::Outcome(outcome),
            Err(e) => StepResult::Refused(e.to_string()),
        }
    }

    /// Answer pending catalog requests from the session library.
    async fn serve_definitions(&mut self) {
        while let Ok(name) = self.fetch_rx.try_recv() {
            match self.library.get(&name) {
                Some(definition) => self.controller.define_item(definition.clone()).await,
                None => log::warn!("Host has no definition for {}", name),
            }
        }
    }

    /// Compact listing of every built-in and registry inventory.
    pub async fn render(&self) -> Vec<String> {
        let store = self.controller.store();
        let store = store.lock().await;
        let catalog = self.controller.catalog();
        let catalog = catalog.lock().await;
        let now = chrono::Utc::now().timestamp();

        let mut lines = Vec::new();
        let builtins = [
            (InventoryKey::Primary, store.primary()),
            (InventoryKey::Secondary, store.secondary()),
            (InventoryKey::Auxiliary, store.auxiliary()),
        ];
        for (key, inventory) in builtins {
            lines.extend(format_inventory_compact(&key, inventory, &catalog, now));
        }
        for inventory in store.registry().iter() {
            let key = InventoryKey::Dynamic(inventory.id.clone());
            lines.extend(format_inventory_compact(&key, inventory, &catalog, now));
        }
        lines
    }

    pub fn shutdown(self) {
        self.authority.abort();
    }
}

/// Format one inventory: a header line plus one line per occupied slot.
pub fn format_inventory_compact(
    key: &InventoryKey,
    inventory: &Inventory,
    catalog: &ItemCatalog,
    now: i64,
) -> Vec<String> {
    let capacity = inventory
        .max_weight
        .map(|max| format!("{}/{}g", inventory.total_weight(), max))
        .unwrap_or_else(|| format!("{}g", inventory.total_weight()));
    let mut lines = vec![format!(
        "{} {} ({}) {}/{} slots, {}",
        key,
        inventory.id,
        inventory.kind,
        inventory.occupied().count(),
        inventory.slot_count(),
        capacity
    )];

    for (slot, item) in inventory.occupied() {
        let label = item.custom_label().unwrap_or_else(|| catalog.label_for(&item.name));
        let qty_str = if item.count > 1 {
            format!("{}x ", item.count)
        } else {
            String::new()
        };
        let durability = item
            .durability(now)
            .map(|d| format!(" [{:.0}%]", d))
            .unwrap_or_default();
        lines.push(format!("  {}. {}{} ({}g){}", slot.slot, qty_str, label, item.weight, durability));
    }
    lines
}

/// Load the catalog seed named in the config, if any.
pub fn load_catalog_seed(config: &Config) -> Result<Vec<ItemDefinition>> {
    match &config.catalog.seed_path {
        Some(path) if Path::new(path).exists() => crate::engine::load_items_from_json(path)
            .map_err(|e| anyhow!("Failed to load item catalog {}: {}", path, e)),
        Some(path) => {
            log::warn!("Catalog seed {} not found; starting with an empty catalog", path);
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}
