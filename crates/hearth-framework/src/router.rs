//! Per-event handler tables.
//!
//! [`EventRouter`] maps every [`EventKind`] to an ordered list of
//! [`BoundHandler`]s. The whole table is rebuilt from the registry after any
//! load, reload or unload and swapped in atomically, so a dispatch that has
//! already looked up its handlers keeps running against the table it saw.
//!
//! Rebuilds read the registry while holding the table's write lock. Every
//! registry change is followed by its own rebuild, so the last table swapped
//! in always reflects the last change.
//!
//! Ordering within one event: priority descending, then plugin registration
//! order, then binding order within the plugin.

use std::collections::HashMap;
use std::sync::Arc;

use hearth_core::EventKind;
use parking_lot::RwLock;
use tracing::debug;

use crate::plugin::{BoundHandler, PluginInstance};
use crate::registry::PluginRegistry;

// =============================================================================
// EventTable
// =============================================================================

/// An immutable snapshot of the routing table.
#[derive(Debug, Default)]
pub struct EventTable {
    routes: HashMap<EventKind, Arc<[BoundHandler]>>,
}

impl EventTable {
    /// Builds a table from instances given in registration order.
    pub fn build(instances: &[Arc<PluginInstance>]) -> Self {
        let mut staged: HashMap<EventKind, Vec<(usize, &BoundHandler)>> = HashMap::new();
        for (order, instance) in instances.iter().enumerate() {
            for handler in instance.handlers() {
                staged.entry(handler.event()).or_default().push((order, handler));
            }
        }

        let routes = staged
            .into_iter()
            .map(|(event, mut entries)| {
                // stable: equal keys keep binding order
                entries.sort_by(|(a_order, a), (b_order, b)| {
                    b.priority().cmp(&a.priority()).then(a_order.cmp(b_order))
                });
                let handlers: Arc<[BoundHandler]> =
                    entries.into_iter().map(|(_, h)| h.clone()).collect();
                (event, handlers)
            })
            .collect();

        Self { routes }
    }

    /// Handlers for `event` in invocation order; empty if none are bound.
    pub fn lookup(&self, event: EventKind) -> Arc<[BoundHandler]> {
        self.routes
            .get(&event)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Events with at least one handler.
    pub fn events(&self) -> Vec<EventKind> {
        let mut events: Vec<_> = self.routes.keys().copied().collect();
        events.sort();
        events
    }

    /// Total number of routed handlers.
    pub fn handler_count(&self) -> usize {
        self.routes.values().map(|h| h.len()).sum()
    }
}

// =============================================================================
// EventRouter
// =============================================================================

/// Holds the current [`EventTable`] and swaps in rebuilt ones.
#[derive(Debug, Default)]
pub struct EventRouter {
    table: RwLock<Arc<EventTable>>,
}

impl EventRouter {
    /// Creates a router with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the table from the current contents of `registry` and swaps
    /// it in.
    pub fn rebuild(&self, registry: &PluginRegistry) {
        let mut current = self.table.write();
        let instances = registry.instances();
        let table = Arc::new(EventTable::build(&instances));
        debug!(
            plugins = instances.len(),
            handlers = table.handler_count(),
            "Rebuilt event table"
        );
        *current = table;
    }

    /// Handlers for `event` in invocation order.
    pub fn lookup(&self, event: EventKind) -> Arc<[BoundHandler]> {
        self.table.read().lookup(event)
    }

    /// The current table snapshot.
    pub fn table(&self) -> Arc<EventTable> {
        Arc::clone(&self.table.read())
    }
}
