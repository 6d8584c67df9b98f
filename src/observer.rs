//! Hooks for external collaborators to observe and steer LOD decisions.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::resources::{MeshHandle, ResourcePool};

/// Callbacks invoked synchronously during evaluation and registration.
///
/// Observers run in registration order and may mutate scene state from
/// inside a callback; the evaluator re-reads transforms and bounds after
/// `on_before_evaluate` so such mutations take effect in the same frame.
#[allow(unused_variables)]
pub trait LodObserver: Send + Sync {
    /// Called before a mesh is evaluated this frame.
    fn on_before_evaluate(&self, pool: &ResourcePool, mesh: MeshHandle) {}

    /// Called after a mesh was evaluated, with the chosen target levels.
    fn on_after_evaluate(
        &self,
        pool: &ResourcePool,
        mesh: MeshHandle,
        mesh_level: usize,
        texture_level: usize,
    ) {
    }

    /// Called when a new resource is registered with a descriptor.
    fn on_resource_registered(&self, descriptor_id: &str) {}

    /// Called right before a mesh-level fetch is issued.
    fn on_before_fetch_mesh_level(&self, pool: &ResourcePool, mesh: MeshHandle, level: usize) {}
}

/// Ordered list of registered observers, shared between the manager and
/// the resolver.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Arc<RwLock<Vec<Arc<dyn LodObserver>>>>,
}

impl ObserverSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observer. Invocation order is registration order.
    pub fn register(&self, observer: Arc<dyn LodObserver>) {
        self.observers.write().push(observer);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Runs a callback against every observer, in order.
    pub fn each(&self, mut f: impl FnMut(&dyn LodObserver)) {
        let observers = self.observers.read().clone();
        for observer in &observers {
            f(observer.as_ref());
        }
    }
}
