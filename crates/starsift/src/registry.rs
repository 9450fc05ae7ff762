//! Handle registry for drivers that hold remote element references.
//!
//! Every query runs in a scope: the selector for page-level queries, or
//! `{parent}>{selector}` for queries inside an element. Re-running a query
//! releases the handles its previous run handed out, together with every
//! scope nested under them, so repeated polling keeps the registry at the
//! size of the latest snapshot.

use crate::driver::ElementHandle;
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct HandleRegistry<E> {
    next_id: u64,
    elements: HashMap<String, E>,
    scopes: HashMap<String, Vec<String>>,
}

impl<E> Default for HandleRegistry<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            elements: HashMap::new(),
            scopes: HashMap::new(),
        }
    }
}

impl<E> HandleRegistry<E> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page_scope(selector: &str) -> String {
        selector.to_string()
    }

    pub(crate) fn child_scope(parent: &ElementHandle, selector: &str) -> String {
        format!("{}>{selector}", parent.id)
    }

    /// Register `found` under `scope`, returning the new handles and the
    /// elements released from the previous run of the same scope
    pub(crate) fn replace(&mut self, scope: String, found: Vec<E>) -> (Vec<ElementHandle>, Vec<E>) {
        let released = self.release_scope(&scope);
        let mut ids = Vec::with_capacity(found.len());
        let handles = found
            .into_iter()
            .map(|element| {
                let id = format!("el-{}", self.next_id);
                self.next_id += 1;
                let _ = self.elements.insert(id.clone(), element);
                ids.push(id.clone());
                ElementHandle::new(id)
            })
            .collect();
        let _ = self.scopes.insert(scope, ids);
        (handles, released)
    }

    pub(crate) fn get(&self, handle: &ElementHandle) -> Option<&E> {
        self.elements.get(&handle.id)
    }

    /// Drop everything, e.g. after navigation
    pub(crate) fn clear(&mut self) -> Vec<E> {
        self.scopes.clear();
        self.elements.drain().map(|(_, element)| element).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.elements.len()
    }

    fn release_scope(&mut self, scope: &str) -> Vec<E> {
        let mut released = Vec::new();
        let mut pending: Vec<String> = self.scopes.remove(scope).unwrap_or_default();
        while let Some(id) = pending.pop() {
            if let Some(element) = self.elements.remove(&id) {
                released.push(element);
            }
            let prefix = format!("{id}>");
            let nested: Vec<String> = self
                .scopes
                .keys()
                .filter(|key| key.starts_with(&prefix))
                .cloned()
                .collect();
            for key in nested {
                pending.extend(self.scopes.remove(&key).unwrap_or_default());
            }
        }
        released
    }
}
