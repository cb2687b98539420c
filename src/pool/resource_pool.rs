//! Reference-counted keyed resources.

use std::collections::BTreeMap;

#[derive(Debug)]
struct Slot<T> {
    resource: T,
    ref_count: usize,
}

/// Keyed resources shared by several users.
///
/// Adding an existing key only bumps its reference count. A resource leaves
/// the pool when its last reference is removed, or immediately when it is
/// removed as severed. Removed resources are handed back so the caller can
/// release them.
///
/// Not synchronized; owners guard it with their own lock.
#[derive(Debug)]
pub struct ResourcePool<T> {
    slots: BTreeMap<String, Slot<T>>,
}

impl<T> Default for ResourcePool<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<T> ResourcePool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference to `key`.
    ///
    /// A new key needs a resource; for a known key the resource is ignored
    /// and may be `None`. Returns `false` when a new key came without one.
    pub fn add_resource(&mut self, key: &str, resource: Option<T>) -> bool {
        if let Some(slot) = self.slots.get_mut(key) {
            slot.ref_count += 1;
            return true;
        }

        match resource {
            Some(resource) => {
                self.slots.insert(
                    key.to_string(),
                    Slot {
                        resource,
                        ref_count: 1,
                    },
                );
                true
            }
            None => false,
        }
    }

    /// Drop one reference; returns the resource once the last one is gone.
    /// Unknown keys are ignored.
    pub fn remove_resource(&mut self, key: &str) -> Option<T> {
        let slot = self.slots.get_mut(key)?;
        slot.ref_count = slot.ref_count.saturating_sub(1);
        if slot.ref_count > 0 {
            return None;
        }
        self.slots.remove(key).map(|slot| slot.resource)
    }

    /// Remove `key` regardless of outstanding references.
    pub fn remove_severed_resource(&mut self, key: &str) -> Option<T> {
        self.slots.remove(key).map(|slot| slot.resource)
    }

    pub fn get_resource(&self, key: &str) -> Option<&T> {
        self.slots.get(key).map(|slot| &slot.resource)
    }

    pub fn get_resource_mut(&mut self, key: &str) -> Option<&mut T> {
        self.slots.get_mut(key).map(|slot| &mut slot.resource)
    }

    pub fn ref_count(&self, key: &str) -> usize {
        self.slots.get(key).map_or(0, |slot| slot.ref_count)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }

    pub fn resources_mut(&mut self) -> impl Iterator<Item = (&String, &mut T)> {
        self.slots
            .iter_mut()
            .map(|(key, slot)| (key, &mut slot.resource))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
