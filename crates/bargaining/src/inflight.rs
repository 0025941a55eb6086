use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::model::{BargainId, ProductId};

/// The control a submit disables while its request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Bargain(BargainId),
    Product(ProductId),
}

/// Tracks disabled controls. At most one request per key at a time.
#[derive(Debug, Clone, Default)]
pub struct InFlightControls {
    active: Arc<Mutex<HashSet<ControlKey>>>,
}

impl InFlightControls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables `key`, or returns `None` if it is already disabled.
    #[must_use]
    pub fn try_begin(&self, key: ControlKey) -> Option<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(key) {
            return None;
        }
        Some(InFlightGuard {
            key,
            active: Arc::clone(&self.active),
        })
    }

    #[must_use]
    pub fn is_in_flight(&self, key: ControlKey) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }
}

/// Re-enables its control when dropped, on success and failure alike.
#[derive(Debug)]
pub struct InFlightGuard {
    key: ControlKey,
    active: Arc<Mutex<HashSet<ControlKey>>>,
}

impl InFlightGuard {
    #[must_use]
    pub fn key(&self) -> ControlKey {
        self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_until_guard_drops() {
        let controls = InFlightControls::new();
        let Some(id) = BargainId::new(5) else {
            panic!("valid id");
        };
        let key = ControlKey::Bargain(id);

        let guard = controls.try_begin(key);
        assert!(guard.is_some());
        assert!(controls.is_in_flight(key));
        assert!(controls.try_begin(key).is_none());

        drop(guard);
        assert!(!controls.is_in_flight(key));
        assert!(controls.try_begin(key).is_some());
    }

    #[test]
    fn keys_are_independent() {
        let controls = InFlightControls::new();
        let (Some(bargain), Some(product)) = (BargainId::new(1), ProductId::new(1)) else {
            panic!("valid ids");
        };
        let _bargain_guard = controls.try_begin(ControlKey::Bargain(bargain));
        assert!(controls.try_begin(ControlKey::Product(product)).is_some());
    }
}
