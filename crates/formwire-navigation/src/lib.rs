//! Back-stack navigation.
//!
//! Screens are identified by a serializable key. Every entry on the stack
//! owns a [`Scope`]; a screen builds its view-model inside
//! `entry.scope.run(..)` and everything it subscribed to is torn down when
//! the entry is popped.

use std::{cell::RefCell, fmt::Debug, rc::Rc};

use formwire_core::{Observable, Scope};
use serde::Serialize;

pub trait NavKey: Clone + Debug + PartialEq + Serialize + 'static {}
impl<T> NavKey for T where T: Clone + Debug + PartialEq + Serialize + 'static {}

/// A screen on the stack.
#[derive(Clone)]
pub struct Entry<K: NavKey> {
    pub key: K,
    /// Disposed when the entry leaves the stack.
    pub scope: Scope,
}

impl<K: NavKey> Entry<K> {
    fn new(key: K) -> Self {
        Self {
            key,
            scope: Scope::new(),
        }
    }
}

#[derive(Clone)]
pub struct BackStack<K: NavKey> {
    entries: Rc<RefCell<Vec<Entry<K>>>>,
    version: Observable<u64>,
}

impl<K: NavKey> BackStack<K> {
    pub fn new(start: K) -> Self {
        Self {
            entries: Rc::new(RefCell::new(vec![Entry::new(start)])),
            version: Observable::with_value(0),
        }
    }

    pub fn top(&self) -> Option<Entry<K>> {
        self.entries.borrow().last().cloned()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.borrow().iter().map(|e| e.key.clone()).collect()
    }

    pub fn size(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Bumped once per change to the stack.
    pub fn version(&self) -> Observable<u64> {
        self.version.clone()
    }

    fn bump(&self) {
        let v = self.version.latest().unwrap_or_default();
        self.version.next(v.wrapping_add(1));
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.keys())
    }
}

#[derive(Clone)]
pub struct Navigator<K: NavKey> {
    pub stack: BackStack<K>,
}

impl<K: NavKey> Navigator<K> {
    pub fn new(start: K) -> Self {
        Self {
            stack: BackStack::new(start),
        }
    }

    pub fn push(&self, k: K) {
        log::debug!("navigate: push {k:?}");
        self.stack.entries.borrow_mut().push(Entry::new(k));
        self.stack.bump();
    }

    /// Pops the top entry and disposes its scope. The last entry is never
    /// popped.
    pub fn pop(&self) -> bool {
        let popped = {
            let mut entries = self.stack.entries.borrow_mut();
            if entries.len() <= 1 {
                return false;
            }
            entries.pop()
        };
        // Dispose outside the borrow; cleanups may look at the stack.
        let Some(entry) = popped else {
            return false;
        };
        log::debug!("navigate: pop {:?}", entry.key);
        entry.scope.dispose();
        self.stack.bump();
        true
    }

    pub fn top_key(&self) -> Option<K> {
        self.stack.top().map(|e| e.key)
    }
}
