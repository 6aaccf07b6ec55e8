use std::cell::Cell;
use std::rc::Rc;

use crate::scope::current_scope;

type Cleanup = Box<dyn FnOnce()>;

/// Cleanup handle handed back by subscriptions, timers and tasks.
///
/// Clones share one cleanup; whichever clone runs it first wins and the rest
/// become no-ops.
#[derive(Clone)]
pub struct Dispose(Rc<Cell<Option<Cleanup>>>);

impl Dispose {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(Cell::new(Some(Box::new(cleanup)))))
    }

    pub fn noop() -> Self {
        Self(Rc::new(Cell::new(None)))
    }

    /// One handle for several subscriptions, torn down in order.
    pub fn all(handles: impl IntoIterator<Item = Dispose>) -> Self {
        let handles: Vec<Dispose> = handles.into_iter().collect();
        Self::new(move || handles.iter().for_each(Dispose::run))
    }

    pub fn run(&self) {
        // Taken before the call so the cleanup may drop or rerun this handle.
        if let Some(cleanup) = self.0.take() {
            cleanup()
        }
    }

    pub fn is_disposed(&self) -> bool {
        let cleanup = self.0.take();
        let done = cleanup.is_none();
        self.0.set(cleanup);
        done
    }
}

/// Subscribes through `subscribe` and hands the handle to the current
/// [`Scope`](crate::Scope), if any. Operators build every upstream
/// subscription this way, so disposing the scope a graph was built in
/// detaches the whole graph.
pub fn effect(subscribe: impl FnOnce() -> Dispose) -> Dispose {
    let handle = subscribe();
    if let Some(scope) = current_scope() {
        scope.own(handle.clone());
    }
    handle
}

/// A bare cleanup, for work that is not a subscription (aborting a task,
/// cancelling a timer) but should still die with the scope.
pub fn on_dispose(cleanup: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(cleanup)
}
